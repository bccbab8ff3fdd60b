//! Message entity definitions

use serde::{Deserialize, Serialize};

/// Preview marker for image-only messages.
pub const PHOTO_PREVIEW: &str = "[photo]";

/// Preview fallback for rooms that have no messages yet.
pub const EMPTY_ROOM_PREVIEW: &str = "Conversation started";

/// One persisted chat entry (text or image) within a room.
///
/// `sent_at` is server-assigned and monotonic in insertion order within a
/// room. `is_read` starts false and is only ever flipped true in bulk by the
/// read tracker; messages are never edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub sent_at: String,
    pub is_read: bool,
}

impl Message {
    /// One-line summary used for room-list previews and push bodies.
    pub fn preview_text(&self) -> &str {
        if let Some(content) = &self.content {
            if !content.trim().is_empty() {
                return content;
            }
        }
        if let Some(image_url) = &self.image_url {
            if !image_url.trim().is_empty() {
                return PHOTO_PREVIEW;
            }
        }
        EMPTY_ROOM_PREVIEW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: Option<&str>, image_url: Option<&str>) -> Message {
        Message {
            id: 1,
            room_id: 100,
            sender_id: 2,
            content: content.map(str::to_string),
            image_url: image_url.map(str::to_string),
            sent_at: "2025-01-01T00:00:00+00:00".to_string(),
            is_read: false,
        }
    }

    #[test]
    fn preview_uses_text_when_present() {
        assert_eq!(message(Some("hello"), None).preview_text(), "hello");
        assert_eq!(
            message(Some("hello"), Some("x.jpg")).preview_text(),
            "hello"
        );
    }

    #[test]
    fn preview_marks_image_only_messages() {
        assert_eq!(message(None, Some("x.jpg")).preview_text(), PHOTO_PREVIEW);
        assert_eq!(message(Some("  "), Some("x.jpg")).preview_text(), PHOTO_PREVIEW);
    }

    #[test]
    fn preview_falls_back_when_both_missing() {
        assert_eq!(message(None, None).preview_text(), EMPTY_ROOM_PREVIEW);
    }
}
