//! Repository for the append-only message log.

use crate::entities::Message;
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to a room with a server-assigned timestamp.
    ///
    /// Blank text and blank image urls are normalized to NULL; a message
    /// carrying neither is rejected before touching the log. The insert is
    /// the unit of atomicity for the whole send path.
    pub async fn append(
        &self,
        room_id: i64,
        sender_id: i64,
        content: Option<&str>,
        image_url: Option<&str>,
    ) -> ChatResult<Message> {
        let content = normalize(content);
        let image_url = normalize(image_url);

        if content.is_none() && image_url.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        self.require_room(room_id).await?;
        self.require_user(sender_id).await?;

        let sent_at = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (room_id, sender_id, content, image_url, sent_at, is_read)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(content)
        .bind(image_url)
        .bind(&sent_at)
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id = message_id,
            room_id = room_id,
            sender_id = sender_id,
            "appended chat message"
        );

        Ok(Message {
            id: message_id,
            room_id,
            sender_id,
            content: content.map(str::to_string),
            image_url: image_url.map(str::to_string),
            sent_at,
            is_read: false,
        })
    }

    /// Full room history, ascending by send time with the row id as a
    /// tiebreaker so the order always matches insertion order.
    pub async fn history(&self, room_id: i64) -> ChatResult<Vec<Message>> {
        self.require_room(room_id).await?;

        let rows = sqlx::query(
            "SELECT id, room_id, sender_id, content, image_url, sent_at, is_read
             FROM messages WHERE room_id = ? ORDER BY sent_at ASC, id ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    /// The single most recent message in a room, used for list previews.
    pub async fn latest(&self, room_id: i64) -> ChatResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, content, image_url, sent_at, is_read
             FROM messages WHERE room_id = ? ORDER BY sent_at DESC, id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| message_from_row(&row)).transpose()
    }

    async fn require_room(&self, room_id: i64) -> ChatResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM rooms WHERE id = ?")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(ChatError::RoomNotFound);
        }
        Ok(())
    }

    async fn require_user(&self, user_id: i64) -> ChatResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(ChatError::UserNotFound);
        }
        Ok(())
    }
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn message_from_row(row: &SqliteRow) -> ChatResult<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        room_id: row.try_get("room_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        image_url: row.try_get("image_url")?,
        sent_at: row.try_get("sent_at")?,
        is_read: row.try_get("is_read")?,
    })
}
