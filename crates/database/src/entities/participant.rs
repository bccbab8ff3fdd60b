//! Chat participant projection of the externally owned user store.

use serde::{Deserialize, Serialize};

/// The slice of a user row the chat core needs: identity, a display name for
/// push titles and room lists, and the optional mobile device token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: i64,
    pub public_id: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub device_token: Option<String>,
}

impl Participant {
    /// Display name with a neutral fallback for profiles that never set one.
    pub fn display_name_or_default(&self) -> &str {
        self.display_name.as_deref().unwrap_or("A user")
    }
}
