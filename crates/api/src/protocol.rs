//! Wire frames for the chat WebSocket.
//!
//! Destinations follow the mobile clients' addressing scheme: sends go to
//! `signal/{roomId}`, the room broadcast goes out on `topic/signal/{roomId}`,
//! and each user owns a private `user/{userId}/queue/chat-list-update` queue.

use lendline_database::Message;
use serde::{Deserialize, Serialize};

const SEND_PREFIX: &str = "signal/";
const TOPIC_PREFIX: &str = "topic/signal/";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Subscribe { destination: String },
    Unsubscribe { destination: String },
    Send {
        destination: String,
        payload: SendPayload,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPayload {
    pub sender_id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Message {
        destination: String,
        payload: Message,
    },
    RoomUpdate {
        destination: String,
        payload: RoomUpdate,
    },
    Subscribed { destination: String },
    Unsubscribed { destination: String },
    Error { message: String },
}

/// Room-list summary pushed to both parties after every append.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
    pub room_id: i64,
    pub last_message_content: String,
    pub last_message_time: String,
}

impl RoomUpdate {
    pub fn for_message(message: &Message) -> Self {
        Self {
            room_id: message.room_id,
            last_message_content: message.preview_text().to_string(),
            last_message_time: message.sent_at.clone(),
        }
    }
}

/// Parse `signal/{roomId}` inbound send destinations.
pub fn parse_send_destination(destination: &str) -> Option<i64> {
    destination.strip_prefix(SEND_PREFIX)?.parse().ok()
}

/// Parse `topic/signal/{roomId}` subscription destinations.
pub fn parse_topic_destination(destination: &str) -> Option<i64> {
    destination.strip_prefix(TOPIC_PREFIX)?.parse().ok()
}

pub fn topic_destination(room_id: i64) -> String {
    format!("{TOPIC_PREFIX}{room_id}")
}

pub fn user_queue_destination(user_id: i64) -> String {
    format!("user/{user_id}/queue/chat-list-update")
}
