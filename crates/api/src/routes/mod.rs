pub mod auth;
pub mod health;
pub mod messages;
pub mod push_tokens;
pub mod rooms;
pub mod websocket;
