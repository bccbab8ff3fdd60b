//! Error types for the persistence layer

use thiserror::Error;

/// Chat persistence errors
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("room not found")]
    RoomNotFound,

    #[error("listing not found")]
    ListingNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("message must contain text or an image")]
    EmptyMessage,

    #[error("database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ChatError {
    fn from(error: sqlx::Error) -> Self {
        ChatError::DatabaseError(error.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
