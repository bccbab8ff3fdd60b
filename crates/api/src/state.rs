use std::path::PathBuf;
use std::sync::Arc;

use lendline_auth::{AuthSession, Authenticator, User};
use lendline_config::UploadConfig;
use lendline_database::{
    ChatError, Message, MessageRepository, ParticipantRepository, ReadTracker, RoomRepository,
};
use sqlx::SqlitePool;

use crate::fanout::{ChannelRegistry, Dispatcher};
use crate::push::PushClient;
use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    authenticator: Authenticator,
    channels: ChannelRegistry,
    dispatcher: Arc<Dispatcher>,
    uploads_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        authenticator: Authenticator,
        push: PushClient,
        uploads: &UploadConfig,
    ) -> Self {
        let channels = ChannelRegistry::new();
        let dispatcher = Arc::new(Dispatcher::new(pool.clone(), channels.clone(), push));

        Self {
            pool,
            authenticator,
            channels,
            dispatcher,
            uploads_dir: Arc::new(PathBuf::from(&uploads.dir)),
        }
    }

    pub fn db_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn uploads_dir(&self) -> &PathBuf {
        &self.uploads_dir
    }

    pub fn rooms(&self) -> RoomRepository {
        RoomRepository::new(self.pool.clone())
    }

    pub fn messages(&self) -> MessageRepository {
        MessageRepository::new(self.pool.clone())
    }

    pub fn read_tracker(&self) -> ReadTracker {
        ReadTracker::new(self.pool.clone())
    }

    pub fn participants(&self) -> ParticipantRepository {
        ParticipantRepository::new(self.pool.clone())
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub async fn authenticate(&self, token: &str) -> Result<(User, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// Persist a message and fan it out.
    ///
    /// Persistence errors propagate untouched; once the append has
    /// committed, the message is returned no matter what happens inside the
    /// dispatcher.
    pub async fn send_message(
        &self,
        room_id: i64,
        sender_id: i64,
        content: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Message, ChatError> {
        let room = self
            .rooms()
            .find_by_id(room_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?;

        let message = self
            .messages()
            .append(room_id, sender_id, content, image_url)
            .await?;

        self.dispatcher.dispatch(&room, &message).await;

        Ok(message)
    }
}
