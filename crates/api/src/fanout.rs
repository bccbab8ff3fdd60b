//! Fan-out of freshly persisted messages.
//!
//! Runs once per successful append, strictly after the write has committed.
//! Every sub-step is best-effort: a failure is logged and swallowed so the
//! durable history never depends on notification delivery.

use crate::protocol::{self, RoomUpdate, ServerFrame};
use crate::push::PushClient;
use lendline_database::{Message, ParticipantRepository, Room};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 100;

/// Lazily created broadcast channels: one per live room topic and one per
/// user's private queue. Subscribers present at publish time receive the
/// frame; there is no queued redelivery.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    rooms: Arc<Mutex<HashMap<i64, broadcast::Sender<ServerFrame>>>>,
    users: Arc<Mutex<HashMap<i64, broadcast::Sender<ServerFrame>>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn room_channel(&self, room_id: i64) -> broadcast::Sender<ServerFrame> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub async fn user_channel(&self, user_id: i64) -> broadcast::Sender<ServerFrame> {
        let mut users = self.users.lock().await;
        users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

pub struct Dispatcher {
    pool: SqlitePool,
    channels: ChannelRegistry,
    push: PushClient,
}

impl Dispatcher {
    pub fn new(pool: SqlitePool, channels: ChannelRegistry, push: PushClient) -> Self {
        Self {
            pool,
            channels,
            push,
        }
    }

    /// Fan out one appended message: room broadcast, room-list summaries to
    /// both parties, and a mobile push addressed to the partner. Infallible
    /// by contract; the append has already succeeded.
    pub async fn dispatch(&self, room: &Room, message: &Message) {
        let partner_id = room.other_party(message.sender_id);

        self.broadcast_to_room(room, message).await;
        self.send_room_updates(message, partner_id).await;
        if let Err(error) = self.push_to_partner(room, message, partner_id).await {
            warn!(
                room_id = room.id,
                partner_id,
                error = ?error,
                "push notification failed"
            );
        }
    }

    async fn broadcast_to_room(&self, room: &Room, message: &Message) {
        let channel = self.channels.room_channel(room.id).await;
        let frame = ServerFrame::Message {
            destination: protocol::topic_destination(room.id),
            payload: message.clone(),
        };

        if channel.send(frame).is_err() {
            debug!(room_id = room.id, "no live subscribers for room broadcast");
        }
    }

    async fn send_room_updates(&self, message: &Message, partner_id: i64) {
        let update = RoomUpdate::for_message(message);

        for user_id in [message.sender_id, partner_id] {
            let channel = self.channels.user_channel(user_id).await;
            let frame = ServerFrame::RoomUpdate {
                destination: protocol::user_queue_destination(user_id),
                payload: update.clone(),
            };

            if channel.send(frame).is_err() {
                debug!(user_id, "user not connected, room update dropped");
            }
        }
    }

    async fn push_to_partner(
        &self,
        room: &Room,
        message: &Message,
        partner_id: i64,
    ) -> anyhow::Result<()> {
        let participants = ParticipantRepository::new(self.pool.clone());

        let partner = participants.require(partner_id).await?;
        let Some(device_token) = partner.device_token.as_deref() else {
            debug!(partner_id, "partner has no device token, push skipped");
            return Ok(());
        };

        let sender = participants.require(message.sender_id).await?;
        let title = format!("New message from {}", sender.display_name_or_default());

        self.push
            .send(device_token, &title, message.preview_text(), room.id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendline_database::{MessageRepository, RoomRepository};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_fanout.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = sqlx::sqlite::SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        lendline_database::run_migrations(&pool).await.unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        for (id, name) in [(1, "Lena"), (2, "Bo")] {
            sqlx::query(
                "INSERT INTO users (id, public_id, display_name, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(format!("user-{id}"))
            .bind(name)
            .bind(&now)
            .bind(&now)
            .execute(&pool)
            .await
            .unwrap();
        }
        sqlx::query("INSERT INTO listings (id, owner_id, title, created_at) VALUES (42, 1, 'Drill', ?)")
            .bind(&now)
            .execute(&pool)
            .await
            .unwrap();

        (pool, temp_dir)
    }

    async fn seed_room_and_message(pool: &SqlitePool) -> (Room, Message) {
        let room = RoomRepository::new(pool.clone())
            .find_or_create(42, 1, 2)
            .await
            .unwrap();
        let message = MessageRepository::new(pool.clone())
            .append(room.id, 2, None, Some("x.jpg"))
            .await
            .unwrap();
        (room, message)
    }

    #[tokio::test]
    async fn dispatch_broadcasts_to_room_subscribers() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (room, message) = seed_room_and_message(&pool).await;

        let channels = ChannelRegistry::new();
        let mut subscriber = channels.room_channel(room.id).await.subscribe();

        let dispatcher = Dispatcher::new(pool, channels, PushClient::disabled());
        dispatcher.dispatch(&room, &message).await;

        match subscriber.recv().await.unwrap() {
            ServerFrame::Message {
                destination,
                payload,
            } => {
                assert_eq!(destination, format!("topic/signal/{}", room.id));
                assert_eq!(payload.id, message.id);
                assert_eq!(payload.image_url.as_deref(), Some("x.jpg"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_updates_both_private_queues() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (room, message) = seed_room_and_message(&pool).await;

        let channels = ChannelRegistry::new();
        let mut lender_queue = channels.user_channel(1).await.subscribe();
        let mut borrower_queue = channels.user_channel(2).await.subscribe();

        let dispatcher = Dispatcher::new(pool, channels, PushClient::disabled());
        dispatcher.dispatch(&room, &message).await;

        for (user_id, queue) in [(1, &mut lender_queue), (2, &mut borrower_queue)] {
            match queue.recv().await.unwrap() {
                ServerFrame::RoomUpdate {
                    destination,
                    payload,
                } => {
                    assert_eq!(
                        destination,
                        format!("user/{user_id}/queue/chat-list-update")
                    );
                    assert_eq!(payload.room_id, room.id);
                    assert_eq!(payload.last_message_content, "[photo]");
                    assert_eq!(payload.last_message_time, message.sent_at);
                }
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_is_harmless() {
        let (pool, _temp_dir) = create_test_pool().await;
        let (room, message) = seed_room_and_message(&pool).await;

        let dispatcher = Dispatcher::new(pool, ChannelRegistry::new(), PushClient::disabled());

        // No subscribers anywhere, push disabled, partner has no device
        // token: nothing to observe, nothing to fail.
        dispatcher.dispatch(&room, &message).await;
    }
}
