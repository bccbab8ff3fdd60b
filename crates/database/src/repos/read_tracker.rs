//! Per-viewer read state, derived from the message log.
//!
//! Correctness is scoped to a single (room, viewer) pair; the bulk UPDATE is
//! the only write and needs no coordination beyond the storage layer's own.

use crate::types::ChatResult;
use sqlx::SqlitePool;
use tracing::debug;

pub struct ReadTracker {
    pool: SqlitePool,
}

impl ReadTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of unread messages the other party sent in this room.
    pub async fn unread_count(&self, room_id: i64, viewer_id: i64) -> ChatResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages
             WHERE room_id = ? AND sender_id != ? AND is_read = 0",
        )
        .bind(room_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Flip every unread partner message in the room to read.
    ///
    /// Idempotent: a call with nothing left to flip affects zero rows and is
    /// not an error. Returns the number of rows updated.
    pub async fn mark_read(&self, room_id: i64, viewer_id: i64) -> ChatResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1
             WHERE room_id = ? AND sender_id != ? AND is_read = 0",
        )
        .bind(room_id)
        .bind(viewer_id)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected();
        if updated > 0 {
            debug!(room_id, viewer_id, updated, "marked messages read");
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::MessageRepository;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_read_tracker.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = sqlx::sqlite::SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        crate::migrations::run_migrations(&pool).await.unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        for id in [1_i64, 2] {
            sqlx::query(
                "INSERT INTO users (id, public_id, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(format!("user-{id}"))
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
        sqlx::query(
            "INSERT INTO rooms (id, listing_id, lender_id, borrower_id, created_at)
             VALUES (100, 42, 1, 2, ?)",
        )
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_unread_count_ignores_own_messages() {
        let (pool, _temp_dir) = create_test_pool().await;
        let messages = MessageRepository::new(pool.clone());
        let tracker = ReadTracker::new(pool);

        messages.append(100, 2, Some("hello"), None).await.unwrap();

        assert_eq!(tracker.unread_count(100, 1).await.unwrap(), 1);
        assert_eq!(tracker.unread_count(100, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_clears_and_is_idempotent() {
        let (pool, _temp_dir) = create_test_pool().await;
        let messages = MessageRepository::new(pool.clone());
        let tracker = ReadTracker::new(pool);

        messages.append(100, 2, Some("one"), None).await.unwrap();
        messages.append(100, 2, Some("two"), None).await.unwrap();
        messages.append(100, 1, Some("mine"), None).await.unwrap();

        assert_eq!(tracker.unread_count(100, 1).await.unwrap(), 2);

        assert_eq!(tracker.mark_read(100, 1).await.unwrap(), 2);
        assert_eq!(tracker.unread_count(100, 1).await.unwrap(), 0);

        // Nothing left to flip: no-op, no error.
        assert_eq!(tracker.mark_read(100, 1).await.unwrap(), 0);

        // The viewer's own message stays unread from the partner's side
        // until the partner marks it.
        assert_eq!(tracker.unread_count(100, 2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_new_messages_after_mark_read_count_again() {
        let (pool, _temp_dir) = create_test_pool().await;
        let messages = MessageRepository::new(pool.clone());
        let tracker = ReadTracker::new(pool);

        messages.append(100, 2, Some("before"), None).await.unwrap();
        tracker.mark_read(100, 1).await.unwrap();

        messages.append(100, 2, Some("after"), None).await.unwrap();
        assert_eq!(tracker.unread_count(100, 1).await.unwrap(), 1);
    }
}
