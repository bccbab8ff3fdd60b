//! Lookups against the externally owned user store, plus device-token
//! registration for the push gateway.

use crate::entities::Participant;
use crate::types::{ChatError, ChatResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

pub struct ParticipantRepository {
    pool: SqlitePool,
}

impl ParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, user_id: i64) -> ChatResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, public_id, display_name, device_token FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Participant {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            display_name: row.try_get("display_name")?,
            device_token: row.try_get("device_token")?,
        }))
    }

    pub async fn require(&self, user_id: i64) -> ChatResult<Participant> {
        self.find_by_id(user_id)
            .await?
            .ok_or(ChatError::UserNotFound)
    }

    /// Store (or replace) the user's mobile device token.
    pub async fn set_device_token(&self, user_id: i64, token: &str) -> ChatResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE users SET device_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(&now)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::UserNotFound);
        }

        info!(user_id, "registered device token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_participants.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = sqlx::sqlite::SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        crate::migrations::run_migrations(&pool).await.unwrap();

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, public_id, display_name, created_at, updated_at)
             VALUES (1, 'user-1', 'Lena', ?, ?)",
        )
        .bind(&now)
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_find_and_require() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);

        let participant = repo.require(1).await.unwrap();
        assert_eq!(participant.display_name.as_deref(), Some("Lena"));
        assert!(participant.device_token.is_none());

        assert!(repo.find_by_id(99).await.unwrap().is_none());
        assert!(matches!(
            repo.require(99).await.unwrap_err(),
            ChatError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn test_set_device_token_replaces_previous() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);

        repo.set_device_token(1, "token-a").await.unwrap();
        repo.set_device_token(1, "token-b").await.unwrap();

        let participant = repo.require(1).await.unwrap();
        assert_eq!(participant.device_token.as_deref(), Some("token-b"));

        assert!(matches!(
            repo.set_device_token(99, "x").await.unwrap_err(),
            ChatError::UserNotFound
        ));
    }
}
