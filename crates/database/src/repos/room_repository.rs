//! Repository for room identity. One room per (listing, lender, borrower)
//! triple, enforced by a storage-level uniqueness constraint.

use crate::entities::Room;
use crate::types::{ChatError, ChatResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the room for the triple, creating it if absent.
    ///
    /// Creation goes through an insert-or-ignore against the unique
    /// constraint followed by a fetch of the surviving row, so two
    /// concurrent calls with the same triple collapse into one room even
    /// across process instances. Fails with NotFound when the listing or
    /// either party is missing from its store.
    pub async fn find_or_create(
        &self,
        listing_id: i64,
        lender_id: i64,
        borrower_id: i64,
    ) -> ChatResult<Room> {
        self.require_listing(listing_id).await?;
        self.require_user(lender_id).await?;
        self.require_user(borrower_id).await?;

        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO rooms (listing_id, lender_id, borrower_id, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(listing_id, lender_id, borrower_id) DO NOTHING",
        )
        .bind(listing_id)
        .bind(lender_id)
        .bind(borrower_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, listing_id, lender_id, borrower_id, created_at
             FROM rooms WHERE listing_id = ? AND lender_id = ? AND borrower_id = ?",
        )
        .bind(listing_id)
        .bind(lender_id)
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;

        let room = room_from_row(&row)?;

        if result.rows_affected() > 0 {
            info!(
                room_id = room.id,
                listing_id = listing_id,
                lender_id = lender_id,
                borrower_id = borrower_id,
                "created chat room"
            );
        }

        Ok(room)
    }

    pub async fn find_by_id(&self, room_id: i64) -> ChatResult<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, listing_id, lender_id, borrower_id, created_at FROM rooms WHERE id = ?",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| room_from_row(&row)).transpose()
    }

    /// All rooms the user participates in, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> ChatResult<Vec<Room>> {
        let rows = sqlx::query(
            "SELECT id, listing_id, lender_id, borrower_id, created_at
             FROM rooms WHERE lender_id = ? OR borrower_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(room_from_row).collect()
    }

    pub async fn listing_title(&self, listing_id: i64) -> ChatResult<Option<String>> {
        let title = sqlx::query_scalar::<_, String>("SELECT title FROM listings WHERE id = ?")
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(title)
    }

    async fn require_listing(&self, listing_id: i64) -> ChatResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM listings WHERE id = ?")
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(ChatError::ListingNotFound);
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

fn room_from_row(row: &SqliteRow) -> ChatResult<Room> {
    Ok(Room {
        id: row.try_get("id")?,
        listing_id: row.try_get("listing_id")?,
        lender_id: row.try_get("lender_id")?,
        borrower_id: row.try_get("borrower_id")?,
        created_at: row.try_get("created_at")?,
    })
}
