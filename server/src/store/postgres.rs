//! Postgres element store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup connects the pool and applies the embedded migrations from
//! `server/migrations` before the router accepts traffic.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use sqlx::postgres::PgPoolOptions;

use super::{ElementRecord, ElementStore, RoomRecord, StoreError};

pub struct PgElementStore {
    pool: PgPool,
}

impl PgElementStore {
    /// Connect to `database_url` and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migrations fail.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ElementStore for PgElementStore {
    async fn load_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        let now = frames::now_ms();
        sqlx::query(
            "INSERT INTO rooms (id, created_at, updated_at) VALUES ($1, $2, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(room_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let (editors, created_at, updated_at) = sqlx::query_as::<_, (Option<Vec<String>>, i64, i64)>(
            "SELECT editors, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, (String, i64, Value)>(
            "SELECT id, seq, body FROM elements WHERE room_id = $1 ORDER BY seq ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RoomRecord {
            editors,
            created_at,
            updated_at,
            elements: rows
                .into_iter()
                .map(|(id, seq, body)| ElementRecord { id, seq, body })
                .collect(),
        })
    }

    async fn upsert_elements(&self, room_id: &str, records: &[ElementRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        touch_room(&mut tx, room_id).await?;
        for record in records {
            sqlx::query(
                "INSERT INTO elements (room_id, id, seq, body)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (room_id, id) DO UPDATE SET body = EXCLUDED.body",
            )
            .bind(room_id)
            .bind(&record.id)
            .bind(record.seq)
            .bind(&record.body)
            .execute(tx.as_mut())
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_element(&self, room_id: &str, element_id: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM elements WHERE room_id = $1 AND id = $2")
            .bind(room_id)
            .bind(element_id)
            .execute(tx.as_mut())
            .await?;
        touch_room(&mut tx, room_id).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        touch_room(&mut tx, room_id).await?;
        sqlx::query("DELETE FROM elements WHERE room_id = $1")
            .bind(room_id)
            .execute(tx.as_mut())
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_editors(&self, room_id: &str, editors: Option<&[String]>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        touch_room(&mut tx, room_id).await?;
        sqlx::query("UPDATE rooms SET editors = $2 WHERE id = $1")
            .bind(room_id)
            .bind(editors)
            .execute(tx.as_mut())
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Create the room row if missing and bump its `updated_at`.
async fn touch_room(tx: &mut Transaction<'_, Postgres>, room_id: &str) -> Result<(), sqlx::Error> {
    let now = frames::now_ms();
    sqlx::query(
        "INSERT INTO rooms (id, created_at, updated_at) VALUES ($1, $2, $2)
         ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
    )
    .bind(room_id)
    .bind(now)
    .execute(tx.as_mut())
    .await?;
    Ok(())
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
