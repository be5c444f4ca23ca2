//! Element persistence behind a narrow async trait.
//!
//! DESIGN
//! ======
//! Elements are opaque JSON documents to the store, keyed by `(room_id, id)`
//! and ordered by a per-room sequence number assigned on first insert. An
//! upsert of an existing id replaces the body and keeps its sequence, so a
//! room's z-order survives edits.
//!
//! A room row also carries its optional editor allow-list and millisecond
//! timestamps. Every mutating call bumps `updated_at`. The allow-list is
//! administered outside the relay; the relay only reads it.
//!
//! `PgElementStore` backs production; `MemoryElementStore` runs when no
//! database is configured and in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::MemoryElementStore;
pub use postgres::PgElementStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl frames::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        "E_STORE"
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// One stored element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: String,
    /// Position in the room's draw order.
    pub seq: i64,
    /// The full element document, `id` included.
    pub body: Value,
}

/// One room with its elements in sequence order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomRecord {
    /// Participant labels allowed to edit. `None` means anyone may edit.
    pub editors: Option<Vec<String>>,
    pub created_at: i64,
    pub updated_at: i64,
    pub elements: Vec<ElementRecord>,
}

#[async_trait]
pub trait ElementStore: Send + Sync {
    /// Load a room. Creates the room if missing.
    async fn load_room(&self, room_id: &str) -> Result<RoomRecord, StoreError>;

    /// Insert or replace each record by id. An existing id keeps its stored sequence.
    async fn upsert_elements(&self, room_id: &str, records: &[ElementRecord]) -> Result<(), StoreError>;

    /// Remove one element. Returns whether it existed.
    async fn delete_element(&self, room_id: &str, element_id: &str) -> Result<bool, StoreError>;

    /// Remove every element of a room.
    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError>;

    /// Replace a room's editor allow-list. `None` lifts the restriction.
    async fn set_editors(&self, room_id: &str, editors: Option<&[String]>) -> Result<(), StoreError>;
}
