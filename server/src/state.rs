//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the element store and the registry of live rooms. A room is
//! live while at least one client is joined. Each live room keeps its
//! elements, connected clients, and the dirty set for debounced persistence.
//!
//! LOCK ORDER
//! ==========
//! `store_lock` is always taken before `rooms`. Flush, delete, clear, and
//! first-join hydration all hold `store_lock` for their whole store round
//! trip so a clear can never be undone by an in-flight flush.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use frames::Frame;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::store::{ElementRecord, ElementStore, RoomRecord};

// =============================================================================
// STORED ELEMENT
// =============================================================================

/// In-memory element of a live room.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredElement {
    /// Draw order within the room.
    pub seq: i64,
    /// Bumped on every accepted write. Flushes compare it before clearing dirty flags.
    pub revision: u64,
    pub body: Value,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// A joined participant.
pub struct ConnectedClient {
    pub label: String,
    pub tx: mpsc::Sender<Frame>,
}

/// Per-room live state. Flushed to the store by the persistence task.
pub struct RoomState {
    /// Current elements keyed by element id.
    pub elements: HashMap<String, StoredElement>,
    pub next_seq: i64,
    /// Labels allowed to edit. `None` means unrestricted.
    pub editors: Option<HashSet<String>>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Connected clients keyed by connection id.
    pub clients: HashMap<Uuid, ConnectedClient>,
    /// Element ids modified since the last flush.
    pub dirty: HashSet<String>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::from_record(RoomRecord::default())
    }

    /// Hydrate from a stored room.
    #[must_use]
    pub fn from_record(record: RoomRecord) -> Self {
        let next_seq = record.elements.iter().map(|r| r.seq).max().unwrap_or(0) + 1;
        let elements = record
            .elements
            .into_iter()
            .map(|r| (r.id, StoredElement { seq: r.seq, revision: 0, body: r.body }))
            .collect();
        Self {
            elements,
            next_seq,
            editors: record.editors.map(|labels| labels.into_iter().collect()),
            created_at: record.created_at,
            updated_at: record.updated_at,
            clients: HashMap::new(),
            dirty: HashSet::new(),
        }
    }

    /// Whether `label` may mutate this room. `None` is a trusted operator.
    #[must_use]
    pub fn can_edit(&self, label: Option<&str>) -> bool {
        match (&self.editors, label) {
            (None, _) | (Some(_), None) => true,
            (Some(editors), Some(label)) => editors.contains(label),
        }
    }

    /// Insert or replace an element by id and mark it dirty. Returns its sequence.
    pub fn apply_upsert(&mut self, id: &str, body: Value) -> i64 {
        self.updated_at = frames::now_ms();
        self.dirty.insert(id.to_owned());
        if let Some(existing) = self.elements.get_mut(id) {
            existing.body = body;
            existing.revision += 1;
            return existing.seq;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.elements.insert(id.to_owned(), StoredElement { seq, revision: 0, body });
        seq
    }

    /// Drop an element. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.dirty.remove(id);
        self.updated_at = frames::now_ms();
        self.elements.remove(id).is_some()
    }

    /// Drop every element and pending write.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.dirty.clear();
        self.updated_at = frames::now_ms();
    }

    /// Element bodies in draw order.
    #[must_use]
    pub fn ordered_bodies(&self) -> Vec<Value> {
        let mut ordered: Vec<&StoredElement> = self.elements.values().collect();
        ordered.sort_by_key(|e| e.seq);
        ordered.into_iter().map(|e| e.body.clone()).collect()
    }

    /// Snapshot dirty elements for a flush, with the revision each was captured at.
    #[must_use]
    pub fn dirty_snapshot(&self) -> (Vec<ElementRecord>, Vec<(String, u64)>) {
        let mut records = Vec::with_capacity(self.dirty.len());
        let mut revisions = Vec::with_capacity(self.dirty.len());
        for id in &self.dirty {
            let Some(element) = self.elements.get(id) else {
                continue;
            };
            records.push(ElementRecord { id: id.clone(), seq: element.seq, body: element.body.clone() });
            revisions.push((id.clone(), element.revision));
        }
        records.sort_by_key(|r| r.seq);
        (records, revisions)
    }

    /// Clear dirty flags for elements not rewritten since the snapshot.
    pub fn ack_flushed(&mut self, flushed: &[(String, u64)]) {
        for (id, revision) in flushed {
            // EDGE: keep the flag if the element was written again mid-flush.
            let can_clear = match self.elements.get(id) {
                Some(current) => current.revision == *revision,
                None => true,
            };
            if can_clear {
                self.dirty.remove(id);
            }
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ElementStore>,
    /// Live rooms keyed by room id.
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    /// Serializes store writes. See LOCK ORDER.
    pub store_lock: Arc<Mutex<()>>,
    /// Outgoing frame queue depth per websocket client.
    pub client_channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn ElementStore>, client_channel_capacity: usize) -> Self {
        Self {
            store,
            rooms: Arc::new(RwLock::new(HashMap::new())),
            store_lock: Arc::new(Mutex::new(())),
            client_channel_capacity,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::store::{MemoryElementStore, StoreError};

    /// Create a test `AppState` over an empty in-memory store.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(Arc::new(MemoryElementStore::new()), 16)
    }

    /// In-memory store whose writes fail while `failing` is set.
    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryElementStore,
        pub failing: AtomicBool,
    }

    impl FlakyStore {
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ElementStore for FlakyStore {
        async fn load_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
            self.check()?;
            self.inner.load_room(room_id).await
        }

        async fn upsert_elements(&self, room_id: &str, records: &[ElementRecord]) -> Result<(), StoreError> {
            self.check()?;
            self.inner.upsert_elements(room_id, records).await
        }

        async fn delete_element(&self, room_id: &str, element_id: &str) -> Result<bool, StoreError> {
            self.check()?;
            self.inner.delete_element(room_id, element_id).await
        }

        async fn clear_room(&self, room_id: &str) -> Result<(), StoreError> {
            self.check()?;
            self.inner.clear_room(room_id).await
        }

        async fn set_editors(&self, room_id: &str, editors: Option<&[String]>) -> Result<(), StoreError> {
            self.inner.set_editors(room_id, editors).await
        }
    }

    /// Create a test `AppState` over a store that can be made to fail.
    #[must_use]
    pub fn flaky_app_state() -> (AppState, Arc<FlakyStore>) {
        let store = Arc::new(FlakyStore::default());
        (AppState::new(store.clone(), 16), store)
    }

    /// Minimal valid element body.
    #[must_use]
    pub fn element(id: &str, kind: &str) -> Value {
        serde_json::json!({"id": id, "type": kind, "x": 0, "y": 0, "color": "#000000", "size": 2})
    }

    /// Register a live client in `room_id` and return its receiver.
    pub async fn seed_client(state: &AppState, room_id: &str, client_id: Uuid, label: &str) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(16);
        let mut rooms = state.rooms.write().await;
        rooms
            .entry(room_id.to_owned())
            .or_default()
            .clients
            .insert(client_id, ConnectedClient { label: label.to_owned(), tx });
        rx
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
