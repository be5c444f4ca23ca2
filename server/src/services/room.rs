//! Room service: join/part, snapshot, clear, and broadcast.
//!
//! DESIGN
//! ======
//! A room is hydrated from the store on its first join and kept in the
//! registry while any client is connected. The join reply is the ordered
//! element snapshot; clients replace their local sequence with it.
//!
//! ERROR HANDLING
//! ==============
//! On last-client part, dirty elements are flushed before eviction. If that
//! flush fails the room stays in the registry with its dirty flags so the
//! persistence task retries instead of losing edits. A retained room is
//! never rehydrated over.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use frames::Frame;

use crate::services::persistence;
use crate::state::{AppState, ConnectedClient, RoomState};
use crate::store::StoreError;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("not joined to a room")]
    NotJoined,
    #[error("{0} may not edit this room")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl frames::ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotJoined => "E_ROOM_NOT_JOINED",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => frames::ErrorCode::retryable(e),
            _ => false,
        }
    }
}

/// What a joining client receives.
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    /// Element bodies in draw order.
    pub elements: Vec<Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a room. Hydrates from the store if the room is not live.
///
/// # Errors
///
/// Returns a store error if hydration fails.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    label: &str,
    tx: mpsc::Sender<Frame>,
) -> Result<JoinSnapshot, RoomError> {
    loop {
        let live = state.rooms.read().await.contains_key(room_id);
        if !live {
            hydrate(state, room_id).await?;
        }
        // EDGE: the last client may have parted and evicted the room since the
        // check above. Hydrate again rather than attach to an empty room.
        if let Some(snapshot) = attach_client(state, room_id, client_id, label, tx.clone()).await {
            return Ok(snapshot);
        }
    }
}

/// Load a room from the store into the registry unless it is already live.
async fn hydrate(state: &AppState, room_id: &str) -> Result<(), RoomError> {
    let _guard = state.store_lock.lock().await;
    if state.rooms.read().await.contains_key(room_id) {
        return Ok(());
    }
    let record = state.store.load_room(room_id).await?;
    // Insert under the store lock so no store write slips in between.
    let mut rooms = state.rooms.write().await;
    if !rooms.contains_key(room_id) {
        let room = RoomState::from_record(record);
        info!(%room_id, count = room.elements.len(), "hydrated room from store");
        rooms.insert(room_id.to_owned(), room);
    }
    Ok(())
}

/// Register a client in a live room. `None` if the room is not in the registry.
pub(crate) async fn attach_client(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    label: &str,
    tx: mpsc::Sender<Frame>,
) -> Option<JoinSnapshot> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_id)?;
    room.clients.insert(client_id, ConnectedClient { label: label.to_owned(), tx });
    info!(%room_id, %client_id, %label, clients = room.clients.len(), "client joined room");
    Some(JoinSnapshot { elements: room.ordered_bodies(), created_at: room.created_at, updated_at: room.updated_at })
}

/// Leave a room. If this was the last client, flush dirty elements and
/// evict the room.
pub async fn part_room(state: &AppState, room_id: &str, client_id: Uuid) {
    {
        let mut rooms = state.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        let label = room.clients.remove(&client_id).map(|client| client.label).unwrap_or_default();
        info!(%room_id, %client_id, %label, remaining = room.clients.len(), "client left room");
        if !room.clients.is_empty() {
            return;
        }
        if room.dirty.is_empty() {
            rooms.remove(room_id);
            info!(%room_id, "evicted room from memory");
            return;
        }
    }

    let _guard = state.store_lock.lock().await;
    let flushed = persistence::flush_room(state, room_id).await;

    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };
    if !room.clients.is_empty() {
        return;
    }
    match flushed {
        Ok(()) if room.dirty.is_empty() => {
            rooms.remove(room_id);
            info!(%room_id, "evicted room from memory");
        }
        Ok(()) => {
            warn!(%room_id, remaining_dirty = room.dirty.len(), "retaining room after final flush because newer dirty elements exist");
        }
        Err(e) => {
            tracing::error!(error = %e, %room_id, "final flush failed; room retained for retry");
        }
    }
}

// =============================================================================
// SNAPSHOT / CLEAR
// =============================================================================

/// Ordered element bodies of a room, live or stored.
///
/// # Errors
///
/// Returns a store error if the room is not live and loading fails.
pub async fn snapshot(state: &AppState, room_id: &str) -> Result<Vec<Value>, RoomError> {
    if let Some(room) = state.rooms.read().await.get(room_id) {
        return Ok(room.ordered_bodies());
    }
    let record = state.store.load_room(room_id).await?;
    Ok(record.elements.into_iter().map(|r| r.body).collect())
}

/// Truncate a room in the store and in memory. `label` is `None` for operators.
///
/// # Errors
///
/// Returns `Forbidden` if `label` is not an editor, or a store error.
pub async fn clear_room(state: &AppState, room_id: &str, label: Option<&str>) -> Result<(), RoomError> {
    let _guard = state.store_lock.lock().await;
    if !may_edit(state, room_id, label).await? {
        return Err(RoomError::Forbidden(label.unwrap_or_default().to_owned()));
    }

    state.store.clear_room(room_id).await?;
    if let Some(room) = state.rooms.write().await.get_mut(room_id) {
        room.clear();
    }
    info!(%room_id, "cleared room");
    Ok(())
}

/// Replace a room's editor allow-list in the store and the live room.
///
/// # Errors
///
/// Returns a store error if the write fails.
pub async fn set_editors(state: &AppState, room_id: &str, editors: Option<Vec<String>>) -> Result<(), RoomError> {
    let _guard = state.store_lock.lock().await;
    state.store.set_editors(room_id, editors.as_deref()).await?;
    if let Some(room) = state.rooms.write().await.get_mut(room_id) {
        room.editors = editors.map(|labels| labels.into_iter().collect());
    }
    info!(%room_id, "updated room editors");
    Ok(())
}

/// Whether `label` may edit `room_id`, consulting the store if the room is not live.
///
/// # Errors
///
/// Returns a store error if the room must be loaded and loading fails.
pub async fn may_edit(state: &AppState, room_id: &str, label: Option<&str>) -> Result<bool, StoreError> {
    let live = state.rooms.read().await.get(room_id).map(|room| room.can_edit(label));
    match live {
        Some(allowed) => Ok(allowed),
        None => Ok(RoomState::from_record(state.store.load_room(room_id).await?).can_edit(label)),
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room_id: &str, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (client_id, client) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: a slow client misses frames rather than stalling the room.
        if let Err(e) = client.tx.try_send(frame.clone()) {
            warn!(%room_id, %client_id, syscall = %frame.syscall, error = %e, "dropped frame for client");
        }
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
