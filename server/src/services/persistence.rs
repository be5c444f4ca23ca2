//! Persistence service: background flush for dirty elements.
//!
//! DESIGN
//! ======
//! A background task flushes dirty elements of every live room, then sleeps
//! for the configured interval before the next cycle. Websocket handling
//! never waits on store I/O for upserts.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after successful writes. This prioritizes
//! durability over duplicate flush attempts: repeated upserts are acceptable,
//! silent data loss is not.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::state::AppState;
use crate::store::StoreError;

/// Spawn the background flush task. Returns a handle for shutdown.
pub fn spawn_flush_task(state: AppState, interval: Duration) -> JoinHandle<()> {
    info!(flush_interval_ms = interval.as_millis(), "element persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            tokio::time::sleep(interval).await;
        }
    })
}

/// Flush every live room with pending writes. Failures are logged and retried next cycle.
pub async fn flush_all_dirty(state: &AppState) {
    let _guard = state.store_lock.lock().await;

    let room_ids = {
        let rooms = state.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, room)| !room.dirty.is_empty())
            .map(|(room_id, _)| room_id.clone())
            .collect::<Vec<_>>()
    };

    for room_id in room_ids {
        if let Err(e) = flush_room(state, &room_id).await {
            error!(error = %e, %room_id, "persistence flush failed");
        }
    }
}

/// Write one room's dirty elements and acknowledge what was written.
///
/// Caller must hold `store_lock`.
///
/// # Errors
///
/// Returns the store error; dirty flags are left in place.
pub async fn flush_room(state: &AppState, room_id: &str) -> Result<(), StoreError> {
    // PHASE: SNAPSHOT UNDER LOCK, WRITE WITHOUT IT
    let (records, revisions) = {
        let rooms = state.rooms.read().await;
        let Some(room) = rooms.get(room_id) else {
            return Ok(());
        };
        room.dirty_snapshot()
    };
    if records.is_empty() {
        return Ok(());
    }

    state.store.upsert_elements(room_id, &records).await?;

    let mut rooms = state.rooms.write().await;
    if let Some(room) = rooms.get_mut(room_id) {
        room.ack_flushed(&revisions);
    }
    tracing::debug!(%room_id, count = records.len(), "flushed dirty elements");
    Ok(())
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
