//! Element service: validated upsert and delete.
//!
//! DESIGN
//! ======
//! Elements are opaque JSON to the relay apart from their `id` and `type`.
//! Upserts into a live room apply in memory and are flushed later by the
//! persistence task. Writes to a room nobody has joined go straight to the
//! store. Deletes always hit the store immediately.

use serde_json::Value;
use tracing::info;

use crate::services::room;
use crate::state::{AppState, RoomState};
use crate::store::{ElementRecord, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("invalid element: {0}")]
    Invalid(&'static str),
    #[error("{0} may not edit this room")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl frames::ErrorCode for ElementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "E_INVALID_ELEMENT",
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

/// Wire tags the canvas knows how to draw.
pub const KINDS: &[&str] = &[
    "pen", "eraser", "highlighter", "rect", "circle", "triangle", "pentagon", "hexagon", "octagon", "star", "line",
    "text", "sticky", "image",
];

/// Check the element envelope and return its id.
///
/// # Errors
///
/// Returns `Invalid` unless `body` is an object with a non-empty string `id`
/// and a `type` from [`KINDS`].
pub fn validate(body: &Value) -> Result<&str, ElementError> {
    let Some(object) = body.as_object() else {
        return Err(ElementError::Invalid("element must be an object"));
    };
    let id = match object.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ElementError::Invalid("missing id")),
    };
    match object.get("type").and_then(Value::as_str) {
        Some(kind) if KINDS.contains(&kind) => Ok(id),
        Some(kind) if !kind.is_empty() => Err(ElementError::Invalid("unknown type")),
        _ => Err(ElementError::Invalid("missing type")),
    }
}

/// Insert or replace an element by id. `label` is `None` for operators.
/// Returns the element id.
///
/// # Errors
///
/// Returns `Invalid` for a malformed body, `Forbidden` for a non-editor,
/// or a store error when the room is not live.
pub async fn upsert_element(
    state: &AppState,
    room_id: &str,
    label: Option<&str>,
    body: Value,
) -> Result<String, ElementError> {
    let id = validate(&body)?.to_owned();

    {
        let mut rooms = state.rooms.write().await;
        if let Some(room) = rooms.get_mut(room_id) {
            if !room.can_edit(label) {
                return Err(forbidden(label));
            }
            room.apply_upsert(&id, body);
            return Ok(id);
        }
    }

    let _guard = state.store_lock.lock().await;
    // EDGE: the room may have gone live while waiting for the store lock.
    if let Some(room) = state.rooms.write().await.get_mut(room_id) {
        if !room.can_edit(label) {
            return Err(forbidden(label));
        }
        room.apply_upsert(&id, body);
        return Ok(id);
    }

    let stored = state.store.load_room(room_id).await?;
    let room = RoomState::from_record(stored);
    if !room.can_edit(label) {
        return Err(forbidden(label));
    }
    let seq = room.elements.get(&id).map_or(room.next_seq, |existing| existing.seq);
    state
        .store
        .upsert_elements(room_id, &[ElementRecord { id: id.clone(), seq, body }])
        .await?;
    info!(%room_id, element_id = %id, "upserted element into stored room");
    Ok(id)
}

/// Remove an element from the store and the live room. Returns whether it existed.
///
/// # Errors
///
/// Returns `Forbidden` for a non-editor or a store error.
pub async fn delete_element(
    state: &AppState,
    room_id: &str,
    label: Option<&str>,
    element_id: &str,
) -> Result<bool, ElementError> {
    let _guard = state.store_lock.lock().await;

    if !room::may_edit(state, room_id, label).await? {
        return Err(forbidden(label));
    }

    let stored = state.store.delete_element(room_id, element_id).await?;
    let live = match state.rooms.write().await.get_mut(room_id) {
        Some(room) => room.remove(element_id),
        None => false,
    };
    info!(%room_id, %element_id, existed = stored || live, "deleted element");
    Ok(stored || live)
}

fn forbidden(label: Option<&str>) -> ElementError {
    ElementError::Forbidden(label.unwrap_or_default().to_owned())
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
