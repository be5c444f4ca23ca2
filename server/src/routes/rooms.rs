//! Room element REST routes.
//!
//! Operator-facing access to a room's elements and editor allow-list.
//! Element writes are relayed to any live clients in the room exactly as
//! websocket edits would be.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use frames::{Data, Frame, syscall};

use crate::services::element::{self, ElementError};
use crate::services::room::{self, RoomError};
use crate::state::AppState;

/// `GET /api/rooms/{room_id}/elements`: ordered element list.
pub async fn list_elements(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<Value>>, StatusCode> {
    let elements = room::snapshot(&state, &room_id).await.map_err(room_error_to_status)?;
    Ok(Json(elements))
}

/// `PUT /api/rooms/{room_id}/elements/{element_id}`: upsert one element.
pub async fn put_element(
    State(state): State<AppState>,
    Path((room_id, element_id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Result<StatusCode, StatusCode> {
    let Some(object) = body.as_object_mut() else {
        return Err(StatusCode::BAD_REQUEST);
    };
    match object.get("id").and_then(Value::as_str) {
        Some(id) if id != element_id => return Err(StatusCode::BAD_REQUEST),
        Some(_) => {}
        None => {
            object.insert("id".into(), json!(element_id));
        }
    }

    element::upsert_element(&state, &room_id, None, body.clone())
        .await
        .map_err(element_error_to_status)?;

    let notice = Frame::request(syscall::ELEMENT_UPSERT, Data::new())
        .with_room_id(room_id.clone())
        .with_data("element", body);
    room::broadcast(&state, &room_id, &notice, None).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/rooms/{room_id}/elements/{element_id}`: remove one element.
pub async fn delete_element(
    State(state): State<AppState>,
    Path((room_id, element_id)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let existed = element::delete_element(&state, &room_id, None, &element_id)
        .await
        .map_err(element_error_to_status)?;
    if !existed {
        return Err(StatusCode::NOT_FOUND);
    }

    let notice = Frame::request(syscall::ELEMENT_DELETE, Data::new())
        .with_room_id(room_id.clone())
        .with_data("id", element_id);
    room::broadcast(&state, &room_id, &notice, None).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/rooms/{room_id}/elements`: truncate the room.
pub async fn clear_elements(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    room::clear_room(&state, &room_id, None).await.map_err(room_error_to_status)?;

    let notice = Frame::request(syscall::ROOM_CLEAR, Data::new()).with_room_id(room_id.clone());
    room::broadcast(&state, &room_id, &notice, None).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct EditorsBody {
    /// Labels allowed to edit. `null` lifts the restriction.
    pub editors: Option<Vec<String>>,
}

/// `PUT /api/rooms/{room_id}/editors`: replace the editor allow-list.
pub async fn put_editors(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<EditorsBody>,
) -> Result<StatusCode, StatusCode> {
    room::set_editors(&state, &room_id, body.editors).await.map_err(room_error_to_status)?;
    Ok(StatusCode::NO_CONTENT)
}

fn room_error_to_status(err: RoomError) -> StatusCode {
    match err {
        RoomError::NotJoined => StatusCode::BAD_REQUEST,
        RoomError::Forbidden(_) => StatusCode::FORBIDDEN,
        RoomError::Store(e) => {
            tracing::error!(error = %e, "room store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn element_error_to_status(err: ElementError) -> StatusCode {
    match err {
        ElementError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ElementError::Forbidden(_) => StatusCode::FORBIDDEN,
        ElementError::Store(e) => {
            tracing::error!(error = %e, "element store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
