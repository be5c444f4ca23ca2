//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the websocket relay and the room REST endpoints under
//! a single Axum router with permissive CORS and request tracing.

pub mod rooms;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ws", get(ws::handle_ws))
        .route(
            "/api/rooms/{room_id}/elements",
            get(rooms::list_elements).delete(rooms::clear_elements),
        )
        .route(
            "/api/rooms/{room_id}/elements/{element_id}",
            put(rooms::put_element).delete(rooms::delete_element),
        )
        .route("/api/rooms/{room_id}/editors", put(rooms::put_editors))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
