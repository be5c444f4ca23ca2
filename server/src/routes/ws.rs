//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by syscall prefix
//! - Broadcast frames from room peers → forward to client
//!
//! Handler functions are pure business logic: they validate, mutate state,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and broadcast to peers.
//!
//! Frames go out as binary protobuf. Inbound, binary protobuf and JSON text
//! are both accepted.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → broadcast `room:part` → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use frames::{Data, Frame, Status, syscall};

use crate::services;
use crate::services::room::RoomError;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
enum Outcome {
    /// Broadcast data to all room peers EXCLUDING sender. No reply to sender.
    /// Used for cursor moves (ephemeral, no persistence).
    BroadcastExcludeSender(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender with one payload, broadcast a notice to peers.
    ReplyAndBroadcast { reply: Data, broadcast: Data },
}

/// Per-connection state threaded through dispatch.
pub(crate) struct Session {
    pub(crate) client_id: Uuid,
    pub(crate) label: String,
    pub(crate) room: Option<String>,
    pub(crate) tx: mpsc::Sender<Frame>,
}

impl Session {
    pub(crate) fn new(client_id: Uuid, tx: mpsc::Sender<Frame>) -> Self {
        Self { client_id, label: "anonymous".into(), room: None, tx }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.client_channel_capacity);
    let mut session = Session::new(client_id, client_tx);

    let welcome = Frame::request(syscall::SESSION_CONNECTED, Data::new()).with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => process_inbound_binary(&state, &mut session, &bytes).await,
                    Message::Text(text) => process_inbound_text(&state, &mut session, text.as_str()).await,
                    Message::Close(_) => break,
                    _ => continue,
                };
                for frame in replies {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    leave_current_room(&state, &mut session).await;
    info!(%client_id, "ws: client disconnected");
}

/// Broadcast `room:part` to peers, then part. Broadcast goes first because
/// parting may evict the room.
async fn leave_current_room(state: &AppState, session: &mut Session) {
    let Some(room_id) = session.room.take() else {
        return;
    };
    let part = Frame::request(syscall::ROOM_PART, Data::new())
        .with_room_id(room_id.clone())
        .with_from(session.client_id.to_string())
        .with_data("client_id", session.client_id.to_string());
    services::room::broadcast(state, &room_id, &part, Some(session.client_id)).await;
    services::room::part_room(state, &room_id, session.client_id).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode one inbound protobuf frame and return frames for the sender.
pub(crate) async fn process_inbound_binary(state: &AppState, session: &mut Session, bytes: &[u8]) -> Vec<Frame> {
    match frames::decode_frame(bytes) {
        Ok(req) => process_frame(state, session, req).await,
        Err(e) => {
            warn!(client_id = %session.client_id, error = %e, "ws: invalid inbound frame");
            vec![gateway_error(format!("invalid frame: {e}"))]
        }
    }
}

/// Parse one inbound JSON frame and return frames for the sender.
pub(crate) async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str) -> Vec<Frame> {
    match serde_json::from_str::<Frame>(text) {
        Ok(req) => process_frame(state, session, req).await,
        Err(e) => {
            warn!(client_id = %session.client_id, error = %e, "ws: invalid inbound frame");
            vec![gateway_error(format!("invalid json: {e}"))]
        }
    }
}

async fn process_frame(state: &AppState, session: &mut Session, mut req: Frame) -> Vec<Frame> {
    req.from = Some(session.client_id.to_string());

    let prefix = req.prefix();
    if prefix != "cursor" {
        info!(client_id = %session.client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }
    if req.status != Status::Request {
        // Clients never reply to server notices; ignore stray replies.
        return Vec::new();
    }

    let result = match prefix {
        "room" => handle_room(state, session, &req).await,
        "element" => handle_element(state, session, &req).await,
        "cursor" => Ok(handle_cursor(session, &req)),
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::BroadcastExcludeSender(data)) => {
            if let Some(room_id) = &session.room {
                let frame = Frame::request(&req.syscall, data)
                    .with_room_id(room_id.clone())
                    .with_from(session.client_id.to_string());
                services::room::broadcast(state, room_id, &frame, Some(session.client_id)).await;
            }
            vec![]
        }
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            let sender_frame = req.done_with(reply);
            if let Some(room_id) = &session.room {
                let notice = Frame::request(&req.syscall, broadcast)
                    .with_room_id(room_id.clone())
                    .with_from(session.client_id.to_string());
                services::room::broadcast(state, room_id, &notice, Some(session.client_id)).await;
            }
            vec![sender_frame]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_room(state: &AppState, session: &mut Session, req: &Frame) -> Result<Outcome, Frame> {
    match req.syscall.as_str() {
        syscall::ROOM_JOIN => {
            let Some(room_id) = req
                .room_id
                .clone()
                .or_else(|| req.str_field("room_id").map(str::to_owned))
                .filter(|id| !id.is_empty())
            else {
                return Err(req.error("room_id required"));
            };
            if let Some(label) = req.str_field("label").filter(|l| !l.is_empty()) {
                session.label = label.to_owned();
            }

            // Part current room if already joined.
            leave_current_room(state, session).await;

            let snapshot = services::room::join_room(state, &room_id, session.client_id, &session.label, session.tx.clone())
                .await
                .map_err(|e| req.error_from(&e))?;
            session.room = Some(room_id);

            let mut reply = Data::new();
            reply.insert("elements".into(), json!(snapshot.elements));
            reply.insert("client_id".into(), json!(session.client_id.to_string()));
            reply.insert("created_at".into(), json!(snapshot.created_at));
            reply.insert("updated_at".into(), json!(snapshot.updated_at));

            let mut broadcast = Data::new();
            broadcast.insert("client_id".into(), json!(session.client_id.to_string()));
            broadcast.insert("label".into(), json!(session.label));

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        syscall::ROOM_PART => {
            if session.room.is_none() {
                return Err(req.error_from(&RoomError::NotJoined));
            }
            leave_current_room(state, session).await;
            Ok(Outcome::Done)
        }
        syscall::ROOM_CLEAR => {
            let room_id = joined_room(session, req)?;
            services::room::clear_room(state, &room_id, Some(&session.label))
                .await
                .map_err(|e| req.error_from(&e))?;
            Ok(Outcome::ReplyAndBroadcast { reply: Data::new(), broadcast: Data::new() })
        }
        other => Err(req.error(format!("unknown room op: {other}"))),
    }
}

// =============================================================================
// ELEMENT HANDLERS
// =============================================================================

async fn handle_element(state: &AppState, session: &Session, req: &Frame) -> Result<Outcome, Frame> {
    let room_id = joined_room(session, req)?;

    match req.syscall.as_str() {
        syscall::ELEMENT_UPSERT => {
            let Some(element) = req.data.get("element").cloned() else {
                return Err(req.error("element required"));
            };
            let id = services::element::upsert_element(state, &room_id, Some(&session.label), element.clone())
                .await
                .map_err(|e| req.error_from(&e))?;

            let mut reply = Data::new();
            reply.insert("id".into(), json!(id));
            let mut broadcast = Data::new();
            broadcast.insert("element".into(), element);
            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        syscall::ELEMENT_DELETE => {
            let Some(id) = req.str_field("id").filter(|id| !id.is_empty()) else {
                return Err(req.error("id required"));
            };
            let existed = services::element::delete_element(state, &room_id, Some(&session.label), id)
                .await
                .map_err(|e| req.error_from(&e))?;

            let mut reply = Data::new();
            reply.insert("id".into(), json!(id));
            reply.insert("existed".into(), json!(existed));
            let mut broadcast = Data::new();
            broadcast.insert("id".into(), json!(id));
            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        other => Err(req.error(format!("unknown element op: {other}"))),
    }
}

// =============================================================================
// CURSOR HANDLER
// =============================================================================

fn handle_cursor(session: &Session, req: &Frame) -> Outcome {
    if session.room.is_none() {
        // Silently ignore cursor moves before joining.
        return Outcome::Done;
    }
    let (Some(x), Some(y)) = (req.f64_field("x"), req.f64_field("y")) else {
        return Outcome::Done;
    };

    let mut data = Data::new();
    data.insert("id".into(), json!(session.client_id.to_string()));
    data.insert("x".into(), json!(x));
    data.insert("y".into(), json!(y));
    data.insert("color".into(), json!(req.str_field("color").unwrap_or("#000000")));
    data.insert("label".into(), json!(req.str_field("label").unwrap_or(&session.label)));

    Outcome::BroadcastExcludeSender(data)
}

// =============================================================================
// HELPERS
// =============================================================================

/// The session's room, which must match the frame's `room_id` if it names one.
fn joined_room(session: &Session, req: &Frame) -> Result<String, Frame> {
    match (&session.room, &req.room_id) {
        (Some(joined), Some(named)) if joined != named => Err(req.error_from(&RoomError::NotJoined)),
        (Some(joined), _) => Ok(joined.clone()),
        (None, _) => Err(req.error_from(&RoomError::NotJoined)),
    }
}

fn gateway_error(message: String) -> Frame {
    Frame::request(syscall::GATEWAY_ERROR, Data::new())
        .with_data(frames::FRAME_CODE, "E_BAD_FRAME")
        .with_data(frames::FRAME_MESSAGE, message)
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    let is_cursor = frame.syscall == syscall::CURSOR_MOVE;
    if !is_cursor {
        if frame.status == Status::Error {
            let code = frame.str_field(frames::FRAME_CODE).unwrap_or("-");
            let message = frame.str_field(frames::FRAME_MESSAGE).unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }
    socket.send(Message::Binary(frames::encode_frame(frame).into())).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
