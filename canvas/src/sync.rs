//! Room channel state machine.
//!
//! `SyncEngine` owns the client's side of the frame protocol: it builds the
//! outbound request frames and classifies inbound frames into
//! [`RemoteEvent`]s. It never touches the document itself; the engine applies
//! events and decides what to publish.
//!
//! STATES
//! ======
//!
//! `Disconnected → Joining → Synced`. `join` sends `room:join` and waits for
//! the `done` reply whose `parent_id` matches; that reply carries the room's
//! element snapshot. Outbound edits are only produced while `Synced`; in any
//! other state they are dropped, never queued. Inbound events are classified
//! in every state so that a late broadcast still lands.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::collections::BTreeMap;

use frames::{Data, FRAME_CODE, FRAME_MESSAGE, Frame, Status, syscall};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::camera::Point;
use crate::doc::{Element, ElementId};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// `room:join` sent, snapshot not yet received.
    Joining,
    Synced,
}

/// A remote participant's pointer, in world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    /// Server-assigned client id of the owner.
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub label: String,
}

/// Remote cursors keyed by client id.
pub type CursorMap = BTreeMap<String, Cursor>;

/// An inbound frame, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Join completed; replace the document with these elements.
    Snapshot(Vec<Element>),
    Upsert(Element),
    Delete(ElementId),
    Clear,
    Cursor(Cursor),
    /// A participant left the room.
    Part { client_id: String },
    /// Acks, peer join notices, our own cursor echoes.
    Ignored,
}

/// Errors produced while interpreting inbound frames.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{syscall} frame is missing `{field}`")]
    MissingField { syscall: String, field: &'static str },

    #[error("invalid element payload: {0}")]
    InvalidElement(#[from] serde_json::Error),

    #[error("{syscall} rejected by server ({code}): {message}")]
    Rejected { syscall: String, code: String, message: String },

    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
}

#[derive(Debug)]
pub struct SyncEngine {
    room_id: String,
    label: String,
    state: ConnectionState,
    client_id: Option<String>,
    join_request: Option<Uuid>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(room_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            label: label.into(),
            state: ConnectionState::Disconnected,
            client_id: None,
            join_request: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Our id as assigned by the server, once `session:connected` arrived.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.state == ConnectionState::Synced
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Build the `room:join` request and enter `Joining`.
    pub fn join(&mut self) -> Frame {
        let frame = Frame::request(syscall::ROOM_JOIN, Data::new())
            .with_room_id(self.room_id.clone())
            .with_data("room_id", self.room_id.clone())
            .with_data("label", self.label.clone());
        self.join_request = Some(frame.id);
        self.state = ConnectionState::Joining;
        frame
    }

    /// The socket closed. Local edits stay; the next join reloads the room.
    pub fn disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.client_id = None;
        self.join_request = None;
    }

    /// `element:upsert` carrying the full element, if synced.
    #[must_use]
    pub fn publish_upsert(&self, element: &Element) -> Option<Frame> {
        if !self.ready(syscall::ELEMENT_UPSERT) {
            return None;
        }
        match serde_json::to_value(element) {
            Ok(value) => Some(self.request(syscall::ELEMENT_UPSERT).with_data("element", value)),
            Err(e) => {
                log::warn!("element {} not serializable: {e}", element.id);
                None
            }
        }
    }

    /// `room:clear`, if synced.
    #[must_use]
    pub fn publish_clear(&self) -> Option<Frame> {
        self.ready(syscall::ROOM_CLEAR).then(|| self.request(syscall::ROOM_CLEAR))
    }

    /// `cursor:move` at `world`, if synced. The server stamps our id.
    #[must_use]
    pub fn publish_cursor(&self, world: Point, color: &str) -> Option<Frame> {
        if self.state != ConnectionState::Synced {
            return None;
        }
        Some(
            self.request(syscall::CURSOR_MOVE)
                .with_data("x", world.x)
                .with_data("y", world.y)
                .with_data("color", color)
                .with_data("label", self.label.clone()),
        )
    }

    fn ready(&self, syscall: &str) -> bool {
        if self.state == ConnectionState::Synced {
            return true;
        }
        log::debug!("dropping {syscall} while {:?}", self.state);
        false
    }

    fn request(&self, syscall: &str) -> Frame {
        Frame::request(syscall, Data::new()).with_room_id(self.room_id.clone())
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Classify an inbound frame, updating connection state as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Rejected`] for error replies,
    /// [`SyncError::MissingField`] or [`SyncError::InvalidElement`] for
    /// malformed payloads, and [`SyncError::UnknownSyscall`] for notices this
    /// client does not understand.
    pub fn receive(&mut self, frame: &Frame) -> Result<RemoteEvent, SyncError> {
        match frame.status {
            Status::Error => Err(self.rejected(frame)),
            Status::Done | Status::Item => Ok(self.reply(frame)),
            Status::Request => self.notice(frame),
        }
    }

    fn rejected(&mut self, frame: &Frame) -> SyncError {
        if self.is_join_reply(frame) {
            self.join_request = None;
            self.state = ConnectionState::Disconnected;
        }
        SyncError::Rejected {
            syscall: frame.syscall.clone(),
            code: frame.str_field(FRAME_CODE).unwrap_or("E_UNKNOWN").to_owned(),
            message: frame.str_field(FRAME_MESSAGE).unwrap_or_default().to_owned(),
        }
    }

    fn reply(&mut self, frame: &Frame) -> RemoteEvent {
        if !self.is_join_reply(frame) {
            return RemoteEvent::Ignored;
        }
        if let Some(id) = frame.str_field("client_id") {
            self.client_id = Some(id.to_owned());
        }
        let elements = match frame.data.get("elements") {
            Some(Value::Array(items)) => items.iter().filter_map(parse_snapshot_item).collect(),
            _ => Vec::new(),
        };
        self.join_request = None;
        self.state = ConnectionState::Synced;
        RemoteEvent::Snapshot(elements)
    }

    fn notice(&mut self, frame: &Frame) -> Result<RemoteEvent, SyncError> {
        let event = match frame.syscall.as_str() {
            syscall::SESSION_CONNECTED => {
                if let Some(id) = frame.str_field("client_id") {
                    self.client_id = Some(id.to_owned());
                }
                RemoteEvent::Ignored
            }
            syscall::ROOM_JOIN => RemoteEvent::Ignored,
            syscall::ELEMENT_UPSERT => {
                let value = frame.data.get("element").ok_or_else(|| missing(frame, "element"))?;
                RemoteEvent::Upsert(Element::deserialize(value)?)
            }
            syscall::ELEMENT_DELETE => {
                let id = frame.str_field("id").ok_or_else(|| missing(frame, "id"))?;
                RemoteEvent::Delete(id.to_owned())
            }
            syscall::ROOM_CLEAR => RemoteEvent::Clear,
            syscall::CURSOR_MOVE => self.cursor(frame)?,
            syscall::ROOM_PART => {
                let id = frame.str_field("client_id").ok_or_else(|| missing(frame, "client_id"))?;
                RemoteEvent::Part { client_id: id.to_owned() }
            }
            other => return Err(SyncError::UnknownSyscall(other.to_owned())),
        };
        Ok(event)
    }

    fn cursor(&self, frame: &Frame) -> Result<RemoteEvent, SyncError> {
        let id = frame
            .str_field("id")
            .or(frame.from.as_deref())
            .ok_or_else(|| missing(frame, "id"))?;
        if self.client_id.as_deref() == Some(id) {
            return Ok(RemoteEvent::Ignored);
        }
        Ok(RemoteEvent::Cursor(Cursor {
            id: id.to_owned(),
            x: frame.f64_field("x").ok_or_else(|| missing(frame, "x"))?,
            y: frame.f64_field("y").ok_or_else(|| missing(frame, "y"))?,
            color: frame.str_field("color").unwrap_or_default().to_owned(),
            label: frame.str_field("label").unwrap_or_default().to_owned(),
        }))
    }

    fn is_join_reply(&self, frame: &Frame) -> bool {
        frame.syscall == syscall::ROOM_JOIN && frame.parent_id.is_some() && frame.parent_id == self.join_request
    }
}

fn missing(frame: &Frame, field: &'static str) -> SyncError {
    SyncError::MissingField { syscall: frame.syscall.clone(), field }
}

fn parse_snapshot_item(value: &Value) -> Option<Element> {
    match Element::deserialize(value) {
        Ok(element) => Some(element),
        Err(e) => {
            log::warn!("skipping invalid snapshot element: {e}");
            None
        }
    }
}
