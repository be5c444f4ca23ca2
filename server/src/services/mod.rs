//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room membership, element writes, and persistence so
//! route handlers can stay focused on protocol translation.

pub mod element;
pub mod persistence;
pub mod room;
