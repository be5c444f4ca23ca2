//! Canvas engine for the collaborative infinite whiteboard.
//!
//! This crate runs in the browser (compiled to WebAssembly) and owns the full
//! client-side lifecycle of a shared canvas: translating raw DOM input into
//! element mutations, keeping the pan/zoom viewport, recording undo history,
//! speaking the frame protocol to the relay server, and drawing the scene.
//! The host JavaScript layer only wires DOM events to the engine, forwards
//! [`engine::Action::Send`] frames to the socket, and decodes images on
//! request.
//!
//! Everything except `web` is plain Rust and is tested natively.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Testable [`engine::EngineCore`]; gesture handling and action output |
//! | [`doc`] | Element types and the ordered element store |
//! | [`camera`] | Pan/zoom viewport and coordinate conversions |
//! | [`history`] | Undo/redo command log |
//! | [`sync`] | Connection state machine and frame (de)serialization |
//! | [`input`] | Tools, input event types, and the drag session |
//! | [`hit`] | Hit-testing against elements and the resize handle |
//! | [`render`] | Scene drawing against a [`surface::Surface`] |
//! | [`surface`] | Backend-neutral 2D drawing trait |
//! | [`text`] | Word wrapping and text measurement |
//! | [`images`] | Per-id decoded image cache |
//! | [`consts`] | Shared numeric constants (zoom limits, minimum sizes, etc.) |
//! | `web` | `CanvasRenderingContext2d` surface and the wasm-bindgen `Engine` (wasm32 only) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod history;
pub mod hit;
pub mod images;
pub mod input;
pub mod render;
pub mod surface;
pub mod sync;
pub mod text;

#[cfg(target_arch = "wasm32")]
pub mod web;
