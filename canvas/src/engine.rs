//! Engine: input handling, gesture lifecycle, and action output.
//!
//! `EngineCore` is the whole client minus the browser. The host feeds it
//! pointer, wheel, keyboard, and socket events; every handler returns a list
//! of [`Action`]s for the host to carry out (redraw, send a frame, open the
//! text editor, decode an image).
//!
//! DESIGN
//! ======
//!
//! Local edits apply to the document before anything is published. Each
//! committed local mutation is recorded in [`History`] exactly once; drags
//! record a single `Update` on release covering the whole gesture. The
//! in-progress element lives in `live` and only joins the document on
//! commit, so remote snapshots and upserts never see half-drawn geometry.
//!
//! Pointer moves arrive in batches of coalesced samples. A batch is applied
//! in one pass and yields at most one `RenderNeeded`, one element upsert,
//! and one cursor frame.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use frames::Frame;
use uuid::Uuid;

use crate::camera::{Camera, Point};
use crate::consts::{
    IMAGE_MAX_WIDTH, IMAGE_ORIGIN, MIN_STICKY_WIDTH, MIN_TEXT_WIDTH, NEW_TEXT_WIDTH, STICKY_FONT, STICKY_INSET_X, STICKY_INSET_Y,
    STICKY_LINE_HEIGHT, STICKY_PLACEHOLDER, STICKY_SIZE, TEXT_AUTO_PADDING,
};
use crate::doc::{DocStore, Element, ElementId, ElementPatch, ImageRef, Note, Shape, TextBox};
use crate::history::{History, HistoryEntry, Replay};
use crate::hit::{self, Hit, HitPart};
use crate::images::ImageCache;
use crate::input::{Button, DragSession, Key, Modifiers, Tool, UiState, WheelDelta};
use crate::render::{self, DecodeRequest, Scene};
use crate::surface::{Surface, SurfaceError};
use crate::sync::{ConnectionState, CursorMap, RemoteEvent, SyncEngine};
use crate::text::{self, TextMeasure};

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    /// Write this frame to the socket.
    Send(Frame),
    /// Open the text editor overlay for an element.
    EditTextRequested { id: ElementId, text: String },
    /// Start decoding an image; report back via the image callbacks.
    DecodeImage(DecodeRequest),
    /// CSS cursor for the canvas element.
    SetCursor(String),
    /// The engine switched tools on its own; update the toolbar.
    ToolChanged(Tool),
    /// Selecting an element adopted its style; update the toolbar.
    StyleSynced { color: String, size: f64 },
}

/// Core engine state. Everything that does not depend on the browser.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub history: History,
    pub sync: SyncEngine,
    pub ui: UiState,
    pub drag: DragSession,
    /// Element being drawn, outside the committed sequence.
    pub live: Option<Element>,
    pub cursors: CursorMap,
    pub space_held: bool,
    pub viewport_width: f64,
    pub viewport_height: f64,
    measure: Box<dyn TextMeasure>,
}

impl EngineCore {
    #[must_use]
    pub fn new(room_id: impl Into<String>, label: impl Into<String>, measure: Box<dyn TextMeasure>) -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            history: History::new(),
            sync: SyncEngine::new(room_id, label),
            ui: UiState::default(),
            drag: DragSession::Idle,
            live: None,
            cursors: CursorMap::new(),
            space_held: false,
            viewport_width: 0.0,
            viewport_height: 0.0,
            measure,
        }
    }

    // =========================================================================
    // CONNECTION
    // =========================================================================

    /// The socket opened: join the room.
    pub fn connect(&mut self) -> Vec<Action> {
        vec![Action::Send(self.sync.join())]
    }

    /// The socket closed. Local edits are kept; remote cursors are dropped.
    pub fn disconnected(&mut self) -> Vec<Action> {
        self.sync.disconnected();
        self.cursors.clear();
        vec![Action::RenderNeeded]
    }

    /// Apply an inbound frame.
    pub fn receive(&mut self, frame: &Frame) -> Vec<Action> {
        match self.sync.receive(frame) {
            Ok(event) => self.apply_remote(event),
            Err(e) => {
                log::warn!("inbound {} frame: {e}", frame.syscall);
                Vec::new()
            }
        }
    }

    fn apply_remote(&mut self, event: RemoteEvent) -> Vec<Action> {
        match event {
            RemoteEvent::Snapshot(elements) => {
                self.doc.load(elements);
                self.forget_missing();
            }
            RemoteEvent::Upsert(element) => self.doc.upsert(element),
            RemoteEvent::Delete(id) => {
                self.doc.remove(&id);
                self.forget_missing();
            }
            RemoteEvent::Clear => {
                self.doc.clear();
                self.live = None;
                self.drag = DragSession::Idle;
                self.ui.selected = None;
                self.ui.editing = None;
            }
            RemoteEvent::Cursor(cursor) => {
                self.cursors.insert(cursor.id.clone(), cursor);
            }
            RemoteEvent::Part { client_id } => {
                if self.cursors.remove(&client_id).is_none() {
                    return Vec::new();
                }
            }
            RemoteEvent::Ignored => return Vec::new(),
        }
        vec![Action::RenderNeeded]
    }

    /// Drop selection, edit, and drag state that points at vanished elements.
    fn forget_missing(&mut self) {
        if self.ui.selected.as_deref().is_some_and(|id| self.doc.get(id).is_none()) {
            self.ui.selected = None;
        }
        if self.ui.editing.as_deref().is_some_and(|id| self.doc.get(id).is_none()) {
            self.ui.editing = None;
        }
        if let DragSession::Moving { id, .. } | DragSession::Resizing { id, .. } = &self.drag {
            if self.doc.get(id).is_none() {
                self.drag = DragSession::Idle;
            }
        }
    }

    // =========================================================================
    // TOOLBAR
    // =========================================================================

    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
    }

    /// Color and size for new elements.
    pub fn set_style(&mut self, color: impl Into<String>, size: f64) {
        self.ui.color = color.into();
        self.ui.size = size;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    // =========================================================================
    // POINTER
    // =========================================================================

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if !self.drag.is_idle() {
            return Vec::new();
        }
        if button == Button::Middle || (button == Button::Primary && self.space_held) {
            self.drag = DragSession::Panning {
                start_screen: screen,
                initial_pan: Point::new(self.camera.pan_x, self.camera.pan_y),
            };
            return vec![Action::SetCursor("grabbing".into())];
        }
        if button != Button::Primary {
            return Vec::new();
        }

        let world = self.camera.screen_to_world(screen);
        let tool = self.ui.tool;
        match tool {
            Tool::Select => self.select_at(world),
            Tool::Text | Tool::Sticky => {
                if let Some(id) = self.doc.hit_test(world).map(|e| e.id.clone()) {
                    self.ui.tool = Tool::Select;
                    let mut actions = vec![Action::ToolChanged(Tool::Select)];
                    actions.extend(self.begin_move(&id, world));
                    return actions;
                }
                if tool == Tool::Text { self.create_text(world) } else { self.create_sticky(world) }
            }
            _ => self.begin_drawing(tool, world),
        }
    }

    /// Apply a batch of coalesced pointer samples.
    pub fn on_pointer_move(&mut self, screens: &[Point], _modifiers: Modifiers) -> Vec<Action> {
        let Some(&last) = screens.last() else {
            return Vec::new();
        };
        let last_world = self.camera.screen_to_world(last);
        let mut render = false;
        let mut changed = None;

        match self.drag.clone() {
            DragSession::Idle => {}
            DragSession::Panning { start_screen, initial_pan } => {
                self.camera.pan_x = initial_pan.x + (last.x - start_screen.x) / self.camera.scale;
                self.camera.pan_y = initial_pan.y + (last.y - start_screen.y) / self.camera.scale;
                render = true;
            }
            DragSession::Drawing => {
                if let Some(live) = &mut self.live {
                    for &screen in screens {
                        extend_shape(&mut live.shape, self.camera.screen_to_world(screen));
                    }
                    render = true;
                }
            }
            DragSession::Moving { id, grab, .. } => {
                let patch = ElementPatch::position(last_world.x - grab.x, last_world.y - grab.y);
                if self.doc.update(&id, &patch) {
                    changed = Some(id);
                }
            }
            DragSession::Resizing { id, .. } => {
                if self.resize(&id, last_world) {
                    changed = Some(id);
                }
            }
        }

        let mut actions = Vec::new();
        if let Some(id) = changed {
            render = true;
            actions.extend(self.publish(&id));
        }
        if render {
            actions.push(Action::RenderNeeded);
        }
        if let Some(frame) = self.sync.publish_cursor(last_world, &self.ui.color) {
            actions.push(Action::Send(frame));
        }
        actions
    }

    pub fn on_pointer_up(&mut self, _screen: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        self.finish_gesture()
    }

    /// Leaving the canvas (or losing pointer capture) finishes the gesture.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.finish_gesture()
    }

    pub fn on_double_click(&mut self, screen: Point) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen);
        let Some(element) = self.doc.hit_test(world) else {
            return Vec::new();
        };
        let text = match &element.shape {
            Shape::Text(t) => t.text.clone(),
            Shape::Sticky(n) if n.text == STICKY_PLACEHOLDER => String::new(),
            Shape::Sticky(n) => n.text.clone(),
            _ => return Vec::new(),
        };
        let id = element.id.clone();
        self.ui.editing = Some(id.clone());
        self.ui.selected = Some(id.clone());
        vec![Action::EditTextRequested { id, text }, Action::RenderNeeded]
    }

    fn select_at(&mut self, world: Point) -> Vec<Action> {
        match hit::hit_test(world, &self.doc, self.ui.selected.as_deref()) {
            Some(Hit { id, part: HitPart::ResizeHandle }) => {
                let Some(element) = self.doc.get(&id) else {
                    return Vec::new();
                };
                let before = element.snapshot(&resize_fields(element));
                self.drag = DragSession::Resizing { id, before };
                vec![Action::SetCursor("nwse-resize".into())]
            }
            Some(Hit { id, part: HitPart::Body }) => self.begin_move(&id, world),
            None => {
                if self.ui.selected.take().is_none() {
                    return Vec::new();
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    fn begin_move(&mut self, id: &str, world: Point) -> Vec<Action> {
        let Some(element) = self.doc.get(id) else {
            return Vec::new();
        };
        let Some(b) = element.bounds() else {
            return Vec::new();
        };
        let style = Action::StyleSynced { color: element.color.clone(), size: element.size };
        self.ui.color = element.color.clone();
        self.ui.size = element.size;
        self.ui.selected = Some(id.to_owned());
        self.drag = DragSession::Moving {
            id: id.to_owned(),
            grab: Point::new(world.x - b.x, world.y - b.y),
            before: ElementPatch::position(b.x, b.y),
        };
        vec![style, Action::SetCursor("move".into()), Action::RenderNeeded]
    }

    fn begin_drawing(&mut self, tool: Tool, world: Point) -> Vec<Action> {
        let Some(shape) = tool.start_shape(world) else {
            return Vec::new();
        };
        // Freehand width is fixed on screen, not in world space.
        let size = if tool.is_freehand() { self.ui.size / self.camera.scale } else { self.ui.size };
        self.live = Some(Element::new(new_id(), shape, self.ui.color.clone(), size));
        self.drag = DragSession::Drawing;
        vec![Action::RenderNeeded]
    }

    /// Drag the resize handle to `world`. Text re-wraps and pins its width;
    /// sticky notes never shrink below their text or the minimum note size.
    fn resize(&mut self, id: &str, world: Point) -> bool {
        let Some(element) = self.doc.get(id) else {
            return false;
        };
        let patch = match &element.shape {
            Shape::Text(t) => {
                let width = (world.x - t.x).max(MIN_TEXT_WIDTH);
                let font = text::text_font(element.size);
                let layout = text::layout(&*self.measure, &font, &t.text, width, text::line_height(element.size));
                ElementPatch {
                    width: Some(width),
                    height: Some(layout.height.max(text::font_px(element.size))),
                    is_fixed_width: Some(true),
                    ..ElementPatch::default()
                }
            }
            Shape::Sticky(n) => {
                let width = (world.x - n.x).max(MIN_STICKY_WIDTH);
                let layout = text::layout(&*self.measure, STICKY_FONT, &n.text, width - 2.0 * STICKY_INSET_X, STICKY_LINE_HEIGHT);
                let height = (world.y - n.y).max(layout.height + STICKY_INSET_Y).max(STICKY_SIZE);
                ElementPatch::size(width, height)
            }
            _ => {
                let Some(b) = element.bounds() else {
                    return false;
                };
                ElementPatch::size(world.x - b.x, world.y - b.y)
            }
        };
        self.doc.update(id, &patch)
    }

    fn finish_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.drag) {
            DragSession::Idle => Vec::new(),
            DragSession::Panning { .. } => vec![Action::SetCursor(self.idle_cursor())],
            DragSession::Drawing => self.commit_live(),
            DragSession::Moving { id, before, .. } | DragSession::Resizing { id, before } => {
                self.commit_drag(&id, before);
                vec![Action::SetCursor(self.idle_cursor()), Action::RenderNeeded]
            }
        }
    }

    fn commit_live(&mut self) -> Vec<Action> {
        let Some(element) = self.live.take() else {
            return Vec::new();
        };
        if is_degenerate(&element.shape) {
            return vec![Action::RenderNeeded];
        }
        let id = element.id.clone();
        self.add_local(element);
        let mut actions = self.publish(&id);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Record one `Update` for a finished move or resize.
    fn commit_drag(&mut self, id: &str, before: ElementPatch) {
        let Some(element) = self.doc.get(id) else {
            return;
        };
        let after = element.snapshot(&before);
        if after != before {
            self.history.commit(HistoryEntry::Update { id: id.to_owned(), old: before, new: after });
        }
    }

    fn cancel_gesture(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.drag) {
            DragSession::Idle => Vec::new(),
            DragSession::Panning { initial_pan, .. } => {
                self.camera.pan_x = initial_pan.x;
                self.camera.pan_y = initial_pan.y;
                vec![Action::SetCursor(self.idle_cursor()), Action::RenderNeeded]
            }
            DragSession::Drawing => {
                self.live = None;
                vec![Action::RenderNeeded]
            }
            DragSession::Moving { id, before, .. } | DragSession::Resizing { id, before } => {
                self.doc.update(&id, &before);
                let mut actions = self.publish(&id);
                actions.push(Action::SetCursor(self.idle_cursor()));
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    fn idle_cursor(&self) -> String {
        if self.space_held { "grab".into() } else { "default".into() }
    }

    // =========================================================================
    // WHEEL / KEYBOARD
    // =========================================================================

    /// Ctrl/Cmd + wheel zooms around the pointer; plain wheel pans.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            if !self.camera.zoom_step(delta.dy, screen) {
                return Vec::new();
            }
        } else {
            self.camera.pan_by_screen(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is(" ") {
            self.space_held = true;
            return if self.drag.is_idle() { vec![Action::SetCursor("grab".into())] } else { Vec::new() };
        }
        if key.is("Escape") {
            return self.cancel_gesture();
        }
        if modifiers.command() {
            if (key.is("z") && modifiers.shift) || key.is("y") {
                return self.redo();
            }
            if key.is("z") {
                return self.undo();
            }
        }
        Vec::new()
    }

    pub fn on_key_up(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        if !key.is(" ") {
            return Vec::new();
        }
        self.space_held = false;
        if self.drag.is_idle() { vec![Action::SetCursor("default".into())] } else { Vec::new() }
    }

    // =========================================================================
    // TEXT
    // =========================================================================

    fn create_text(&mut self, world: Point) -> Vec<Action> {
        let body = TextBox {
            x: world.x,
            y: world.y,
            text: String::new(),
            width: NEW_TEXT_WIDTH,
            height: text::font_px(self.ui.size),
            is_fixed_width: false,
        };
        let element = Element::new(new_id(), Shape::Text(body), self.ui.color.clone(), self.ui.size);
        let id = element.id.clone();
        self.add_local(element);
        self.ui.editing = Some(id.clone());
        vec![Action::EditTextRequested { id, text: String::new() }, Action::RenderNeeded]
    }

    fn create_sticky(&mut self, world: Point) -> Vec<Action> {
        let half = STICKY_SIZE / 2.0;
        let note = Note {
            x: world.x - half,
            y: world.y - half,
            width: STICKY_SIZE,
            height: STICKY_SIZE,
            text: STICKY_PLACEHOLDER.to_owned(),
        };
        let element = Element::new(new_id(), Shape::Sticky(note), self.ui.color.clone(), self.ui.size);
        let id = element.id.clone();
        self.add_local(element);
        self.ui.tool = Tool::Select;
        let mut actions = self.publish(&id);
        actions.extend([Action::ToolChanged(Tool::Select), Action::RenderNeeded]);
        actions
    }

    /// Store edited text, auto-sizing the element, and publish it.
    pub fn commit_text(&mut self, id: &str, body: &str) -> Vec<Action> {
        self.ui.editing = None;
        let Some(element) = self.doc.get(id) else {
            return vec![Action::RenderNeeded];
        };
        let Some(patch) = self.text_patch(element, body) else {
            return vec![Action::RenderNeeded];
        };
        let old = element.snapshot(&patch);
        self.doc.update(id, &patch);
        if old != patch {
            self.history.commit(HistoryEntry::Update { id: id.to_owned(), old, new: patch });
        }

        self.ui.selected = Some(id.to_owned());
        self.ui.tool = Tool::Select;
        let mut actions = self.publish(id);
        actions.extend([Action::ToolChanged(Tool::Select), Action::RenderNeeded]);
        actions
    }

    /// Close the editor without storing anything. A text element that was
    /// created for this edit and never published is dropped again.
    pub fn cancel_text_edit(&mut self) -> Vec<Action> {
        let Some(id) = self.ui.editing.take() else {
            return Vec::new();
        };
        let unpublished = self.doc.get(&id).is_some_and(|e| matches!(&e.shape, Shape::Text(t) if t.text.is_empty()));
        if unpublished && self.history.discard_add(&id) {
            self.doc.remove(&id);
            self.forget_missing();
        }
        vec![Action::RenderNeeded]
    }

    fn text_patch(&self, element: &Element, body: &str) -> Option<ElementPatch> {
        let patch = match &element.shape {
            Shape::Text(t) => {
                let font = text::text_font(element.size);
                let width = if t.is_fixed_width {
                    t.width
                } else {
                    let current = if t.width > 0.0 { t.width } else { NEW_TEXT_WIDTH };
                    current.max(text::widest_line(&*self.measure, &font, body) + TEXT_AUTO_PADDING)
                }
                .max(MIN_TEXT_WIDTH);
                let layout = text::layout(&*self.measure, &font, body, width, text::line_height(element.size));
                ElementPatch {
                    text: Some(body.to_owned()),
                    width: Some(width),
                    height: Some(layout.height.max(text::font_px(element.size))),
                    ..ElementPatch::default()
                }
            }
            Shape::Sticky(n) => {
                let wrap = n.width - 2.0 * STICKY_INSET_X;
                let layout = text::layout(&*self.measure, STICKY_FONT, body, wrap, STICKY_LINE_HEIGHT);
                ElementPatch {
                    text: Some(body.to_owned()),
                    height: Some((layout.height + STICKY_INSET_Y).max(STICKY_SIZE)),
                    ..ElementPatch::default()
                }
            }
            _ => return None,
        };
        Some(patch)
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Place an already-hosted image, capped in width, and publish it.
    pub fn insert_image(&mut self, url: impl Into<String>, natural_width: f64, natural_height: f64) -> Vec<Action> {
        if natural_width <= 0.0 || natural_height <= 0.0 {
            return Vec::new();
        }
        let width = natural_width.min(IMAGE_MAX_WIDTH);
        let image = ImageRef {
            x: IMAGE_ORIGIN,
            y: IMAGE_ORIGIN,
            width,
            height: natural_height * width / natural_width,
            url: url.into(),
        };
        let element = Element::new(new_id(), Shape::Image(image), self.ui.color.clone(), self.ui.size);
        let id = element.id.clone();
        self.add_local(element);
        self.ui.tool = Tool::Select;
        let mut actions = self.publish(&id);
        actions.extend([Action::ToolChanged(Tool::Select), Action::RenderNeeded]);
        actions
    }

    /// Empty the room for everyone. History is discarded.
    pub fn clear_canvas(&mut self) -> Vec<Action> {
        self.doc.clear();
        self.history.clear();
        self.live = None;
        self.drag = DragSession::Idle;
        self.ui.selected = None;
        self.ui.editing = None;
        let mut actions = Vec::new();
        if let Some(frame) = self.sync.publish_clear() {
            actions.push(Action::Send(frame));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn undo(&mut self) -> Vec<Action> {
        let replay = self.history.undo(&mut self.doc);
        self.after_replay(replay)
    }

    pub fn redo(&mut self) -> Vec<Action> {
        let replay = self.history.redo(&mut self.doc);
        self.after_replay(replay)
    }

    fn after_replay(&mut self, replay: Option<Replay>) -> Vec<Action> {
        match replay {
            None => Vec::new(),
            Some(Replay::Removed(_)) => {
                self.forget_missing();
                vec![Action::RenderNeeded]
            }
            Some(Replay::Restored(element)) => {
                let mut actions = Vec::new();
                if let Some(frame) = self.sync.publish_upsert(&element) {
                    actions.push(Action::Send(frame));
                }
                actions.push(Action::RenderNeeded);
                actions
            }
            Some(Replay::Missing(id)) => {
                log::warn!("history target {id} no longer exists");
                Vec::new()
            }
        }
    }

    fn add_local(&mut self, element: Element) {
        if let Err(e) = self.doc.add(element.clone()) {
            log::warn!("{e}; replacing");
            self.doc.upsert(element.clone());
        }
        self.history.commit(HistoryEntry::Add { element });
    }

    fn publish(&self, id: &str) -> Vec<Action> {
        self.doc
            .get(id)
            .and_then(|element| self.sync.publish_upsert(element))
            .map(Action::Send)
            .into_iter()
            .collect()
    }

    // =========================================================================
    // RENDER / QUERIES
    // =========================================================================

    /// Draw the current scene.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn render<S: Surface>(&self, surface: &mut S, images: &mut ImageCache<S::Image>) -> Result<Vec<Action>, SurfaceError> {
        let scene = Scene {
            doc: &self.doc,
            camera: &self.camera,
            ui: &self.ui,
            live: self.live.as_ref(),
            cursors: &self.cursors,
            viewport_w: self.viewport_width,
            viewport_h: self.viewport_height,
        };
        let decode = render::draw(surface, &scene, images)?;
        Ok(decode.into_iter().map(Action::DecodeImage).collect())
    }

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.ui.selected.as_deref()
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.sync.state()
    }
}

fn new_id() -> ElementId {
    Uuid::new_v4().to_string()
}

/// Patch naming the fields a resize changes, for the undo snapshot.
fn resize_fields(element: &Element) -> ElementPatch {
    let mut fields = ElementPatch::size(0.0, 0.0);
    if matches!(element.shape, Shape::Text(_)) {
        fields.is_fixed_width = Some(false);
    }
    fields
}

/// Grow the live element toward `world`.
fn extend_shape(shape: &mut Shape, world: Point) {
    match shape {
        Shape::Pen(s) | Shape::Eraser(s) | Shape::Highlighter(s) => s.points.push(world),
        Shape::Rect(b)
        | Shape::Circle(b)
        | Shape::Triangle(b)
        | Shape::Pentagon(b)
        | Shape::Hexagon(b)
        | Shape::Octagon(b)
        | Shape::Star(b) => {
            b.width = world.x - b.x;
            b.height = world.y - b.y;
        }
        Shape::Line(seg) => {
            seg.end_x = world.x;
            seg.end_y = world.y;
        }
        Shape::Text(_) | Shape::Sticky(_) | Shape::Image(_) => {}
    }
}

/// A shape released without being dragged out.
fn is_degenerate(shape: &Shape) -> bool {
    let zero = |v: f64| v.abs() < f64::EPSILON;
    match shape {
        Shape::Line(seg) => zero(seg.end_x - seg.x) && zero(seg.end_y - seg.y),
        Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) | Shape::Text(_) | Shape::Sticky(_) | Shape::Image(_) => {
            false
        }
        Shape::Rect(b)
        | Shape::Circle(b)
        | Shape::Triangle(b)
        | Shape::Pentagon(b)
        | Shape::Hexagon(b)
        | Shape::Octagon(b)
        | Shape::Star(b) => zero(b.width) && zero(b.height),
    }
}
