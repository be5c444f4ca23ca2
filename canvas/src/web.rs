//! Browser bindings: the `CanvasRenderingContext2d` surface and the
//! wasm-bindgen `Engine` handed to the host page.
//!
//! This module is the only place that touches `web_sys`. The host creates an
//! `Engine` over its `<canvas>`, forwards DOM events and socket bytes to it,
//! and carries out the returned actions. Actions cross the boundary as plain
//! JS objects tagged by `type`:
//!
//! | `type` | Fields |
//! |--------|--------|
//! | `render` | none |
//! | `send` | `bytes: Uint8Array` (encoded frame) |
//! | `edit_text` | `id`, `text` |
//! | `decode_image` | `id`, `url` |
//! | `set_cursor` | `cursor` |
//! | `tool_changed` | `tool` |
//! | `style_synced` | `color`, `size` |

use std::f64::consts::TAU;

use frames::{decode_frame, encode_frame};
use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, KeyboardEvent, MouseEvent, PointerEvent, WheelEvent};

use crate::camera::Point;
use crate::engine::{Action, EngineCore};
use crate::images::ImageCache;
use crate::input::{Button, Key, Modifiers, Tool, WheelDelta};
use crate::surface::{Blend, Surface, SurfaceError, SurfaceResult};
use crate::text::TextMeasure;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_log::init_with_level(log::Level::Info).map_err(|e| JsValue::from_str(&e.to_string()))
}

// =============================================================================
// SURFACE
// =============================================================================

fn call(result: Result<(), JsValue>) -> SurfaceResult {
    result.map_err(|e| SurfaceError::Call(format!("{e:?}")))
}

fn measure(ctx: &CanvasRenderingContext2d, font: &str, text: &str) -> f64 {
    ctx.save();
    ctx.set_font(font);
    let width = ctx.measure_text(text).map_or(0.0, |m| m.width());
    ctx.restore();
    width
}

/// Text measurement through a 2D context, for layout outside a frame.
pub struct CanvasMeasure(CanvasRenderingContext2d);

impl TextMeasure for CanvasMeasure {
    fn text_width(&self, font: &str, text: &str) -> f64 {
        measure(&self.0, font, text)
    }
}

/// [`Surface`] over a `<canvas>` 2D context. Drawing is in CSS pixels; the
/// device pixel ratio is folded into the base transform on every clear.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    dpr: f64,
}

impl CanvasSurface {
    /// # Errors
    ///
    /// Returns [`SurfaceError::Unavailable`] if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| SurfaceError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| SurfaceError::Unavailable("no 2d context".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError::Unavailable("context is not 2d".into()))?;
        Ok(Self { canvas, ctx, dpr: 1.0 })
    }

    /// Resize the backing store for a CSS-pixel viewport.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resize(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.dpr = if dpr > 0.0 { dpr } else { 1.0 };
        self.canvas.set_width((width_css * self.dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * self.dpr).round().max(0.0) as u32);
    }

    fn context(&self) -> CanvasRenderingContext2d {
        self.ctx.clone()
    }
}

impl TextMeasure for CanvasSurface {
    fn text_width(&self, font: &str, text: &str) -> f64 {
        measure(&self.ctx, font, text)
    }
}

impl Surface for CanvasSurface {
    type Image = HtmlImageElement;

    fn clear(&mut self) -> SurfaceResult {
        call(self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0))?;
        self.ctx
            .clear_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        call(self.ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0))
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn scale(&mut self, factor: f64) -> SurfaceResult {
        call(self.ctx.scale(factor, factor))
    }

    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult {
        call(self.ctx.translate(x, y))
    }

    fn set_fill_style(&mut self, css: &str) {
        self.ctx.set_fill_style_str(css);
    }

    fn set_stroke_style(&mut self, css: &str) {
        self.ctx.set_stroke_style_str(css);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
    }

    fn set_blend(&mut self, blend: Blend) -> SurfaceResult {
        call(self.ctx.set_global_composite_operation(blend.as_css()))
    }

    fn set_shadow(&mut self, css: &str, blur: f64) {
        self.ctx.set_shadow_color(css);
        self.ctx.set_shadow_blur(blur);
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_text_baseline(&mut self, baseline: &str) {
        self.ctx.set_text_baseline(baseline);
    }

    fn set_round_caps(&mut self) {
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ctx.quadratic_curve_to(cx, cy, x, y);
    }

    fn circle(&mut self, x: f64, y: f64, r: f64) -> SurfaceResult {
        call(self.ctx.arc(x, y, r.abs(), 0.0, TAU))
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.rect(x, y, w, h);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.fill_rect(x, y, w, h);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ctx.stroke_rect(x, y, w, h);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult {
        call(self.ctx.fill_text(text, x, y))
    }

    fn draw_image(&mut self, image: &HtmlImageElement, x: f64, y: f64, w: f64, h: f64) -> SurfaceResult {
        call(self.ctx.draw_image_with_html_image_element_and_dw_and_dh(image, x, y, w, h))
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// The engine as seen from JavaScript.
#[wasm_bindgen]
pub struct Engine {
    surface: CanvasSurface,
    core: EngineCore,
    images: ImageCache<HtmlImageElement>,
}

#[wasm_bindgen]
impl Engine {
    /// Bind an engine to `canvas` for the given room. `label` is shown next
    /// to this client's cursor on peers' screens.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, room_id: String, label: String) -> Result<Engine, JsValue> {
        let surface = CanvasSurface::new(canvas).map_err(to_js)?;
        let measure = CanvasMeasure(surface.context());
        Ok(Self { surface, core: EngineCore::new(room_id, label, Box::new(measure)), images: ImageCache::new() })
    }

    // --- Socket ---

    pub fn connect(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.connect())
    }

    pub fn disconnected(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.disconnected())
    }

    /// Feed one binary websocket message.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<Array, JsValue> {
        match decode_frame(bytes) {
            Ok(frame) => actions_to_js(self.core.receive(&frame)),
            Err(e) => {
                log::warn!("dropping undecodable frame: {e}");
                Ok(Array::new())
            }
        }
    }

    // --- Toolbar ---

    /// Switch tools by name. Returns `false` for an unknown name.
    pub fn set_tool(&mut self, name: &str) -> bool {
        let Some(tool) = Tool::from_name(name) else {
            return false;
        };
        self.core.set_tool(tool);
        true
    }

    pub fn set_style(&mut self, color: &str, size: f64) {
        self.core.set_style(color, size);
    }

    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.surface.resize(width_css, height_css, dpr);
        self.core.set_viewport(width_css, height_css);
    }

    // --- Input ---

    pub fn pointer_down(&mut self, event: &PointerEvent) -> Result<Array, JsValue> {
        let Some(button) = button_of(event) else {
            return Ok(Array::new());
        };
        actions_to_js(self.core.on_pointer_down(position(event), button, modifiers(event)))
    }

    /// Pointer move, including every coalesced sample the browser batched.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> Result<Array, JsValue> {
        let mut points: Vec<Point> = event
            .get_coalesced_events()
            .iter()
            .filter_map(|e| match e.dyn_into::<MouseEvent>() {
                Ok(e) => Some(position(&e)),
                Err(_) => None,
            })
            .collect();
        if points.is_empty() {
            points.push(position(event));
        }
        actions_to_js(self.core.on_pointer_move(&points, modifiers(event)))
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> Result<Array, JsValue> {
        let button = button_of(event).unwrap_or(Button::Primary);
        actions_to_js(self.core.on_pointer_up(position(event), button, modifiers(event)))
    }

    pub fn pointer_leave(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.on_pointer_leave())
    }

    pub fn double_click(&mut self, event: &MouseEvent) -> Result<Array, JsValue> {
        actions_to_js(self.core.on_double_click(position(event)))
    }

    pub fn wheel(&mut self, event: &WheelEvent) -> Result<Array, JsValue> {
        let delta = WheelDelta { dx: event.delta_x(), dy: event.delta_y() };
        actions_to_js(self.core.on_wheel(position(event), delta, modifiers(event)))
    }

    pub fn key_down(&mut self, event: &KeyboardEvent) -> Result<Array, JsValue> {
        actions_to_js(self.core.on_key_down(&Key(event.key()), key_modifiers(event)))
    }

    pub fn key_up(&mut self, event: &KeyboardEvent) -> Result<Array, JsValue> {
        actions_to_js(self.core.on_key_up(&Key(event.key()), key_modifiers(event)))
    }

    // --- Commands ---

    pub fn commit_text(&mut self, id: &str, text: &str) -> Result<Array, JsValue> {
        actions_to_js(self.core.commit_text(id, text))
    }

    pub fn cancel_text_edit(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.cancel_text_edit())
    }

    /// Place an image that is already hosted at `url`.
    pub fn insert_image(&mut self, url: String, natural_width: f64, natural_height: f64) -> Result<Array, JsValue> {
        actions_to_js(self.core.insert_image(url, natural_width, natural_height))
    }

    pub fn clear_canvas(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.clear_canvas())
    }

    pub fn undo(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.undo())
    }

    pub fn redo(&mut self) -> Result<Array, JsValue> {
        actions_to_js(self.core.redo())
    }

    // --- Images ---

    /// A requested image finished decoding. Returns whether a redraw is due.
    pub fn image_loaded(&mut self, id: &str, image: HtmlImageElement) -> bool {
        if !self.images.insert(id, image) {
            log::debug!("image {id} arrived after failing; ignored");
            return false;
        }
        self.core.element(id).is_some()
    }

    pub fn image_failed(&mut self, id: &str) {
        log::warn!("image {id} failed to decode");
        self.images.mark_failed(id);
    }

    // --- Output ---

    /// Draw a frame. Returns follow-up actions (image decodes).
    pub fn render(&mut self) -> Result<Array, JsValue> {
        let actions = self.core.render(&mut self.surface, &mut self.images).map_err(to_js)?;
        actions_to_js(actions)
    }

    pub fn selection(&self) -> Option<String> {
        self.core.selection().map(str::to_owned)
    }

    pub fn tool(&self) -> String {
        self.core.ui.tool.name().to_owned()
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

fn to_js(e: SurfaceError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn position(event: &MouseEvent) -> Point {
    Point::new(f64::from(event.offset_x()), f64::from(event.offset_y()))
}

fn button_of(event: &MouseEvent) -> Option<Button> {
    match event.button() {
        0 => Some(Button::Primary),
        1 => Some(Button::Middle),
        2 => Some(Button::Secondary),
        _ => None,
    }
}

fn modifiers(event: &MouseEvent) -> Modifiers {
    Modifiers { shift: event.shift_key(), ctrl: event.ctrl_key(), alt: event.alt_key(), meta: event.meta_key() }
}

fn key_modifiers(event: &KeyboardEvent) -> Modifiers {
    Modifiers { shift: event.shift_key(), ctrl: event.ctrl_key(), alt: event.alt_key(), meta: event.meta_key() }
}

fn actions_to_js(actions: Vec<Action>) -> Result<Array, JsValue> {
    let out = Array::new();
    for action in actions {
        out.push(&action_to_js(action)?);
    }
    Ok(out)
}

fn action_to_js(action: Action) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    let set = |key: &str, value: JsValue| Reflect::set(&obj, &JsValue::from_str(key), &value).map(drop);
    let kind = match action {
        Action::RenderNeeded => "render",
        Action::Send(frame) => {
            set("bytes", Uint8Array::from(encode_frame(&frame).as_slice()).into())?;
            "send"
        }
        Action::EditTextRequested { id, text } => {
            set("id", id.into())?;
            set("text", text.into())?;
            "edit_text"
        }
        Action::DecodeImage(request) => {
            set("id", request.id.into())?;
            set("url", request.url.into())?;
            "decode_image"
        }
        Action::SetCursor(cursor) => {
            set("cursor", cursor.into())?;
            "set_cursor"
        }
        Action::ToolChanged(tool) => {
            set("tool", tool.name().into())?;
            "tool_changed"
        }
        Action::StyleSynced { color, size } => {
            set("color", color.into())?;
            set("size", size.into())?;
            "style_synced"
        }
    };
    set("type", kind.into())?;
    Ok(obj.into())
}
