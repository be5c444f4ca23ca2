//! Rendering: draws the full canvas scene onto a [`Surface`].
//!
//! This module receives read-only views of document, camera, and UI state and
//! produces draw calls. It mutates nothing except the image cache, where an
//! unseen image id is marked pending and returned as a [`DecodeRequest`].
//!
//! LAYERS
//! ======
//!
//! 1. Clear.
//! 2. Grid dots at the camera's level-of-detail step (screen space).
//! 3. World transform: `scale(s)` then `translate(pan)`.
//! 4. Committed elements in z-order, skipping the one under text edit.
//! 5. Selection border and resize handle.
//! 6. The live element being drawn.
//! 7. Remote cursors (screen space).

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::camera::{Camera, Point};
use crate::consts::{
    CURSOR_LABEL_FONT, CURSOR_LABEL_OFFSET_PX, CURSOR_RADIUS_PX, DEFAULT_TEXT_WRAP, ERASER_STYLE, FRAC_PI_5,
    GRID_DOT_COLOR, GRID_DOT_PX, HANDLE_PX, HIGHLIGHTER_ALPHA, HIGHLIGHTER_WIDTH_FACTOR, SELECTION_BORDER_PX,
    SELECTION_COLOR, STAR_INNER_RATIO, STAR_SPIKES, STICKY_FILL, STICKY_FONT, STICKY_INSET_X, STICKY_INSET_Y,
    STICKY_LINE_HEIGHT, STICKY_SHADOW, STICKY_SHADOW_BLUR, STICKY_TEXT_COLOR,
};
use crate::doc::{Bounds, DocStore, Element, ElementId, ImageRef, Note, Segment, Shape, TextBox};
use crate::images::{ImageCache, ImageSlot};
use crate::input::UiState;
use crate::surface::{Blend, Surface, SurfaceError, SurfaceResult};
use crate::sync::CursorMap;
use crate::text;

/// Read-only view of everything a frame draws.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub doc: &'a DocStore,
    pub camera: &'a Camera,
    pub ui: &'a UiState,
    /// In-progress element, not yet committed.
    pub live: Option<&'a Element>,
    pub cursors: &'a CursorMap,
    /// Viewport size in CSS pixels.
    pub viewport_w: f64,
    pub viewport_h: f64,
}

/// An image element whose bitmap the host should start decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub id: ElementId,
    pub url: String,
}

/// How a freehand stroke ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeTip {
    /// Committed stroke: the last curve lands on the final point.
    Settled,
    /// Stroke still being drawn: straight segment to the latest sample.
    Live,
}

/// Draw the full scene.
///
/// # Errors
///
/// Returns the first [`SurfaceError`] raised by the surface. The surface's
/// save/restore stack is balanced even on error.
pub fn draw<S: Surface>(
    surface: &mut S,
    scene: &Scene<'_>,
    images: &mut ImageCache<S::Image>,
) -> Result<Vec<DecodeRequest>, SurfaceError> {
    let mut decode = Vec::new();

    surface.clear()?;
    draw_grid(surface, scene.camera, scene.viewport_w, scene.viewport_h);

    surface.save();
    let world = draw_world(surface, scene, images, &mut decode);
    surface.restore();
    world?;

    draw_cursors(surface, scene)?;
    Ok(decode)
}

fn draw_world<S: Surface>(
    surface: &mut S,
    scene: &Scene<'_>,
    images: &mut ImageCache<S::Image>,
    decode: &mut Vec<DecodeRequest>,
) -> SurfaceResult {
    let camera = scene.camera;
    surface.scale(camera.scale)?;
    surface.translate(camera.pan_x, camera.pan_y)?;

    let editing = scene.ui.editing.as_deref();
    for element in scene.doc.iter() {
        if editing == Some(element.id.as_str()) {
            continue;
        }
        draw_element(surface, element, StrokeTip::Settled, images, decode)?;
    }

    if let Some(element) = scene.ui.selected.as_deref().and_then(|id| scene.doc.get(id)) {
        draw_selection(surface, element, camera.scale);
    }

    if let Some(live) = scene.live {
        draw_element(surface, live, StrokeTip::Live, images, decode)?;
    }
    Ok(())
}

// =============================================================
// Grid
// =============================================================

fn draw_grid<S: Surface>(surface: &mut S, camera: &Camera, viewport_w: f64, viewport_h: f64) {
    let step = camera.grid_step();
    let visible = camera.visible_world_rect(viewport_w, viewport_h);
    // First grid line at or after the visible edge; nothing off-screen is drawn.
    let start_x = (visible.min.x / step).ceil() * step;
    let start_y = (visible.min.y / step).ceil() * step;

    surface.set_fill_style(GRID_DOT_COLOR);
    let mut x = start_x;
    while x < visible.max.x {
        let mut y = start_y;
        while y < visible.max.y {
            let dot = camera.world_to_screen(Point::new(x, y));
            surface.fill_rect(dot.x, dot.y, GRID_DOT_PX, GRID_DOT_PX);
            y += step;
        }
        x += step;
    }
}

// =============================================================
// Elements
// =============================================================

/// Draw one element in world coordinates. The single kind → renderer dispatch.
///
/// # Errors
///
/// Returns `Err` if a fallible surface call fails.
pub fn draw_element<S: Surface>(
    surface: &mut S,
    element: &Element,
    tip: StrokeTip,
    images: &mut ImageCache<S::Image>,
    decode: &mut Vec<DecodeRequest>,
) -> SurfaceResult {
    surface.save();
    surface.set_round_caps();
    let result = draw_shape(surface, element, tip, images, decode);
    surface.restore();
    result
}

fn draw_shape<S: Surface>(
    surface: &mut S,
    element: &Element,
    tip: StrokeTip,
    images: &mut ImageCache<S::Image>,
    decode: &mut Vec<DecodeRequest>,
) -> SurfaceResult {
    let color = element.color.as_str();
    let size = element.size;
    match &element.shape {
        Shape::Pen(s) => {
            outline(surface, color, size);
            draw_stroke(surface, &s.points, tip);
        }
        Shape::Highlighter(s) => {
            outline(surface, color, size * HIGHLIGHTER_WIDTH_FACTOR);
            surface.set_global_alpha(HIGHLIGHTER_ALPHA);
            draw_stroke(surface, &s.points, tip);
        }
        Shape::Eraser(s) => {
            surface.set_blend(Blend::DestinationOut)?;
            outline(surface, ERASER_STYLE, size);
            draw_stroke(surface, &s.points, tip);
        }
        Shape::Rect(b) => {
            outline(surface, color, size);
            let b = b.normalized();
            surface.begin_path();
            surface.rect(b.x, b.y, b.width, b.height);
            surface.stroke();
        }
        Shape::Circle(b) => {
            outline(surface, color, size);
            surface.begin_path();
            surface.circle(b.x, b.y, b.width.hypot(b.height))?;
            surface.stroke();
        }
        Shape::Triangle(b) | Shape::Pentagon(b) | Shape::Hexagon(b) | Shape::Octagon(b) => {
            let sides = element.shape.polygon_sides().unwrap_or(3);
            outline(surface, color, size);
            draw_polygon(surface, b, sides);
        }
        Shape::Star(b) => {
            outline(surface, color, size);
            draw_star(surface, b);
        }
        Shape::Line(seg) => {
            outline(surface, color, size);
            draw_line(surface, seg);
        }
        Shape::Text(t) => draw_text(surface, t, color, size)?,
        Shape::Sticky(n) => draw_sticky(surface, n)?,
        Shape::Image(img) => draw_image(surface, &element.id, img, images, decode)?,
    }
    Ok(())
}

fn outline<S: Surface>(surface: &mut S, css: &str, width: f64) {
    surface.set_stroke_style(css);
    surface.set_line_width(width);
}

/// Smoothed freehand path: quadratic curves through the midpoints of
/// consecutive samples.
fn draw_stroke<S: Surface>(surface: &mut S, points: &[Point], tip: StrokeTip) {
    let Some(first) = points.first() else {
        return;
    };
    surface.begin_path();
    surface.move_to(first.x, first.y);
    if points.len() < 3 {
        for p in points {
            surface.line_to(p.x, p.y);
        }
    } else {
        let n = points.len();
        for i in 1..n - 2 {
            let mid = points[i].mid(points[i + 1]);
            surface.quadratic_curve_to(points[i].x, points[i].y, mid.x, mid.y);
        }
        let (ctrl, last) = (points[n - 2], points[n - 1]);
        match tip {
            StrokeTip::Settled => surface.quadratic_curve_to(ctrl.x, ctrl.y, last.x, last.y),
            StrokeTip::Live => surface.line_to(last.x, last.y),
        }
    }
    surface.stroke();
}

fn draw_polygon<S: Surface>(surface: &mut S, bounds: &Bounds, sides: usize) {
    let b = bounds.normalized();
    let c = b.center();
    let r = b.width.min(b.height) / 2.0;
    #[allow(clippy::cast_precision_loss)]
    let step = TAU / sides as f64;

    surface.begin_path();
    for i in 0..sides {
        #[allow(clippy::cast_precision_loss)]
        let angle = -FRAC_PI_2 + step * i as f64;
        let (x, y) = (c.x + r * angle.cos(), c.y + r * angle.sin());
        if i == 0 {
            surface.move_to(x, y);
        } else {
            surface.line_to(x, y);
        }
    }
    surface.close_path();
    surface.stroke();
}

/// Five-pointed star: alternating outer and inner vertices, first spike up.
fn draw_star<S: Surface>(surface: &mut S, bounds: &Bounds) {
    let b = bounds.normalized();
    let c = b.center();
    let outer = b.width.min(b.height) / 2.0;
    let inner = outer * STAR_INNER_RATIO;

    surface.begin_path();
    surface.move_to(c.x, c.y - outer);
    for i in 0..STAR_SPIKES * 2 {
        let r = if i % 2 == 0 { outer } else { inner };
        #[allow(clippy::cast_precision_loss)]
        let angle = -FRAC_PI_2 + FRAC_PI_5 * i as f64;
        surface.line_to(c.x + r * angle.cos(), c.y + r * angle.sin());
    }
    surface.close_path();
    surface.stroke();
}

fn draw_line<S: Surface>(surface: &mut S, seg: &Segment) {
    surface.begin_path();
    surface.move_to(seg.x, seg.y);
    surface.line_to(seg.end_x, seg.end_y);
    surface.stroke();
}

fn draw_text<S: Surface>(surface: &mut S, t: &TextBox, color: &str, size: f64) -> SurfaceResult {
    let font = text::text_font(size);
    let wrap_width = if t.width > 0.0 { t.width } else { DEFAULT_TEXT_WRAP };
    surface.set_fill_style(color);
    surface.set_font(&font);
    surface.set_text_baseline("top");
    let layout = text::layout(&*surface, &font, &t.text, wrap_width, text::line_height(size));
    fill_lines(surface, &layout.lines, t.x, t.y, text::line_height(size))
}

fn draw_sticky<S: Surface>(surface: &mut S, n: &Note) -> SurfaceResult {
    surface.set_fill_style(STICKY_FILL);
    surface.set_shadow(STICKY_SHADOW, STICKY_SHADOW_BLUR);
    surface.fill_rect(n.x, n.y, n.width, n.height);
    surface.set_shadow(STICKY_SHADOW, 0.0);

    surface.set_fill_style(STICKY_TEXT_COLOR);
    surface.set_font(STICKY_FONT);
    let layout = text::layout(&*surface, STICKY_FONT, &n.text, n.width - 2.0 * STICKY_INSET_X, STICKY_LINE_HEIGHT);
    fill_lines(surface, &layout.lines, n.x + STICKY_INSET_X, n.y + STICKY_INSET_Y, STICKY_LINE_HEIGHT)
}

fn fill_lines<S: Surface>(surface: &mut S, lines: &[String], x: f64, y: f64, line_height: f64) -> SurfaceResult {
    let mut line_y = y;
    for line in lines {
        surface.fill_text(line, x, line_y)?;
        line_y += line_height;
    }
    Ok(())
}

fn draw_image<S: Surface>(
    surface: &mut S,
    id: &str,
    img: &ImageRef,
    images: &mut ImageCache<S::Image>,
    decode: &mut Vec<DecodeRequest>,
) -> SurfaceResult {
    match images.lookup(id) {
        ImageSlot::Ready(bitmap) => surface.draw_image(bitmap, img.x, img.y, img.width, img.height)?,
        ImageSlot::Unknown => {
            if images.mark_pending(id) {
                decode.push(DecodeRequest { id: id.to_owned(), url: img.url.clone() });
            }
        }
        ImageSlot::Pending | ImageSlot::Failed => {}
    }
    Ok(())
}

// =============================================================
// Overlays
// =============================================================

/// Border plus bottom-right handle, sized to stay constant on screen.
fn draw_selection<S: Surface>(surface: &mut S, element: &Element, scale: f64) {
    if !element.is_selectable() {
        return;
    }
    let Some(b) = element.bounds() else {
        return;
    };
    let handle = HANDLE_PX / scale;

    surface.save();
    surface.set_stroke_style(SELECTION_COLOR);
    surface.set_line_width(SELECTION_BORDER_PX / scale);
    surface.stroke_rect(b.x, b.y, b.width, b.height);
    surface.set_fill_style(SELECTION_COLOR);
    surface.fill_rect(b.x + b.width - handle / 2.0, b.y + b.height - handle / 2.0, handle, handle);
    surface.restore();
}

fn draw_cursors<S: Surface>(surface: &mut S, scene: &Scene<'_>) -> SurfaceResult {
    for cursor in scene.cursors.values() {
        let at = scene.camera.world_to_screen(Point::new(cursor.x, cursor.y));
        surface.save();
        let result = draw_cursor(surface, at, &cursor.color, &cursor.label);
        surface.restore();
        result?;
    }
    Ok(())
}

fn draw_cursor<S: Surface>(surface: &mut S, at: Point, color: &str, label: &str) -> SurfaceResult {
    surface.set_fill_style(color);
    surface.begin_path();
    surface.circle(at.x, at.y, CURSOR_RADIUS_PX)?;
    surface.fill();
    if !label.is_empty() {
        surface.set_font(CURSOR_LABEL_FONT);
        surface.fill_text(label, at.x + CURSOR_LABEL_OFFSET_PX, at.y + CURSOR_LABEL_OFFSET_PX)?;
    }
    Ok(())
}
