//! Hit-testing against elements and the selection resize handle.
//!
//! All tests run in world coordinates. Freehand strokes, lines, and circles
//! are never hittable; they can only be removed by undo or a room clear.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::consts::{HIT_MIN_SIZE, HIT_SLOP, RESIZE_GRAB, STICKY_SIZE};
use crate::doc::{Bounds, DocStore, Element, ElementId, Shape};

/// Fallback extents for a text element that has never been measured.
const UNMEASURED_TEXT_W: f64 = 50.0;
const UNMEASURED_TEXT_H: f64 = 20.0;

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: ElementId,
    pub part: HitPart,
}

/// Test what is under `world`, checking the selected element's resize handle first.
#[must_use]
pub fn hit_test(world: Point, doc: &DocStore, selected: Option<&str>) -> Option<Hit> {
    if let Some(element) = selected.and_then(|id| doc.get(id)) {
        if on_resize_handle(element, world) {
            return Some(Hit { id: element.id.clone(), part: HitPart::ResizeHandle });
        }
    }
    doc.hit_test(world).map(|e| Hit { id: e.id.clone(), part: HitPart::Body })
}

/// Whether `world` falls inside the element's grab area.
#[must_use]
pub fn contains(element: &Element, world: Point) -> bool {
    match &element.shape {
        Shape::Rect(b)
        | Shape::Triangle(b)
        | Shape::Pentagon(b)
        | Shape::Hexagon(b)
        | Shape::Octagon(b)
        | Shape::Star(b) => padded_contains(b.normalized(), world),
        Shape::Text(t) => padded_contains(Bounds::new(t.x, t.y, t.width, t.height), world),
        Shape::Image(i) => padded_contains(Bounds::new(i.x, i.y, i.width, i.height), world),
        Shape::Sticky(n) => {
            let w = or_default(n.width, STICKY_SIZE);
            let h = or_default(n.height, STICKY_SIZE);
            world.x >= n.x && world.x <= n.x + w && world.y >= n.y && world.y <= n.y + h
        }
        Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) | Shape::Circle(_) | Shape::Line(_) => false,
    }
}

/// Whether `world` is on the bottom-right resize handle of a selectable element.
#[must_use]
pub fn on_resize_handle(element: &Element, world: Point) -> bool {
    if !element.is_selectable() {
        return false;
    }
    let Some(b) = element.bounds() else {
        return false;
    };
    let (w, h) = if matches!(element.shape, Shape::Text(_)) {
        (or_default(b.width, UNMEASURED_TEXT_W), or_default(b.height, UNMEASURED_TEXT_H))
    } else {
        (b.width, b.height)
    };
    let cx = b.x + w;
    let cy = b.y + h;
    (world.x - cx).abs() <= RESIZE_GRAB && (world.y - cy).abs() <= RESIZE_GRAB
}

fn padded_contains(b: Bounds, world: Point) -> bool {
    let w = b.width.max(HIT_MIN_SIZE);
    let h = b.height.max(HIT_MIN_SIZE);
    world.x >= b.x - HIT_SLOP
        && world.x <= b.x + w + HIT_SLOP
        && world.y >= b.y - HIT_SLOP
        && world.y <= b.y + h + HIT_SLOP
}

fn or_default(v: f64, fallback: f64) -> f64 {
    if v.abs() < f64::EPSILON { fallback } else { v }
}
