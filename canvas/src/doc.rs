//! Document model: elements, sparse patches, and the ordered in-memory store.
//!
//! An [`Element`] is the atomic drawable unit. Its geometry lives in a closed
//! [`Shape`] enum so every consumer (renderer, hit-testing, patching) matches
//! exhaustively on the kind. The wire form is the flat JSON object peers have
//! always exchanged: a `type` tag plus camelCase geometry keys.
//!
//! [`DocStore`] keeps elements in an ordered sequence where position is
//! z-order (later = drawn on top). All lookups are by id, never by index,
//! since indices shift under concurrent inserts.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::consts::{DEFAULT_COLOR, DEFAULT_SIZE};
use crate::hit;

/// Unique identifier for an element. Client-generated, UUID v4 for new elements.
pub type ElementId = String;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DocError {
    #[error("element already exists: {0}")]
    DuplicateId(ElementId),
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Freehand stroke: an ordered polyline, append-only while it is being drawn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stroke {
    pub points: Vec<Point>,
}

/// Anchor plus signed extents. Width and height may be negative when the
/// shape was dragged up or left from its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Equivalent bounds with a top-left anchor and non-negative extents.
    #[must_use]
    pub fn normalized(&self) -> Bounds {
        Bounds {
            x: self.x.min(self.x + self.width),
            y: self.y.min(self.y + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Straight segment from `(x, y)` to `(end_x, end_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "endX")]
    pub end_x: f64,
    #[serde(rename = "endY")]
    pub end_y: f64,
}

/// Free text. Width grows with content until the user resizes it, which
/// pins it (`is_fixed_width`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBox {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "isFixedWidth")]
    pub is_fixed_width: bool,
}

/// Sticky note with a fixed visual style.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
}

/// Image placed by URL. Decoded bitmaps live in [`crate::images::ImageCache`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageRef {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "dataURL")]
    pub url: String,
}

/// Kind-specific geometry, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Pen(Stroke),
    Eraser(Stroke),
    Highlighter(Stroke),
    Rect(Bounds),
    /// Circle centered on the anchor; radius is the bounds diagonal.
    Circle(Bounds),
    Triangle(Bounds),
    Pentagon(Bounds),
    Hexagon(Bounds),
    Octagon(Bounds),
    /// Five-point star inscribed in the bounds.
    Star(Bounds),
    Line(Segment),
    Text(TextBox),
    Sticky(Note),
    Image(ImageRef),
}

impl Shape {
    /// Wire tag for this kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Pen(_) => "pen",
            Self::Eraser(_) => "eraser",
            Self::Highlighter(_) => "highlighter",
            Self::Rect(_) => "rect",
            Self::Circle(_) => "circle",
            Self::Triangle(_) => "triangle",
            Self::Pentagon(_) => "pentagon",
            Self::Hexagon(_) => "hexagon",
            Self::Octagon(_) => "octagon",
            Self::Star(_) => "star",
            Self::Line(_) => "line",
            Self::Text(_) => "text",
            Self::Sticky(_) => "sticky",
            Self::Image(_) => "image",
        }
    }

    /// Vertex count for regular polygons.
    #[must_use]
    pub fn polygon_sides(&self) -> Option<usize> {
        match self {
            Self::Triangle(_) => Some(3),
            Self::Pentagon(_) => Some(5),
            Self::Hexagon(_) => Some(6),
            Self::Octagon(_) => Some(8),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_stroke(&self) -> bool {
        matches!(self, Self::Pen(_) | Self::Eraser(_) | Self::Highlighter(_))
    }
}

// =============================================================================
// ELEMENT
// =============================================================================

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

fn default_size() -> f64 {
    DEFAULT_SIZE
}

/// An element as stored in the document and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default = "default_color")]
    pub color: String,
    /// Stroke width, or font-size factor for text.
    #[serde(default = "default_size")]
    pub size: f64,
}

impl Element {
    #[must_use]
    pub fn new(id: impl Into<ElementId>, shape: Shape, color: impl Into<String>, size: f64) -> Self {
        Self { id: id.into(), shape, color: color.into(), size }
    }

    /// Box geometry for kinds that have one, as stored (possibly signed).
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match &self.shape {
            Shape::Rect(b)
            | Shape::Circle(b)
            | Shape::Triangle(b)
            | Shape::Pentagon(b)
            | Shape::Hexagon(b)
            | Shape::Octagon(b)
            | Shape::Star(b) => Some(*b),
            Shape::Text(t) => Some(Bounds::new(t.x, t.y, t.width, t.height)),
            Shape::Sticky(n) => Some(Bounds::new(n.x, n.y, n.width, n.height)),
            Shape::Image(i) => Some(Bounds::new(i.x, i.y, i.width, i.height)),
            Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) | Shape::Line(_) => None,
        }
    }

    /// Whether the selection overlay (border + resize handle) applies.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !matches!(
            self.shape,
            Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) | Shape::Line(_) | Shape::Circle(_)
        )
    }

    /// Current text for text-bearing kinds.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text(t) => Some(&t.text),
            Shape::Sticky(n) => Some(&n.text),
            _ => None,
        }
    }

    /// Every patchable field this element owns, populated with current values.
    #[must_use]
    pub fn fields(&self) -> ElementPatch {
        let mut p = ElementPatch {
            color: Some(self.color.clone()),
            size: Some(self.size),
            ..ElementPatch::default()
        };
        match &self.shape {
            Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) => {}
            Shape::Rect(b)
            | Shape::Circle(b)
            | Shape::Triangle(b)
            | Shape::Pentagon(b)
            | Shape::Hexagon(b)
            | Shape::Octagon(b)
            | Shape::Star(b) => {
                p.x = Some(b.x);
                p.y = Some(b.y);
                p.width = Some(b.width);
                p.height = Some(b.height);
            }
            Shape::Line(s) => {
                p.x = Some(s.x);
                p.y = Some(s.y);
                p.end_x = Some(s.end_x);
                p.end_y = Some(s.end_y);
            }
            Shape::Text(t) => {
                p.x = Some(t.x);
                p.y = Some(t.y);
                p.width = Some(t.width);
                p.height = Some(t.height);
                p.text = Some(t.text.clone());
                p.is_fixed_width = Some(t.is_fixed_width);
            }
            Shape::Sticky(n) => {
                p.x = Some(n.x);
                p.y = Some(n.y);
                p.width = Some(n.width);
                p.height = Some(n.height);
                p.text = Some(n.text.clone());
            }
            Shape::Image(i) => {
                p.x = Some(i.x);
                p.y = Some(i.y);
                p.width = Some(i.width);
                p.height = Some(i.height);
            }
        }
        p
    }

    /// Capture current values for exactly the fields `patch` names.
    ///
    /// Applying the result undoes applying `patch`.
    #[must_use]
    pub fn snapshot(&self, patch: &ElementPatch) -> ElementPatch {
        let current = self.fields();
        ElementPatch {
            x: patch.x.and(current.x),
            y: patch.y.and(current.y),
            width: patch.width.and(current.width),
            height: patch.height.and(current.height),
            end_x: patch.end_x.and(current.end_x),
            end_y: patch.end_y.and(current.end_y),
            text: patch.text.as_ref().and(current.text),
            is_fixed_width: patch.is_fixed_width.and(current.is_fixed_width),
            color: patch.color.as_ref().and(current.color),
            size: patch.size.and(current.size),
        }
    }

    /// Merge the fields of `patch` this element's kind owns. Others are ignored.
    pub fn apply(&mut self, patch: &ElementPatch) {
        set(&mut self.size, patch.size);
        if let Some(color) = &patch.color {
            self.color.clone_from(color);
        }
        match &mut self.shape {
            Shape::Pen(_) | Shape::Eraser(_) | Shape::Highlighter(_) => {}
            Shape::Rect(b)
            | Shape::Circle(b)
            | Shape::Triangle(b)
            | Shape::Pentagon(b)
            | Shape::Hexagon(b)
            | Shape::Octagon(b)
            | Shape::Star(b) => {
                set(&mut b.x, patch.x);
                set(&mut b.y, patch.y);
                set(&mut b.width, patch.width);
                set(&mut b.height, patch.height);
            }
            Shape::Line(s) => {
                set(&mut s.x, patch.x);
                set(&mut s.y, patch.y);
                set(&mut s.end_x, patch.end_x);
                set(&mut s.end_y, patch.end_y);
            }
            Shape::Text(t) => {
                set(&mut t.x, patch.x);
                set(&mut t.y, patch.y);
                set(&mut t.width, patch.width);
                set(&mut t.height, patch.height);
                set(&mut t.is_fixed_width, patch.is_fixed_width);
                if let Some(text) = &patch.text {
                    t.text.clone_from(text);
                }
            }
            Shape::Sticky(n) => {
                set(&mut n.x, patch.x);
                set(&mut n.y, patch.y);
                set(&mut n.width, patch.width);
                set(&mut n.height, patch.height);
                if let Some(text) = &patch.text {
                    n.text.clone_from(text);
                }
            }
            Shape::Image(i) => {
                set(&mut i.x, patch.x);
                set(&mut i.y, patch.y);
                set(&mut i.width, patch.width);
                set(&mut i.height, patch.height);
            }
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Sparse update for an element. Only present fields are applied, and only
/// if the element's kind owns them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
    pub text: Option<String>,
    pub is_fixed_width: Option<bool>,
    pub color: Option<String>,
    pub size: Option<f64>,
}

impl ElementPatch {
    /// Patch that moves an element's anchor.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    /// Patch that sets an element's extents.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self { width: Some(width), height: Some(height), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Ordered in-memory store of elements. Position is z-order.
#[derive(Debug, Default)]
pub struct DocStore {
    elements: Vec<Element>,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Append a new element on top.
    ///
    /// # Errors
    ///
    /// Returns [`DocError::DuplicateId`] if an element with the same id exists.
    pub fn add(&mut self, element: Element) -> Result<(), DocError> {
        if self.position(&element.id).is_some() {
            return Err(DocError::DuplicateId(element.id));
        }
        self.elements.push(element);
        Ok(())
    }

    /// Replace the element with the same id in place, or append it.
    ///
    /// Applying the same element twice leaves the store as applying it once.
    pub fn upsert(&mut self, element: Element) {
        match self.position(&element.id) {
            Some(i) => self.elements[i] = element,
            None => self.elements.push(element),
        }
    }

    /// Replace the element with the same id in place, or insert it at
    /// `index` (clamped to the end).
    pub fn insert_at(&mut self, index: usize, element: Element) {
        match self.position(&element.id) {
            Some(i) => self.elements[i] = element,
            None => self.elements.insert(index.min(self.elements.len()), element),
        }
    }

    /// Merge `patch` into the element with `id`. Returns `false` if absent.
    pub fn update(&mut self, id: &str, patch: &ElementPatch) -> bool {
        let Some(element) = self.elements.iter_mut().find(|e| e.id == id) else {
            log::warn!("update for unknown element {id}");
            return false;
        };
        element.apply(patch);
        true
    }

    /// Remove an element by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Element> {
        let i = self.position(id)?;
        Some(self.elements.remove(i))
    }

    /// Replace the whole sequence with a snapshot.
    ///
    /// Duplicate ids collapse to one element that keeps the position of the
    /// first occurrence and the content of the last.
    pub fn load(&mut self, elements: Vec<Element>) {
        let total = elements.len();
        let mut index: HashMap<ElementId, usize> = HashMap::with_capacity(total);
        let mut out: Vec<Element> = Vec::with_capacity(total);
        for element in elements {
            if let Some(&i) = index.get(&element.id) {
                out[i] = element;
            } else {
                index.insert(element.id.clone(), out.len());
                out.push(element);
            }
        }
        if out.len() < total {
            log::warn!("collapsed {} duplicate element(s) while loading snapshot", total - out.len());
        }
        self.elements = out;
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Elements bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Top-most element under a world-space point.
    #[must_use]
    pub fn hit_test(&self, world: Point) -> Option<&Element> {
        self.elements.iter().rev().find(|e| hit::contains(e, world))
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
