//! Input model: tools, modifier keys, mouse buttons, and the drag session.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `DragSession` is the gesture being tracked between pointer-down and
//! pointer-up; it is created at gesture start and consulted by every
//! subsequent pointer callback instead of scattered flags.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::consts::{DEFAULT_COLOR, DEFAULT_SIZE};
use crate::doc::{Bounds, ElementId, ElementPatch, Segment, Shape, Stroke};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Pen,
    Eraser,
    Highlighter,
    Rect,
    Circle,
    Line,
    Triangle,
    Pentagon,
    Hexagon,
    Octagon,
    Star,
    /// Click to place text and start editing.
    Text,
    /// Click to drop a sticky note centered on the pointer.
    Sticky,
}

impl Tool {
    /// Parse the host's tool name (the element type it creates, or `"select"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let tool = match name {
            "select" => Self::Select,
            "pen" => Self::Pen,
            "eraser" => Self::Eraser,
            "highlighter" => Self::Highlighter,
            "rect" => Self::Rect,
            "circle" => Self::Circle,
            "line" => Self::Line,
            "triangle" => Self::Triangle,
            "pentagon" => Self::Pentagon,
            "hexagon" => Self::Hexagon,
            "octagon" => Self::Octagon,
            "star" => Self::Star,
            "text" => Self::Text,
            "sticky" => Self::Sticky,
            _ => return None,
        };
        Some(tool)
    }

    /// The host's name for this tool.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Pen => "pen",
            Self::Eraser => "eraser",
            Self::Highlighter => "highlighter",
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Triangle => "triangle",
            Self::Pentagon => "pentagon",
            Self::Hexagon => "hexagon",
            Self::Octagon => "octagon",
            Self::Star => "star",
            Self::Text => "text",
            Self::Sticky => "sticky",
        }
    }

    /// Whether this tool draws a freehand stroke.
    #[must_use]
    pub fn is_freehand(self) -> bool {
        matches!(self, Self::Pen | Self::Eraser | Self::Highlighter)
    }

    /// Geometry for a drag-to-draw element anchored at `at`, if this tool makes one.
    ///
    /// Freehand tools start with a single point; shapes start with zero extent.
    #[must_use]
    pub fn start_shape(self, at: Point) -> Option<Shape> {
        let stroke = || Stroke { points: vec![at] };
        let bounds = Bounds::new(at.x, at.y, 0.0, 0.0);
        let shape = match self {
            Self::Pen => Shape::Pen(stroke()),
            Self::Eraser => Shape::Eraser(stroke()),
            Self::Highlighter => Shape::Highlighter(stroke()),
            Self::Rect => Shape::Rect(bounds),
            Self::Circle => Shape::Circle(bounds),
            Self::Triangle => Shape::Triangle(bounds),
            Self::Pentagon => Shape::Pentagon(bounds),
            Self::Hexagon => Shape::Hexagon(bounds),
            Self::Octagon => Shape::Octagon(bounds),
            Self::Star => Shape::Star(bounds),
            Self::Line => Shape::Line(Segment { x: at.x, y: at.y, end_x: at.x, end_y: at.y }),
            Self::Select | Self::Text | Self::Sticky => return None,
        };
        Some(shape)
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button, pen contact, or single-finger touch.
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `" "`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Local UI state visible to the renderer. Never shared with peers.
#[derive(Debug, Clone)]
pub struct UiState {
    pub tool: Tool,
    /// Stroke color for new elements.
    pub color: String,
    /// Brush size for new elements.
    pub size: f64,
    pub selected: Option<ElementId>,
    /// Element whose text is open in the host's editor overlay.
    pub editing: Option<ElementId>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            color: DEFAULT_COLOR.to_owned(),
            size: DEFAULT_SIZE,
            selected: None,
            editing: None,
        }
    }
}

/// The pointer gesture in progress.
#[derive(Debug, Clone, Default)]
pub enum DragSession {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the view.
    Panning {
        /// Screen position of the pointer-down.
        start_screen: Point,
        /// Pan at pointer-down, in world units.
        initial_pan: Point,
    },
    /// Building the live element held in the engine's buffer.
    Drawing,
    /// Dragging an existing element.
    Moving {
        id: ElementId,
        /// Pointer offset from the element anchor at pointer-down.
        grab: Point,
        /// Anchor at pointer-down, for the undo record.
        before: ElementPatch,
    },
    /// Dragging the bottom-right resize handle.
    Resizing {
        id: ElementId,
        /// Extents at pointer-down, for the undo record.
        before: ElementPatch,
    },
}

impl DragSession {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
