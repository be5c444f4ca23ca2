//! Shared numeric constants for the canvas crate.

// ── Math ────────────────────────────────────────────────────────

/// π / 5 (36°) — angular step between star vertices.
pub const FRAC_PI_5: f64 = std::f64::consts::PI / 5.0;

// ── Viewport ────────────────────────────────────────────────────

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;

/// Additive zoom change per wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

/// Grid spacing in world units before level-of-detail doubling.
pub const GRID_BASE: f64 = 40.0;

/// Minimum on-screen distance between grid dots, in pixels.
pub const GRID_MIN_SPACING_PX: f64 = 20.0;

pub const GRID_DOT_PX: f64 = 1.0;
pub const GRID_DOT_COLOR: &str = "rgba(0, 0, 0, 0.1)";

// ── Hit-testing & selection ─────────────────────────────────────

/// World-unit slop around rect/image/text bounds.
pub const HIT_SLOP: f64 = 10.0;

/// Rect/image/text bounds are treated as at least this large when hit-testing.
pub const HIT_MIN_SIZE: f64 = 20.0;

/// Half-width of the square around the bottom-right corner that starts a resize.
pub const RESIZE_GRAB: f64 = 10.0;

pub const SELECTION_COLOR: &str = "#3b82f6";

/// Selection border width in screen pixels.
pub const SELECTION_BORDER_PX: f64 = 2.0;

/// Resize handle edge length in screen pixels.
pub const HANDLE_PX: f64 = 12.0;

// ── Strokes ─────────────────────────────────────────────────────

pub const HIGHLIGHTER_ALPHA: f64 = 0.4;
pub const HIGHLIGHTER_WIDTH_FACTOR: f64 = 3.0;
pub const ERASER_STYLE: &str = "rgba(0,0,0,1)";

// ── Text ────────────────────────────────────────────────────────

/// Text font size in pixels is `size * FONT_SIZE_FACTOR`.
pub const FONT_SIZE_FACTOR: f64 = 5.0;
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Wrap width for text elements that have no width yet.
pub const DEFAULT_TEXT_WRAP: f64 = 200.0;

pub const NEW_TEXT_WIDTH: f64 = 100.0;
pub const MIN_TEXT_WIDTH: f64 = 20.0;

/// Horizontal breathing room added to auto-sized text.
pub const TEXT_AUTO_PADDING: f64 = 20.0;

// ── Sticky notes ────────────────────────────────────────────────

pub const STICKY_SIZE: f64 = 200.0;

/// Narrowest sticky note: the text insets plus one minimum text column.
pub const MIN_STICKY_WIDTH: f64 = 2.0 * STICKY_INSET_X + MIN_TEXT_WIDTH;
pub const STICKY_FILL: &str = "#fef08a";
pub const STICKY_SHADOW: &str = "rgba(0,0,0,0.2)";
pub const STICKY_SHADOW_BLUR: f64 = 10.0;
pub const STICKY_TEXT_COLOR: &str = "#000";
pub const STICKY_FONT: &str = "16px sans-serif";
pub const STICKY_LINE_HEIGHT: f64 = 20.0;
pub const STICKY_INSET_X: f64 = 10.0;
pub const STICKY_INSET_Y: f64 = 30.0;
pub const STICKY_PLACEHOLDER: &str = "Double click to edit...";

// ── Shapes ──────────────────────────────────────────────────────

/// Inner-to-outer radius ratio for the 5-point star.
pub const STAR_INNER_RATIO: f64 = 0.5;
pub const STAR_SPIKES: usize = 5;

// ── Images ──────────────────────────────────────────────────────

pub const IMAGE_MAX_WIDTH: f64 = 500.0;

/// World position of newly inserted images.
pub const IMAGE_ORIGIN: f64 = 100.0;

// ── Remote cursors ──────────────────────────────────────────────

pub const CURSOR_RADIUS_PX: f64 = 5.0;
pub const CURSOR_LABEL_FONT: &str = "12px sans-serif";
pub const CURSOR_LABEL_OFFSET_PX: f64 = 8.0;

// ── Defaults ────────────────────────────────────────────────────

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_SIZE: f64 = 5.0;
