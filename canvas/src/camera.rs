//! Viewport transform for the infinite canvas.
//!
//! The scene is drawn with `scale(s)` applied first and `translate(pan)`
//! second, so pan is measured in world units:
//!
//! ```text
//! screen = (world + pan) * scale
//! world  = screen / scale - pan
//! ```

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::consts::{GRID_BASE, GRID_MIN_SPACING_PX, MAX_SCALE, MIN_SCALE, ZOOM_STEP};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points.
    #[must_use]
    pub fn mid(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned rectangle in world space, `min` top-left and `max` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub min: Point,
    pub max: Point,
}

/// Camera state for pan/zoom.
///
/// `pan_x` / `pan_y` are in world units.
/// `scale` is a zoom factor in `[MIN_SCALE, MAX_SCALE]` (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { scale: 1.0, pan_x: 0.0, pan_y: 0.0 }
    }
}

impl Camera {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: screen.x / self.scale - self.pan_x,
            y: screen.y / self.scale - self.pan_y,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: (world.x + self.pan_x) * self.scale,
            y: (world.y + self.pan_y) * self.scale,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.scale
    }

    /// Zoom to `scale` while keeping the world point under `anchor` fixed.
    ///
    /// The target is clamped to the allowed range first. Returns `false`
    /// (and leaves the camera untouched) if the clamped scale is unchanged.
    pub fn zoom_to(&mut self, scale: f64, anchor: Point) -> bool {
        let next = scale.clamp(MIN_SCALE, MAX_SCALE);
        if (next - self.scale).abs() < f64::EPSILON {
            return false;
        }
        let k = 1.0 / next - 1.0 / self.scale;
        self.pan_x += anchor.x * k;
        self.pan_y += anchor.y * k;
        self.scale = next;
        true
    }

    /// One wheel notch of zoom at `anchor`. Scrolling down zooms out.
    pub fn zoom_step(&mut self, wheel_dy: f64, anchor: Point) -> bool {
        let delta = if wheel_dy > 0.0 { -ZOOM_STEP } else { ZOOM_STEP };
        self.zoom_to(self.scale + delta, anchor)
    }

    /// Shift the view by a screen-space delta.
    pub fn pan_by_screen(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx / self.scale;
        self.pan_y += dy / self.scale;
    }

    /// Grid spacing in world units for the current zoom level.
    ///
    /// Starts at `GRID_BASE` and doubles until dots are at least
    /// `GRID_MIN_SPACING_PX` apart on screen.
    #[must_use]
    pub fn grid_step(&self) -> f64 {
        let mut step = GRID_BASE;
        while step * self.scale < GRID_MIN_SPACING_PX {
            step *= 2.0;
        }
        step
    }

    /// World-space rectangle covered by a viewport of the given CSS size.
    #[must_use]
    pub fn visible_world_rect(&self, width: f64, height: f64) -> WorldRect {
        WorldRect {
            min: self.screen_to_world(Point::new(0.0, 0.0)),
            max: self.screen_to_world(Point::new(width, height)),
        }
    }
}
