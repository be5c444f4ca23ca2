//! Backend-neutral 2D drawing surface.
//!
//! [`crate::render`] draws exclusively through this trait using the Canvas2D
//! vocabulary. The browser implementation over `CanvasRenderingContext2d`
//! lives in `web`; tests use a recording implementation.
//!
//! Calls that can throw in the browser return [`SurfaceResult`]. State
//! setters cannot fail and return nothing.

#[cfg(test)]
#[path = "recording_test.rs"]
pub(crate) mod recording;

use crate::text::TextMeasure;

/// Drawing surface errors.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("drawing call failed: {0}")]
    Call(String),
    #[error("surface unavailable: {0}")]
    Unavailable(String),
}

pub type SurfaceResult = Result<(), SurfaceError>;

/// Compositing mode for subsequent drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    SourceOver,
    /// Cuts drawn pixels out of what is already there.
    DestinationOut,
}

impl Blend {
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::SourceOver => "source-over",
            Self::DestinationOut => "destination-out",
        }
    }
}

/// A Canvas2D-shaped drawing target.
pub trait Surface: TextMeasure {
    /// Decoded bitmap type accepted by [`Surface::draw_image`].
    type Image;

    /// Wipe the whole surface, ignoring the current transform.
    fn clear(&mut self) -> SurfaceResult;
    fn save(&mut self);
    fn restore(&mut self);
    fn scale(&mut self, factor: f64) -> SurfaceResult;
    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult;

    fn set_fill_style(&mut self, css: &str);
    fn set_stroke_style(&mut self, css: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_blend(&mut self, blend: Blend) -> SurfaceResult;
    fn set_shadow(&mut self, css: &str, blur: f64);
    fn set_font(&mut self, font: &str);
    fn set_text_baseline(&mut self, baseline: &str);
    /// Round line caps and joins.
    fn set_round_caps(&mut self);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64);
    /// Full circle of radius `r` around `(x, y)`.
    fn circle(&mut self, x: f64, y: f64, r: f64) -> SurfaceResult;
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self);

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult;
    fn draw_image(&mut self, image: &Self::Image, x: f64, y: f64, w: f64, h: f64) -> SurfaceResult;
}
