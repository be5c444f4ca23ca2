//! Surface that records every call, for asserting on draw output.

use super::{Blend, Surface, SurfaceResult};
use crate::text::TextMeasure;

/// Width of every character reported by [`Recording::text_width`].
pub(crate) const CHAR_W: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Clear,
    Save,
    Restore,
    Scale(f64),
    Translate(f64, f64),
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    Alpha(f64),
    Blend(Blend),
    Shadow(String, f64),
    Font(String),
    Baseline(String),
    RoundCaps,
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Quad(f64, f64, f64, f64),
    Circle(f64, f64, f64),
    Rect(f64, f64, f64, f64),
    ClosePath,
    Fill,
    Stroke,
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    FillText(String, f64, f64),
    DrawImage(u32, f64, f64, f64, f64),
}

#[derive(Debug, Default)]
pub(crate) struct Recording {
    pub ops: Vec<Op>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::FillText(t, _, _) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl TextMeasure for Recording {
    fn text_width(&self, _font: &str, text: &str) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = text.chars().count() as f64;
        n * CHAR_W
    }
}

impl Surface for Recording {
    type Image = u32;

    fn clear(&mut self) -> SurfaceResult {
        self.ops.push(Op::Clear);
        Ok(())
    }
    fn save(&mut self) {
        self.ops.push(Op::Save);
    }
    fn restore(&mut self) {
        self.ops.push(Op::Restore);
    }
    fn scale(&mut self, factor: f64) -> SurfaceResult {
        self.ops.push(Op::Scale(factor));
        Ok(())
    }
    fn translate(&mut self, x: f64, y: f64) -> SurfaceResult {
        self.ops.push(Op::Translate(x, y));
        Ok(())
    }
    fn set_fill_style(&mut self, css: &str) {
        self.ops.push(Op::FillStyle(css.to_owned()));
    }
    fn set_stroke_style(&mut self, css: &str) {
        self.ops.push(Op::StrokeStyle(css.to_owned()));
    }
    fn set_line_width(&mut self, width: f64) {
        self.ops.push(Op::LineWidth(width));
    }
    fn set_global_alpha(&mut self, alpha: f64) {
        self.ops.push(Op::Alpha(alpha));
    }
    fn set_blend(&mut self, blend: Blend) -> SurfaceResult {
        self.ops.push(Op::Blend(blend));
        Ok(())
    }
    fn set_shadow(&mut self, css: &str, blur: f64) {
        self.ops.push(Op::Shadow(css.to_owned(), blur));
    }
    fn set_font(&mut self, font: &str) {
        self.ops.push(Op::Font(font.to_owned()));
    }
    fn set_text_baseline(&mut self, baseline: &str) {
        self.ops.push(Op::Baseline(baseline.to_owned()));
    }
    fn set_round_caps(&mut self) {
        self.ops.push(Op::RoundCaps);
    }
    fn begin_path(&mut self) {
        self.ops.push(Op::BeginPath);
    }
    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::MoveTo(x, y));
    }
    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::LineTo(x, y));
    }
    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ops.push(Op::Quad(cx, cy, x, y));
    }
    fn circle(&mut self, x: f64, y: f64, r: f64) -> SurfaceResult {
        self.ops.push(Op::Circle(x, y, r));
        Ok(())
    }
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(Op::Rect(x, y, w, h));
    }
    fn close_path(&mut self) {
        self.ops.push(Op::ClosePath);
    }
    fn fill(&mut self) {
        self.ops.push(Op::Fill);
    }
    fn stroke(&mut self) {
        self.ops.push(Op::Stroke);
    }
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(Op::FillRect(x, y, w, h));
    }
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.ops.push(Op::StrokeRect(x, y, w, h));
    }
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> SurfaceResult {
        self.ops.push(Op::FillText(text.to_owned(), x, y));
        Ok(())
    }
    fn draw_image(&mut self, image: &u32, x: f64, y: f64, w: f64, h: f64) -> SurfaceResult {
        self.ops.push(Op::DrawImage(*image, x, y, w, h));
        Ok(())
    }
}
