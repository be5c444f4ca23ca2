//! Word wrapping and text measurement.
//!
//! Wrapping is greedy per paragraph (`\n`), breaking on single spaces. A
//! word wider than the line on its own is never split; it overflows. The
//! returned height drives auto-resizing of text and sticky elements, so
//! rendering and sizing must share this one routine.

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use crate::consts::{FONT_SIZE_FACTOR, LINE_HEIGHT_FACTOR};

/// Measures rendered text width for a CSS font string.
pub trait TextMeasure {
    fn text_width(&self, font: &str, text: &str) -> f64;
}

/// Headless measurer: every character advances by a fixed width.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance(pub f64);

impl TextMeasure for FixedAdvance {
    fn text_width(&self, _font: &str, text: &str) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = text.chars().count() as f64;
        n * self.0
    }
}

/// Wrapped lines plus the total height they occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    pub height: f64,
}

/// Font size in pixels for a text element of the given `size`.
#[must_use]
pub fn font_px(size: f64) -> f64 {
    size * FONT_SIZE_FACTOR
}

/// CSS font string for a text element of the given `size`.
#[must_use]
pub fn text_font(size: f64) -> String {
    format!("{}px sans-serif", font_px(size))
}

/// Line height for a text element of the given `size`.
#[must_use]
pub fn line_height(size: f64) -> f64 {
    font_px(size) * LINE_HEIGHT_FACTOR
}

/// Greedy word wrap of `text` into lines no wider than `max_width`.
pub fn layout(measure: &(impl TextMeasure + ?Sized), font: &str, text: &str, max_width: f64, line_height: f64) -> TextLayout {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for (n, word) in paragraph.split(' ').enumerate() {
            let candidate = format!("{line}{word} ");
            if n > 0 && measure.text_width(font, &candidate) > max_width {
                lines.push(finish(&line));
                line = format!("{word} ");
            } else {
                line = candidate;
            }
        }
        lines.push(finish(&line));
    }
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f64 * line_height;
    TextLayout { lines, height }
}

/// Width of the widest hard line (no wrapping).
pub fn widest_line(measure: &(impl TextMeasure + ?Sized), font: &str, text: &str) -> f64 {
    text.split('\n')
        .map(|line| measure.text_width(font, line))
        .fold(0.0, f64::max)
}

fn finish(line: &str) -> String {
    line.strip_suffix(' ').unwrap_or(line).to_owned()
}
