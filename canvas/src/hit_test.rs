use super::*;
use crate::doc::{ImageRef, Note, Stroke, TextBox};

fn rect(id: &str, x: f64, y: f64, w: f64, h: f64) -> Element {
    Element::new(id, Shape::Rect(Bounds::new(x, y, w, h)), "#000", 2.0)
}

fn sticky(id: &str, x: f64, y: f64, w: f64, h: f64) -> Element {
    Element::new(id, Shape::Sticky(Note { x, y, width: w, height: h, text: String::new() }), "#000", 2.0)
}

fn text(id: &str, w: f64, h: f64) -> Element {
    Element::new(
        id,
        Shape::Text(TextBox { x: 0.0, y: 0.0, text: "hi".into(), width: w, height: h, is_fixed_width: false }),
        "#000",
        5.0,
    )
}

// =============================================================
// contains
// =============================================================

#[test]
fn rect_hit_includes_slop() {
    let r = rect("r", 0.0, 0.0, 100.0, 50.0);
    assert!(contains(&r, Point::new(-10.0, -10.0)));
    assert!(contains(&r, Point::new(110.0, 60.0)));
    assert!(!contains(&r, Point::new(110.1, 30.0)));
}

#[test]
fn tiny_rect_gets_minimum_grab_area() {
    let r = rect("r", 0.0, 0.0, 2.0, 2.0);
    assert!(contains(&r, Point::new(25.0, 25.0)));
    assert!(!contains(&r, Point::new(31.0, 0.0)));
}

#[test]
fn negative_extent_rect_hits_mirrored_area() {
    let r = rect("r", 0.0, 0.0, -50.0, -30.0);
    assert!(contains(&r, Point::new(-40.0, -20.0)));
}

#[test]
fn sticky_hit_is_exact() {
    let s = sticky("s", 0.0, 0.0, 200.0, 200.0);
    assert!(contains(&s, Point::new(0.0, 200.0)));
    assert!(!contains(&s, Point::new(-1.0, 100.0)));
}

#[test]
fn sticky_without_size_uses_default_box() {
    let s = sticky("s", 0.0, 0.0, 0.0, 0.0);
    assert!(contains(&s, Point::new(150.0, 150.0)));
}

#[test]
fn image_and_text_are_hittable() {
    let img = Element::new(
        "i",
        Shape::Image(ImageRef { x: 0.0, y: 0.0, width: 40.0, height: 40.0, url: String::new() }),
        "#000",
        1.0,
    );
    assert!(contains(&img, Point::new(20.0, 20.0)));
    assert!(contains(&text("t", 0.0, 0.0), Point::new(15.0, 15.0)));
}

#[test]
fn strokes_circles_and_lines_are_never_hit() {
    let pen = Element::new(
        "p",
        Shape::Pen(Stroke { points: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)] }),
        "#000",
        2.0,
    );
    let circle = Element::new("c", Shape::Circle(Bounds::new(0.0, 0.0, 10.0, 10.0)), "#000", 2.0);
    assert!(!contains(&pen, Point::new(5.0, 5.0)));
    assert!(!contains(&circle, Point::new(0.0, 0.0)));
}

// =============================================================
// Resize handle
// =============================================================

#[test]
fn resize_handle_at_bottom_right_corner() {
    let r = rect("r", 0.0, 0.0, 100.0, 50.0);
    assert!(on_resize_handle(&r, Point::new(105.0, 45.0)));
    assert!(!on_resize_handle(&r, Point::new(50.0, 25.0)));
}

#[test]
fn unmeasured_text_uses_fallback_handle_position() {
    let t = text("t", 0.0, 0.0);
    assert!(on_resize_handle(&t, Point::new(50.0, 20.0)));
}

#[test]
fn circle_has_no_resize_handle() {
    let c = Element::new("c", Shape::Circle(Bounds::new(0.0, 0.0, 10.0, 10.0)), "#000", 2.0);
    assert!(!on_resize_handle(&c, Point::new(10.0, 10.0)));
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn selected_handle_wins_over_body() {
    let mut doc = DocStore::new();
    doc.upsert(rect("a", 0.0, 0.0, 100.0, 100.0));
    doc.upsert(rect("b", 90.0, 90.0, 100.0, 100.0));

    let hit = hit_test(Point::new(100.0, 100.0), &doc, Some("a"));
    assert_eq!(hit, Some(Hit { id: "a".into(), part: HitPart::ResizeHandle }));

    let hit = hit_test(Point::new(100.0, 100.0), &doc, None);
    assert_eq!(hit, Some(Hit { id: "b".into(), part: HitPart::Body }));
}

#[test]
fn miss_returns_none() {
    let doc = DocStore::new();
    assert!(hit_test(Point::new(0.0, 0.0), &doc, Some("gone")).is_none());
}
