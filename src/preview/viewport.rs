//! Pan and zoom of the preview surface.
//!
//! The rendered scene is drawn as `translate(tx, ty) scale(s)` in viewport
//! pixels. Zooming keeps the content point under an anchor fixed on screen.

use kurbo::{Affine, Point, Size, Vec2};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 8.0;
/// Zoom factor of the zoom buttons.
pub const BUTTON_STEP: f64 = 1.25;
/// Zoom factor per wheel notch.
pub const WHEEL_STEP: f64 = 1.12;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start: Point,
    start_translate: Vec2,
}

/// Scale and translation of the preview surface.
///
/// # Example
///
/// ```
/// use kurbo::{Point, Size};
/// use mermaidpad::preview::viewport::ViewportTransform;
///
/// let mut vt = ViewportTransform::new(Size::new(800.0, 600.0));
/// vt.zoom_to(2.0, Some(Point::new(100.0, 100.0)));
/// assert_eq!(vt.zoom_percent(), 200);
/// assert_eq!(vt.screen_to_content(Point::new(100.0, 100.0)), Point::new(100.0, 100.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTransform {
    scale: f64,
    translate: Vec2,
    size: Size,
    drag: Option<Drag>,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl ViewportTransform {
    pub const fn new(size: Size) -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
            size,
            drag: None,
        }
    }

    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub const fn translate(&self) -> Vec2 {
        self.translate
    }

    pub const fn size(&self) -> Size {
        self.size
    }

    /// Update the viewport size; the transform itself is unchanged.
    pub const fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Content → screen transform.
    pub fn affine(&self) -> Affine {
        Affine::translate(self.translate) * Affine::scale(self.scale)
    }

    pub fn content_to_screen(&self, point: Point) -> Point {
        self.affine() * point
    }

    pub fn screen_to_content(&self, point: Point) -> Point {
        self.affine().inverse() * point
    }

    /// Zoom to `target`, clamped to [`MIN_SCALE`, `MAX_SCALE`], keeping the
    /// content under `anchor` (viewport center by default) in place.
    pub fn zoom_to(&mut self, target: f64, anchor: Option<Point>) {
        if !target.is_finite() {
            return;
        }
        let new_scale = target.clamp(MIN_SCALE, MAX_SCALE);
        let anchor = anchor.unwrap_or_else(|| self.center());
        let ratio = new_scale / self.scale;
        self.translate = anchor.to_vec2() - (anchor.to_vec2() - self.translate) * ratio;
        self.scale = new_scale;
    }

    pub fn zoom_in(&mut self) {
        self.zoom_to(self.scale * BUTTON_STEP, None);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_to(self.scale / BUTTON_STEP, None);
    }

    /// One wheel notch at `anchor`: scrolling up zooms in.
    pub fn wheel(&mut self, delta_y: f64, anchor: Point) {
        if delta_y < 0.0 {
            self.zoom_to(self.scale * WHEEL_STEP, Some(anchor));
        } else if delta_y > 0.0 {
            self.zoom_to(self.scale / WHEEL_STEP, Some(anchor));
        }
    }

    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    pub const fn begin_drag(&mut self, at: Point) {
        self.drag = Some(Drag {
            start: at,
            start_translate: self.translate,
        });
    }

    /// Move the content with the pointer. Ignored when no drag is active.
    pub fn drag_to(&mut self, at: Point) {
        if let Some(drag) = self.drag {
            self.translate = drag.start_translate + (at - drag.start);
        }
    }

    pub const fn end_drag(&mut self) {
        self.drag = None;
    }

    pub const fn reset(&mut self) {
        self.scale = 1.0;
        self.translate = Vec2::ZERO;
        self.drag = None;
    }

    /// Zoom label value, e.g. `125` for 125%.
    #[allow(clippy::cast_possible_truncation)]
    pub fn zoom_percent(&self) -> i32 {
        (self.scale * 100.0).round() as i32
    }

    /// CSS `transform` value for the scene element.
    pub fn css_transform(&self) -> String {
        format!(
            "translate({}px,{}px) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }

    fn center(&self) -> Point {
        Point::new(self.size.width / 2.0, self.size.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vt() -> ViewportTransform {
        ViewportTransform::new(Size::new(800.0, 600.0))
    }

    #[test]
    fn test_default_anchor_is_center() {
        let mut vt = vt();
        let before = vt.screen_to_content(Point::new(400.0, 300.0));
        vt.zoom_in();
        let after = vt.screen_to_content(Point::new(400.0, 300.0));
        assert!((before - after).hypot() < 1e-9);
        assert_eq!(vt.zoom_percent(), 125);
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut vt = vt();
        vt.zoom_to(100.0, None);
        assert!((vt.scale() - MAX_SCALE).abs() < f64::EPSILON);
        vt.zoom_to(0.0001, None);
        assert!((vt.scale() - MIN_SCALE).abs() < f64::EPSILON);
        vt.zoom_to(f64::NAN, None);
        assert!((vt.scale() - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wheel_direction() {
        let mut vt = vt();
        vt.wheel(-1.0, Point::new(10.0, 10.0));
        assert!((vt.scale() - WHEEL_STEP).abs() < 1e-12);
        vt.wheel(1.0, Point::new(10.0, 10.0));
        assert!((vt.scale() - 1.0).abs() < 1e-12);
        vt.wheel(0.0, Point::new(10.0, 10.0));
        assert!((vt.scale() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_drag_moves_translate() {
        let mut vt = vt();
        vt.pan(Vec2::new(5.0, 5.0));
        vt.begin_drag(Point::new(100.0, 100.0));
        vt.drag_to(Point::new(130.0, 90.0));
        assert_eq!(vt.translate(), Vec2::new(35.0, -5.0));
        vt.end_drag();
        vt.drag_to(Point::new(500.0, 500.0));
        assert_eq!(vt.translate(), Vec2::new(35.0, -5.0));
    }

    #[test]
    fn test_reset() {
        let mut vt = vt();
        vt.zoom_to(3.0, Some(Point::new(1.0, 2.0)));
        vt.pan(Vec2::new(4.0, 4.0));
        vt.reset();
        assert_eq!(vt.css_transform(), "translate(0px,0px) scale(1)");
        assert_eq!(vt.zoom_percent(), 100);
    }

    #[test]
    fn test_content_screen_round_trip() {
        let mut vt = vt();
        vt.zoom_to(2.5, Some(Point::new(33.0, 44.0)));
        let p = Point::new(12.0, -7.0);
        let back = vt.screen_to_content(vt.content_to_screen(p));
        assert!((back - p).hypot() < 1e-9);
    }

    mod property_tests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn zoom_keeps_anchor_fixed(
                start in 0.1f64..8.0,
                target in 0.1f64..8.0,
                ax in -2000.0f64..2000.0,
                ay in -2000.0f64..2000.0,
                tx in -500.0f64..500.0,
                ty in -500.0f64..500.0,
            ) {
                let mut vt = ViewportTransform::new(Size::new(800.0, 600.0));
                vt.zoom_to(start, None);
                vt.pan(Vec2::new(tx, ty));
                let anchor = Point::new(ax, ay);
                let before = vt.screen_to_content(anchor);
                vt.zoom_to(target, Some(anchor));
                let after = vt.content_to_screen(before);
                prop_assert!((after - anchor).hypot() < 1e-6);
            }

            #[test]
            fn scale_stays_in_range(factors in proptest::collection::vec(0.01f64..100.0, 1..20)) {
                let mut vt = ViewportTransform::new(Size::new(800.0, 600.0));
                for factor in factors {
                    vt.zoom_to(vt.scale() * factor, None);
                    prop_assert!((MIN_SCALE..=MAX_SCALE).contains(&vt.scale()));
                }
            }
        }
    }
}
