//! View transform for pan/zoom of the freeform canvas.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Default zoom range of the freeform editor.
pub const DEFAULT_MIN_SCALE: f64 = 0.2;
/// Upper zoom bound shared by all variants.
pub const DEFAULT_MAX_SCALE: f64 = 6.0;

/// Zoom multiplier for one wheel notch towards the user (zoom out).
pub const WHEEL_ZOOM_OUT: f64 = 0.9;
/// Zoom multiplier for one wheel notch away from the user (zoom in).
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Maps screen pixels to canvas (world) units and back.
///
/// `screen = world * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Current translation (pan) in screen pixels.
    pub offset: Vec2,
    /// Current zoom factor.
    pub scale: f64,
    /// Minimum allowed zoom.
    pub min_scale: f64,
    /// Maximum allowed zoom.
    pub max_scale: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
        }
    }
}

impl ViewState {
    /// Create an identity view with the default zoom range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity view with a custom zoom range.
    pub fn with_range(min_scale: f64, max_scale: f64) -> Self {
        let lo = min_scale.min(max_scale);
        let hi = min_scale.max(max_scale);
        Self {
            min_scale: lo,
            max_scale: hi,
            ..Self::default()
        }
    }

    /// World-to-screen affine.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Screen-to-world affine.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan the view by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_scale = crate::geometry::clamp(self.scale * factor, self.min_scale, self.max_scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.scale = new_scale;

        let new_screen = self.world_to_screen(world_point);
        self.offset += Vec2::new(screen_point.x - new_screen.x, screen_point.y - new_screen.y);
    }

    /// Apply one wheel notch at `screen_point`. Positive `delta_y` zooms out.
    pub fn wheel(&mut self, screen_point: Point, delta_y: f64) {
        let factor = if delta_y > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN };
        self.zoom_at(screen_point, factor);
    }

    /// Reset to identity, keeping the zoom range.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view() {
        let view = ViewState::new();
        assert_eq!(view.offset, Vec2::ZERO);
        assert!((view.scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_offset_and_scale() {
        let mut view = ViewState::new();
        view.offset = Vec2::new(50.0, 100.0);
        view.scale = 2.0;
        let world = view.screen_to_world(Point::new(150.0, 300.0));
        assert!((world.x - 50.0).abs() < 1e-12);
        assert!((world.y - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let scales = [0.2, 0.75, 1.0, 1.5, 6.0];
        let offsets = [Vec2::ZERO, Vec2::new(30.0, -20.0), Vec2::new(-1234.5, 987.25)];
        let points = [Point::new(123.0, 456.0), Point::new(-7.5, 0.25), Point::ZERO];
        for &scale in &scales {
            for &offset in &offsets {
                let view = ViewState { offset, scale, ..ViewState::default() };
                for &p in &points {
                    let back = view.screen_to_world(view.world_to_screen(p));
                    assert!((back.x - p.x).abs() < 1e-9);
                    assert!((back.y - p.y).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_zoom_keeps_cursor_world_point() {
        let mut view = ViewState::new();
        view.offset = Vec2::new(13.0, -42.0);
        let cursor = Point::new(320.0, 240.0);
        for delta in [1.0, 1.0, -1.0, -1.0, -1.0, 1.0] {
            let before = view.screen_to_world(cursor);
            view.wheel(cursor, delta);
            let after = view.screen_to_world(cursor);
            assert!((before.x - after.x).abs() < 1e-9);
            assert!((before.y - after.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zoom_clamp() {
        let mut view = ViewState::new();
        view.zoom_at(Point::ZERO, 0.001);
        assert!((view.scale - DEFAULT_MIN_SCALE).abs() < f64::EPSILON);

        view.zoom_at(Point::ZERO, 1000.0);
        assert!((view.scale - DEFAULT_MAX_SCALE).abs() < f64::EPSILON);

        let mut wide = ViewState::with_range(0.1, 6.0);
        wide.zoom_at(Point::ZERO, 0.001);
        assert!((wide.scale - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_and_reset() {
        let mut view = ViewState::new();
        view.pan(Vec2::new(10.0, 20.0));
        view.scale = 3.0;
        assert_eq!(view.offset, Vec2::new(10.0, 20.0));
        view.reset();
        assert_eq!(view.offset, Vec2::ZERO);
        assert!((view.scale - 1.0).abs() < f64::EPSILON);
    }
}
