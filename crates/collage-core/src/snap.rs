//! Snap-to-guide alignment of a dragged item against the canvas and siblings.

use crate::document::ItemStack;
use crate::geometry::{finite_or, nonzero_or};
use crate::item::ItemId;
use kurbo::{Line, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default snap distance in screen pixels.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 6.0;

/// Snap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub enabled: bool,
    /// Snap distance in screen pixels.
    pub tolerance: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: DEFAULT_SNAP_TOLERANCE,
        }
    }
}

impl SnapSettings {
    /// `max(0, v or 6)`.
    pub fn sanitized(self) -> Self {
        Self {
            tolerance: nonzero_or(self.tolerance, DEFAULT_SNAP_TOLERANCE).max(0.0),
            ..self
        }
    }

    /// Tolerance converted to world units at zoom `scale`.
    pub fn world_tolerance(&self, scale: f64) -> f64 {
        let scale = finite_or(scale, 1.0);
        if scale > 0.0 { self.tolerance / scale } else { self.tolerance }
    }
}

/// Coordinates items can align to, per axis: the canvas first, then every
/// other item, each as start edge, center, end edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapTargets {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

fn axis_targets(start: f64, end: f64) -> [f64; 3] {
    [start, (start + end) / 2.0, end]
}

impl SnapTargets {
    /// Canvas edges and center, then every other item's edges and center.
    pub fn collect(canvas: Size, stack: &ItemStack, moving: ItemId) -> Self {
        let mut xs = Vec::with_capacity(3 * (stack.len() + 1));
        let mut ys = Vec::with_capacity(3 * (stack.len() + 1));
        xs.extend(axis_targets(0.0, canvas.width));
        ys.extend(axis_targets(0.0, canvas.height));

        for item in stack.iter().filter(|item| item.id() != moving) {
            let r = item.rect();
            xs.extend(axis_targets(r.x0, r.x1));
            ys.extend(axis_targets(r.y0, r.y1));
        }
        Self { xs, ys }
    }
}

/// Outcome of snapping one rectangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    /// Correction to apply to the rectangle's position.
    pub delta: Vec2,
    /// Matched x coordinate, if any.
    pub snapped_x: Option<f64>,
    /// Matched y coordinate, if any.
    pub snapped_y: Option<f64>,
    /// Guide segments across the whole canvas at the matched coordinates.
    pub guides: Vec<Line>,
}

impl SnapResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x.is_some() || self.snapped_y.is_some()
    }
}

/// Nearest target to any candidate within `tolerance`; ties keep the first.
fn best_match(candidates: [f64; 3], targets: &[f64], tolerance: f64) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64)> = None;
    for candidate in candidates {
        for &target in targets {
            let d = target - candidate;
            if d.abs() <= tolerance && best.is_none_or(|(best_d, _)| d.abs() < best_d.abs()) {
                best = Some((d, target));
            }
        }
    }
    best
}

/// Snap `rect` against `targets`.
///
/// Candidates are the rectangle's left/center/right and top/center/bottom.
/// At most one correction per axis is applied, and each produces one guide.
pub fn snap_rect(rect: Rect, targets: &SnapTargets, tolerance: f64, canvas: Size) -> SnapResult {
    let mut result = SnapResult::none();
    let cx = [rect.x0, (rect.x0 + rect.x1) / 2.0, rect.x1];
    let cy = [rect.y0, (rect.y0 + rect.y1) / 2.0, rect.y1];

    if let Some((dx, x)) = best_match(cx, &targets.xs, tolerance) {
        result.delta.x = dx;
        result.snapped_x = Some(x);
        result.guides.push(Line::new(Point::new(x, 0.0), Point::new(x, canvas.height)));
    }
    if let Some((dy, y)) = best_match(cy, &targets.ys, tolerance) {
        result.delta.y = dy;
        result.snapped_y = Some(y);
        result.guides.push(Line::new(Point::new(0.0, y), Point::new(canvas.width, y)));
    }
    result
}
