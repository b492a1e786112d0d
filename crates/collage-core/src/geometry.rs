//! Aspect-ratio fitting and numeric helpers shared by every layout.

use kurbo::{Rect, Size};

/// Clamp `n` into `[lo, hi]`.
///
/// NaN collapses to `lo` so that a bad value never leaks into geometry.
pub fn clamp(n: f64, lo: f64, hi: f64) -> f64 {
    if n.is_nan() {
        return lo;
    }
    n.max(lo).min(hi)
}

/// Return `value` if it is finite, otherwise `default`.
pub fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

/// Return `value` unless it is zero or not finite, in which case `default`.
///
/// Form fields treat an empty or zero entry as "use the default".
pub fn nonzero_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value != 0.0 { value } else { default }
}

/// Largest uniform scale `s <= 1` so that `src` fits inside `max`.
///
/// A bound of `0` (or any non-positive / non-finite bound) means the axis is
/// unbounded. Degenerate sources return `1.0`, so this never scales up and
/// never fails.
pub fn scale_to_fit(src_w: f64, src_h: f64, max_w: f64, max_h: f64) -> f64 {
    if !(src_w.is_finite() && src_h.is_finite()) || src_w <= 0.0 || src_h <= 0.0 {
        return 1.0;
    }

    let mut scale: f64 = 1.0;
    if max_w.is_finite() && max_w > 0.0 {
        scale = scale.min(max_w / src_w);
    }
    if max_h.is_finite() && max_h > 0.0 {
        scale = scale.min(max_h / src_h);
    }
    scale
}

/// How an image is placed into a destination cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale so the whole image is visible (may letterbox).
    #[default]
    Contain,
    /// Scale so the cell is fully covered (overflow is clipped at draw time).
    Cover,
}

impl FitMode {
    /// Compute the placement rectangle of a `src` image inside `dst`.
    pub fn fit(self, src: Size, dst: Size) -> Rect {
        match self {
            FitMode::Contain => fit_rect_contain(src.width, src.height, dst.width, dst.height),
            FitMode::Cover => fit_rect_cover(src.width, src.height, dst.width, dst.height),
        }
    }
}

fn centered(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64, scale: f64) -> Rect {
    let w = src_w * scale;
    let h = src_h * scale;
    let x = (dst_w - w) / 2.0;
    let y = (dst_h - h) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// Centered rectangle with scale `min(dst/src)`: never crops.
///
/// The rectangle is relative to the destination origin.
pub fn fit_rect_contain(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> Rect {
    if src_w <= 0.0 || src_h <= 0.0 || dst_w <= 0.0 || dst_h <= 0.0 {
        return Rect::new(0.0, 0.0, dst_w.max(0.0), dst_h.max(0.0));
    }
    let scale = (dst_w / src_w).min(dst_h / src_h);
    centered(src_w, src_h, dst_w, dst_h, scale)
}

/// Centered rectangle with scale `max(dst/src)`: never letterboxes.
pub fn fit_rect_cover(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> Rect {
    if src_w <= 0.0 || src_h <= 0.0 || dst_w <= 0.0 || dst_h <= 0.0 {
        return Rect::new(0.0, 0.0, dst_w.max(0.0), dst_h.max(0.0));
    }
    let scale = (dst_w / src_w).max(dst_h / src_h);
    centered(src_w, src_h, dst_w, dst_h, scale)
}

/// Corner radius actually used for drawing a rounded rect of `size`.
pub fn effective_radius(radius: f64, size: Size) -> f64 {
    let limit = (size.width.min(size.height) / 2.0).max(0.0);
    clamp(finite_or(radius, 0.0), 0.0, limit)
}

/// Substitute `1.0` for zero, negative or non-finite reference dimensions.
pub fn non_degenerate(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}
