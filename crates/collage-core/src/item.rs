//! Compositable items: one placed image instance on the freeform canvas.

use crate::geometry::{clamp, effective_radius, finite_or, nonzero_or};
use crate::source::SourceId;
use kurbo::{Point, Rect, RoundedRect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum width/height an item can be resized or arranged to, in canvas units.
pub const MIN_SIZE: f64 = 24.0;

/// Fraction of the canvas an imported image may occupy on the limiting axis.
pub const IMPORT_FIT_FRACTION: f64 = 0.55;

/// Offset applied to duplicated items.
pub const DUPLICATE_OFFSET: Vec2 = Vec2::new(24.0, 24.0);

/// Unique, monotonically assigned item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drop shadow descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    /// Blur radius in canvas units (>= 0).
    pub blur: f64,
    /// Shadow opacity in `[0, 1]`.
    pub alpha: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            blur: 18.0,
            alpha: 0.25,
            offset_x: 0.0,
            offset_y: 8.0,
        }
    }
}

impl Shadow {
    /// A shadow that draws nothing.
    pub fn none() -> Self {
        Self {
            blur: 0.0,
            alpha: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Whether this shadow needs a shadow pass.
    pub fn is_visible(&self) -> bool {
        self.blur > 0.0 && self.alpha > 0.0
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.offset_x, self.offset_y)
    }

    /// Apply the form rules: blur `max(0, v or 0)`, alpha `clamp(v or 0)`,
    /// offsets `v or 0`.
    pub fn sanitized(self) -> Self {
        Self {
            blur: finite_or(self.blur, 0.0).max(0.0),
            alpha: clamp(finite_or(self.alpha, 0.0), 0.0, 1.0),
            offset_x: finite_or(self.offset_x, 0.0),
            offset_y: finite_or(self.offset_y, 0.0),
        }
    }
}

/// Appearance properties editable from the property panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Corner radius (>= 0), clamped to half the short side when drawn.
    pub radius: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    pub shadow: Shadow,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            radius: 0.0,
            opacity: 1.0,
            shadow: Shadow::default(),
        }
    }
}

impl Appearance {
    /// Apply the form rules: radius `max(0, v or 0)`, opacity `clamp(v or 1)`.
    ///
    /// An opacity of exactly zero counts as empty and becomes fully opaque.
    pub fn sanitized(self) -> Self {
        Self {
            radius: finite_or(self.radius, 0.0).max(0.0),
            opacity: clamp(nonzero_or(self.opacity, 1.0), 0.0, 1.0),
            shadow: self.shadow.sanitized(),
        }
    }
}

/// One placed image instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositableItem {
    pub(crate) id: ItemId,
    /// Source image this item draws.
    pub source: SourceId,
    /// Natural size of the source in pixels.
    pub natural: Size,
    /// Top-left corner in canvas units.
    pub position: Point,
    /// Display width (>= 1).
    pub width: f64,
    /// Display height (>= 1).
    pub height: f64,
    pub appearance: Appearance,
}

impl CompositableItem {
    /// Create an item for `source`, centered on a canvas of `canvas` size.
    ///
    /// The image is scaled to fit 55% of the canvas on its limiting axis,
    /// preserving aspect ratio and never upscaled beyond 1x. Both sides share
    /// one scale, so a thin image stays thin; [`MIN_SIZE`] only applies once
    /// the item is resized.
    pub fn new(id: ItemId, source: SourceId, natural: Size, canvas: Size) -> Self {
        let max_w = canvas.width * IMPORT_FIT_FRACTION;
        let max_h = canvas.height * IMPORT_FIT_FRACTION;
        let scale = (max_w / natural.width).min(max_h / natural.height).min(1.0);
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let width = (natural.width * scale).round().max(1.0);
        let height = (natural.height * scale).round().max(1.0);

        Self {
            id,
            source,
            natural,
            position: Point::new(
                ((canvas.width - width) / 2.0).round(),
                ((canvas.height - height) / 2.0).round(),
            ),
            width,
            height,
            appearance: Appearance::default(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Copy geometry and appearance under a new id, offset by +24/+24.
    pub fn duplicate(&self, id: ItemId) -> Self {
        Self {
            id,
            position: self.position + DUPLICATE_OFFSET,
            ..self.clone()
        }
    }

    /// Bounding rectangle in canvas units.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, Size::new(self.width, self.height))
    }

    /// Replace the geometry. Sizes below one unit are raised to one.
    ///
    /// Resizes reach this already floored to [`MIN_SIZE`]; moves keep the
    /// item's own size, which may be smaller.
    pub fn set_rect(&mut self, rect: Rect) {
        let rect = rect.abs();
        self.position = rect.origin();
        self.width = rect.width().max(1.0);
        self.height = rect.height().max(1.0);
    }

    /// Translate by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Rounded rect used both for the shadow caster and the clip.
    pub fn rounded_rect(&self) -> RoundedRect {
        let radius = effective_radius(self.appearance.radius, Size::new(self.width, self.height));
        RoundedRect::from_rect(self.rect(), radius)
    }

    /// Inclusive point-in-rectangle test.
    pub fn hit_test(&self, point: Point) -> bool {
        let r = self.rect();
        point.x >= r.x0 && point.x <= r.x1 && point.y >= r.y0 && point.y <= r.y1
    }

    pub fn set_appearance(&mut self, appearance: Appearance) {
        self.appearance = appearance.sanitized();
    }
}
