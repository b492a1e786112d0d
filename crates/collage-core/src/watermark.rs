//! Watermark configuration and placement in output pixel space.

use crate::color::SerializableColor;
use crate::geometry::{clamp, finite_or, nonzero_or};
use kurbo::{Affine, Point, Size};
use serde::{Deserialize, Serialize};

/// Default watermark text for the "add text" action.
pub const DEFAULT_TEXT: &str = "© watermark";
pub const DEFAULT_FONT_SIZE: f64 = 32.0;
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const DEFAULT_OPACITY: f64 = 0.2;
pub const DEFAULT_PADDING: f64 = 18.0;
pub const DEFAULT_TILE_SPACING: f64 = 200.0;

/// Single-draw anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

/// Horizontal alignment of a text run relative to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// X offset of the run's start for a run `width` wide.
    pub fn offset(self, width: f64) -> f64 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => -width / 2.0,
            TextAlign::Right => -width,
        }
    }
}

/// Anchored or tiled placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WatermarkMode {
    Anchored { anchor: Anchor },
    /// Text repeated on a grid rotated about the canvas center.
    Tiled { spacing: f64 },
}

impl Default for WatermarkMode {
    fn default() -> Self {
        WatermarkMode::Anchored {
            anchor: Anchor::default(),
        }
    }
}

/// Watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub enabled: bool,
    pub text: String,
    /// Font size in output pixels.
    pub font_size: f64,
    pub color: SerializableColor,
    pub opacity: f64,
    /// Rotation in degrees, clockwise in screen space.
    pub rotation_deg: f64,
    pub mode: WatermarkMode,
    /// Distance of anchored text from the output edges.
    pub padding: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            font_size: DEFAULT_FONT_SIZE,
            color: SerializableColor::black(),
            opacity: DEFAULT_OPACITY,
            rotation_deg: 0.0,
            mode: WatermarkMode::default(),
            padding: DEFAULT_PADDING,
        }
    }
}

/// One text run to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRun {
    /// Baseline origin before rotation.
    pub origin: Point,
    pub align: TextAlign,
}

/// Resolved watermark geometry for one output size.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkLayout {
    /// Transform from run space to output pixels.
    pub transform: Affine,
    pub runs: Vec<TextRun>,
}

impl WatermarkConfig {
    /// Enable the watermark, filling in the default text when empty.
    pub fn enable_default_text(&mut self) {
        self.enabled = true;
        if self.text.is_empty() {
            self.text = DEFAULT_TEXT.to_string();
        }
    }

    /// Apply the form defaults and clamps.
    pub fn sanitized(self) -> Self {
        let font_size = nonzero_or(self.font_size, DEFAULT_FONT_SIZE);
        let opacity = nonzero_or(self.opacity, DEFAULT_OPACITY);
        let mode = match self.mode {
            WatermarkMode::Tiled { spacing } => WatermarkMode::Tiled {
                spacing: if spacing.is_finite() && spacing > 0.0 {
                    spacing
                } else {
                    DEFAULT_TILE_SPACING
                },
            },
            anchored => anchored,
        };
        Self {
            font_size: font_size.max(MIN_FONT_SIZE),
            opacity: clamp(opacity, 0.0, 1.0),
            rotation_deg: finite_or(self.rotation_deg, 0.0),
            padding: finite_or(self.padding, DEFAULT_PADDING).max(0.0),
            mode,
            ..self
        }
    }

    /// Trimmed text, or `None` when nothing should be drawn.
    pub fn visible_text(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Place the watermark on an output of `output` pixels.
    ///
    /// `text_width` is the advance width of the text at `font_size`. Returns
    /// `None` when the watermark is disabled or blank. Out-of-range settings
    /// are sanitized first, so a raw config never yields an unbounded grid.
    pub fn layout(&self, output: Size, text_width: f64) -> Option<WatermarkLayout> {
        self.visible_text()?;
        let config = self.clone().sanitized();
        let rotation = Affine::rotate(config.rotation_deg.to_radians());

        match config.mode {
            WatermarkMode::Anchored { anchor } => {
                let (w, h) = (output.width, output.height);
                let pad = config.padding;
                let (anchor_point, align) = match anchor {
                    Anchor::TopLeft => (Point::new(pad, pad + config.font_size), TextAlign::Left),
                    Anchor::TopRight => (Point::new(w - pad, pad + config.font_size), TextAlign::Right),
                    Anchor::BottomLeft => (Point::new(pad, h - pad), TextAlign::Left),
                    Anchor::BottomRight => (Point::new(w - pad, h - pad), TextAlign::Right),
                    Anchor::Center => (Point::new(w / 2.0, h / 2.0), TextAlign::Center),
                };
                Some(WatermarkLayout {
                    transform: Affine::translate(anchor_point.to_vec2()) * rotation,
                    runs: vec![TextRun {
                        origin: Point::ZERO,
                        align,
                    }],
                })
            }
            WatermarkMode::Tiled { spacing } => {
                let step_x = (spacing + finite_or(text_width, 0.0).max(0.0)).max(MIN_FONT_SIZE);
                let step_y = (spacing + config.font_size).max(MIN_FONT_SIZE);
                // cover the diagonal so rotation leaves no uncovered corners
                let half = output.width.hypot(output.height) / 2.0;
                let nx = (half / step_x).ceil() as i64;
                let ny = (half / step_y).ceil() as i64;
                let mut runs = Vec::with_capacity(((2 * nx + 1) * (2 * ny + 1)).max(0) as usize);
                for j in -ny..=ny {
                    for i in -nx..=nx {
                        runs.push(TextRun {
                            origin: Point::new(i as f64 * step_x, j as f64 * step_y),
                            align: TextAlign::Center,
                        });
                    }
                }
                let center = Point::new(output.width / 2.0, output.height / 2.0);
                Some(WatermarkLayout {
                    transform: Affine::translate(center.to_vec2()) * rotation,
                    runs,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(mode: WatermarkMode) -> WatermarkConfig {
        WatermarkConfig {
            enabled: true,
            text: "hello".into(),
            mode,
            ..WatermarkConfig::default()
        }
    }

    #[test]
    fn test_disabled_or_blank_draws_nothing() {
        let mut config = WatermarkConfig::default();
        assert!(config.layout(Size::new(100.0, 100.0), 10.0).is_none());
        config.enabled = true;
        config.text = "   ".into();
        assert!(config.layout(Size::new(100.0, 100.0), 10.0).is_none());
    }

    #[test]
    fn test_anchor_positions() {
        let out = Size::new(300.0, 200.0);
        let origin = |anchor| {
            let layout = enabled(WatermarkMode::Anchored { anchor }).layout(out, 50.0).unwrap();
            (layout.transform * Point::ZERO, layout.runs[0].align)
        };
        assert_eq!(origin(Anchor::TopLeft), (Point::new(18.0, 50.0), TextAlign::Left));
        assert_eq!(origin(Anchor::TopRight), (Point::new(282.0, 50.0), TextAlign::Right));
        assert_eq!(origin(Anchor::BottomLeft), (Point::new(18.0, 182.0), TextAlign::Left));
        assert_eq!(origin(Anchor::BottomRight), (Point::new(282.0, 182.0), TextAlign::Right));
        assert_eq!(origin(Anchor::Center), (Point::new(150.0, 100.0), TextAlign::Center));
    }

    #[test]
    fn test_anchor_is_output_space() {
        // same padding and size at any output scale
        let config = enabled(WatermarkMode::Anchored {
            anchor: Anchor::BottomRight,
        });
        let small = config.layout(Size::new(300.0, 200.0), 50.0).unwrap();
        let large = config.layout(Size::new(600.0, 400.0), 50.0).unwrap();
        assert_eq!(small.transform * Point::ZERO, Point::new(282.0, 182.0));
        assert_eq!(large.transform * Point::ZERO, Point::new(582.0, 382.0));
    }

    #[test]
    fn test_tiles_cover_rotated_output() {
        let mut config = enabled(WatermarkMode::Tiled { spacing: 40.0 });
        config.rotation_deg = 30.0;
        let out = Size::new(400.0, 300.0);
        let layout = config.layout(out, 60.0).unwrap();
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(400.0, 0.0),
            Point::new(0.0, 300.0),
            Point::new(400.0, 300.0),
        ];
        let inverse = layout.transform.inverse();
        let (min_x, max_x) = layout
            .runs
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), r| (lo.min(r.origin.x), hi.max(r.origin.x)));
        let (min_y, max_y) = layout
            .runs
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), r| (lo.min(r.origin.y), hi.max(r.origin.y)));
        for corner in corners {
            let p = inverse * corner;
            assert!(p.x >= min_x && p.x <= max_x, "{p:?}");
            assert!(p.y >= min_y && p.y <= max_y, "{p:?}");
        }
    }

    #[test]
    fn test_tiled_layout_sanitizes_raw_spacing() {
        // spacing -32 with font 32 would make the vertical step zero
        let mut config = enabled(WatermarkMode::Tiled { spacing: -32.0 });
        config.font_size = 32.0;
        let layout = config.layout(Size::new(400.0, 300.0), 0.0).unwrap();
        let step_y = DEFAULT_TILE_SPACING + 32.0;
        let ny = (250.0_f64 / step_y).ceil();
        assert_eq!(layout.runs.last().unwrap().origin.y, ny * step_y);
        assert!(layout.runs.len() < 100);

        config.mode = WatermarkMode::Tiled { spacing: f64::NAN };
        config.font_size = f64::NAN;
        let layout = config.layout(Size::new(400.0, 300.0), f64::NAN).unwrap();
        assert!(layout.runs.iter().all(|r| r.origin.x.is_finite() && r.origin.y.is_finite()));
    }

    #[test]
    fn test_sanitized_defaults() {
        let config = WatermarkConfig {
            font_size: f64::NAN,
            opacity: 0.0,
            rotation_deg: f64::INFINITY,
            ..WatermarkConfig::default()
        }
        .sanitized();
        assert_eq!(config.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(config.opacity, DEFAULT_OPACITY);
        assert_eq!(config.rotation_deg, 0.0);

        let tiny = WatermarkConfig {
            font_size: 2.0,
            opacity: 5.0,
            ..WatermarkConfig::default()
        }
        .sanitized();
        assert_eq!(tiny.font_size, MIN_FONT_SIZE);
        assert_eq!(tiny.opacity, 1.0);
    }

    #[test]
    fn test_enable_default_text() {
        let mut config = WatermarkConfig::default();
        config.enable_default_text();
        assert!(config.enabled);
        assert_eq!(config.text, DEFAULT_TEXT);

        config.text = "mine".into();
        config.enable_default_text();
        assert_eq!(config.text, "mine");
    }
}
