//! Canvas and export settings, plus form-value sanitizing.
//!
//! Form values arrive as text. A value that is missing, non-numeric or zero
//! falls back to its default; anything else is clamped into range. Invalid
//! input is never an error.

use crate::color::SerializableColor;
use crate::geometry::{clamp, finite_or, nonzero_or};
use kurbo::Size;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CANVAS_WIDTH: f64 = 1200.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 800.0;
pub const MIN_CANVAS_SIDE: f64 = 64.0;
pub const MIN_EXPORT_SCALE: f64 = 0.25;
pub const DEFAULT_JPEG_QUALITY: f64 = 0.92;

/// Parse a numeric form field. Empty, non-numeric, non-finite and zero
/// values yield `None`.
pub fn parse_number(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v != 0.0)
}

/// `clamp(parse(input) or default, lo, hi)`.
pub fn number_field(input: &str, default: f64, lo: f64, hi: f64) -> f64 {
    clamp(parse_number(input).unwrap_or(default), lo, hi)
}

/// Freeform canvas settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: f64,
    pub height: f64,
    pub background: SerializableColor,
    pub show_grid: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            background: SerializableColor::white(),
            show_grid: false,
        }
    }
}

impl CanvasSettings {
    /// `W = max(64, v or 1200)`, `H = max(64, v or 800)`, both whole pixels.
    pub fn sanitized(self) -> Self {
        let side = |v: f64, default: f64| {
            nonzero_or(v, default).max(MIN_CANVAS_SIDE).round()
        };
        Self {
            width: side(self.width, DEFAULT_CANVAS_WIDTH),
            height: side(self.height, DEFAULT_CANVAS_HEIGHT),
            ..self
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            _ => None,
        }
    }
}

/// Export scale choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScale {
    /// One of the fixed presets (1x, 2x, 3x...).
    Preset(f64),
    /// Free value, at least 0.25.
    Custom(f64),
}

impl Default for ExportScale {
    fn default() -> Self {
        ExportScale::Preset(1.0)
    }
}

impl ExportScale {
    /// Effective multiplier.
    pub fn value(self) -> f64 {
        match self {
            ExportScale::Preset(v) => {
                if v.is_finite() && v > 0.0 {
                    v
                } else {
                    1.0
                }
            }
            ExportScale::Custom(v) => nonzero_or(v, 1.0).max(MIN_EXPORT_SCALE),
        }
    }
}

/// Export parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub scale: ExportScale,
    /// JPEG quality in `[0, 1]`.
    pub jpeg_quality: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            scale: ExportScale::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ExportSettings {
    pub fn sanitized(self) -> Self {
        Self {
            jpeg_quality: clamp(nonzero_or(self.jpeg_quality, DEFAULT_JPEG_QUALITY), 0.0, 1.0),
            ..self
        }
    }

    /// Output pixel size of a `content` sized composition.
    pub fn output_size(&self, content: Size) -> (u32, u32) {
        let scale = self.scale.value();
        (
            finite_or(content.width * scale, 0.0).round().max(0.0) as u32,
            finite_or(content.height * scale, 0.0).round().max(0.0) as u32,
        )
    }

    /// Download name, `collage_<scale>x.<ext>`.
    pub fn file_name(&self) -> String {
        format!("collage_{}x.{}", self.scale.value(), self.format.extension())
    }
}
