//! Serializable color type and hex parsing.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for SerializableColor {
    fn default() -> Self {
        Self::black()
    }
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
    ///
    /// Returns `None` for anything else, including `"transparent"`.
    pub fn from_hex(input: &str) -> Option<Self> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let r = channel(0..1)? * 17;
                let g = channel(1..2)? * 17;
                let b = channel(2..3)? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// Parse a form value, falling back to `default` when it is not a color.
    pub fn parse_or(input: &str, default: Self) -> Self {
        if input.trim().eq_ignore_ascii_case("transparent") {
            return Self::transparent();
        }
        Self::from_hex(input).unwrap_or(default)
    }

    /// Format as `#rrggbb` (or `#rrggbbaa` when not opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same color with alpha multiplied by `opacity` in `[0, 1]`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let opacity = crate::geometry::clamp(opacity, 0.0, 1.0);
        Self {
            a: (f64::from(self.a) * opacity).round() as u8,
            ..self
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(SerializableColor::from_hex("#fff"), Some(SerializableColor::white()));
        assert_eq!(
            SerializableColor::from_hex("#111827"),
            Some(SerializableColor::new(0x11, 0x18, 0x27, 255))
        );
        assert_eq!(
            SerializableColor::from_hex("00000080"),
            Some(SerializableColor::new(0, 0, 0, 0x80))
        );
        assert_eq!(SerializableColor::from_hex("#12"), None);
        assert_eq!(SerializableColor::from_hex("#gggggg"), None);
    }

    #[test]
    fn test_parse_or_fallback() {
        let fallback = SerializableColor::white();
        assert_eq!(SerializableColor::parse_or("", fallback), fallback);
        assert_eq!(
            SerializableColor::parse_or("transparent", fallback),
            SerializableColor::transparent()
        );
    }

    #[test]
    fn test_hex_roundtrip_and_opacity() {
        let c = SerializableColor::new(0x12, 0xab, 0xef, 255);
        assert_eq!(c.to_hex(), "#12abef");
        assert_eq!(c.with_opacity(0.5).a, 128);
        assert_eq!(c.with_opacity(2.0).a, 255);
    }

    #[test]
    fn test_peniko_conversion() {
        let c = SerializableColor::new(10, 20, 30, 40);
        let peniko: Color = c.into();
        assert_eq!(SerializableColor::from(peniko), c);
    }
}
