//! Watermark text: glyph outlines converted to fillable paths.

use crate::renderer::{RenderError, RenderResult};
use ab_glyph::{Font, FontRef, GlyphId, OutlineCurve};
use tiny_skia::{Path, PathBuilder};

static EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// A font that lays out a single line of text as outlines.
pub struct GlyphFont {
    font: FontRef<'static>,
}

impl GlyphFont {
    /// The bundled DejaVu Sans.
    pub fn embedded() -> RenderResult<Self> {
        Self::from_bytes(EMBEDDED_FONT)
    }

    pub fn from_bytes(data: &'static [u8]) -> RenderResult<Self> {
        let font = FontRef::try_from_slice(data).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    fn units_per_em(&self) -> f32 {
        self.font.units_per_em().unwrap_or(1000.0)
    }

    fn glyphs(&self, text: &str) -> Vec<GlyphId> {
        text.chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .map(|c| self.font.glyph_id(c))
            .collect()
    }

    /// Pen positions (font units) of each glyph, plus the total advance.
    fn pen_positions(&self, glyphs: &[GlyphId]) -> (Vec<f32>, f32) {
        let mut positions = Vec::with_capacity(glyphs.len());
        let mut pen = 0.0;
        let mut previous: Option<GlyphId> = None;
        for &id in glyphs {
            if let Some(prev) = previous {
                pen += self.font.kern_unscaled(prev, id);
            }
            positions.push(pen);
            pen += self.font.h_advance_unscaled(id);
            previous = Some(id);
        }
        (positions, pen)
    }

    /// Advance width of `text` at `font_size` pixels per em.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        let (_, advance) = self.pen_positions(&self.glyphs(text));
        f64::from(advance) * font_size / f64::from(self.units_per_em())
    }

    /// Outline of `text` with its baseline on `y = 0`, starting at `x`.
    ///
    /// Returns `None` for text without visible glyphs.
    pub fn text_path(&self, text: &str, font_size: f64, x: f64) -> Option<Path> {
        let scale = (font_size / f64::from(self.units_per_em())) as f32;
        let glyphs = self.glyphs(text);
        let (positions, _) = self.pen_positions(&glyphs);

        let mut builder = PathBuilder::new();
        for (&id, &pen) in glyphs.iter().zip(&positions) {
            let Some(outline) = self.font.outline(id) else {
                continue;
            };
            let origin = x as f32 + pen * scale;
            // font units are y-up
            let map = |p: ab_glyph::Point| (origin + p.x * scale, -p.y * scale);
            let mut last: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match curve {
                    OutlineCurve::Line(a, b) => (map(*a), map(*b)),
                    OutlineCurve::Quad(a, _, b) => (map(*a), map(*b)),
                    OutlineCurve::Cubic(a, _, _, b) => (map(*a), map(*b)),
                };
                if last != Some(start) {
                    if last.is_some() {
                        builder.close();
                    }
                    builder.move_to(start.0, start.1);
                }
                match curve {
                    OutlineCurve::Line(_, _) => builder.line_to(end.0, end.1),
                    OutlineCurve::Quad(_, c, _) => {
                        let c = map(*c);
                        builder.quad_to(c.0, c.1, end.0, end.1);
                    }
                    OutlineCurve::Cubic(_, c1, c2, _) => {
                        let (c1, c2) = (map(*c1), map(*c2));
                        builder.cubic_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
                    }
                }
                last = Some(end);
            }
            if last.is_some() {
                builder.close();
            }
        }
        builder.finish()
    }
}
