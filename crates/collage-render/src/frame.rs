//! Rendered pixel buffers.

use tiny_skia::Pixmap;

/// A rendered frame. `0x0` frames carry no pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pixmap: Option<Pixmap>,
}

impl Frame {
    /// The well-defined empty result of a zero-sized composition.
    pub fn empty() -> Self {
        Self { pixmap: None }
    }

    pub(crate) fn from_pixmap(pixmap: Pixmap) -> Self {
        Self {
            pixmap: Some(pixmap),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pixmap.is_none()
    }

    pub fn width(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::width)
    }

    pub fn height(&self) -> u32 {
        self.pixmap.as_ref().map_or(0, Pixmap::height)
    }

    /// Premultiplied pixels, if any.
    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Straight (unpremultiplied) RGBA8 bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let Some(pixmap) = &self.pixmap else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(pixmap.pixels().len() * 4);
        for pixel in pixmap.pixels() {
            let c = pixel.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// Straight RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }
}
