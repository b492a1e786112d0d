//! Decoded bitmaps and the per-session bitmap store.

use crate::renderer::{RenderError, RenderResult};
use collage_core::SourceId;
use kurbo::Size;
use std::collections::HashMap;
use std::sync::Arc;
use tiny_skia::{ColorU8, IntSize, Pixmap};

/// An immutable decoded raster, premultiplied RGBA.
///
/// Cloning is cheap: the pixels are shared read-only.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixmap: Arc<Pixmap>,
}

impl Bitmap {
    /// Build from straight (non-premultiplied) RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> RenderResult<Self> {
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| RenderError::Decode(format!("Empty image {width}x{height}")))?;
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::Decode(format!(
                "Expected {expected} bytes of RGBA, got {}",
                rgba.len()
            )));
        }
        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or(RenderError::Surface { width, height })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        Ok(Self {
            pixmap: Arc::new(pixmap),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Natural size in pixels.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Decode PNG/JPEG/WebP bytes.
pub fn decode_image(bytes: &[u8]) -> RenderResult<Bitmap> {
    let decoded = image::load_from_memory(bytes).map_err(|e| RenderError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Bitmap::from_rgba8(width, height, rgba.as_raw())
}

/// Outcome of decoding a batch of files.
#[derive(Debug, Default)]
pub struct DecodeReport {
    /// Successfully decoded files, in input order.
    pub decoded: Vec<(String, Bitmap)>,
    /// Names of files that could not be decoded.
    pub failed: Vec<String>,
}

impl DecodeReport {
    /// User-facing notice about skipped files, if any.
    pub fn notice(&self) -> Option<String> {
        match self.failed.len() {
            0 => None,
            1 => Some(format!("1 file could not be decoded: {}", self.failed[0])),
            n => Some(format!("{n} files could not be decoded")),
        }
    }
}

/// Decode every `(name, bytes)` pair, skipping files that fail.
pub fn decode_all<I>(files: I) -> DecodeReport
where
    I: IntoIterator<Item = (String, Vec<u8>)>,
{
    let mut report = DecodeReport::default();
    for (name, bytes) in files {
        match decode_image(&bytes) {
            Ok(bitmap) => report.decoded.push((name, bitmap)),
            Err(e) => {
                log::warn!("Skipping {}: {}", name, e);
                report.failed.push(name);
            }
        }
    }
    report
}

/// Bitmaps of the current session, keyed by source.
#[derive(Debug, Clone, Default)]
pub struct BitmapStore {
    bitmaps: HashMap<SourceId, Bitmap>,
}

impl BitmapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: SourceId, bitmap: Bitmap) {
        self.bitmaps.insert(source, bitmap);
    }

    pub fn get(&self, source: SourceId) -> Option<&Bitmap> {
        self.bitmaps.get(&source)
    }

    pub fn remove(&mut self, source: SourceId) -> Option<Bitmap> {
        self.bitmaps.remove(&source)
    }

    /// Drop the bitmaps of released sources.
    pub fn evict(&mut self, sources: &[SourceId]) {
        for source in sources {
            self.bitmaps.remove(source);
        }
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    pub fn clear(&mut self) {
        self.bitmaps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut data = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut data, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            let pixels = vec![200u8; (width * height * 4) as usize];
            writer.write_image_data(&pixels).unwrap();
        }
        data
    }

    #[test]
    fn test_decode_png() {
        let bitmap = decode_image(&png_bytes(3, 2)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (3, 2));
        assert_eq!(bitmap.size(), Size::new(3.0, 2.0));
    }

    #[test]
    fn test_decode_failure_is_error() {
        assert!(matches!(decode_image(b"not an image"), Err(RenderError::Decode(_))));
    }

    #[test]
    fn test_decode_all_skips_failures() {
        let report = decode_all(vec![
            ("a.png".to_string(), png_bytes(1, 1)),
            ("b.txt".to_string(), b"hello".to_vec()),
            ("c.png".to_string(), png_bytes(2, 2)),
        ]);
        assert_eq!(report.decoded.len(), 2);
        assert_eq!(report.failed, vec!["b.txt".to_string()]);
        assert_eq!(report.notice().unwrap(), "1 file could not be decoded: b.txt");
    }

    #[test]
    fn test_from_rgba_premultiplies() {
        let bitmap = Bitmap::from_rgba8(1, 1, &[255, 0, 0, 128]).unwrap();
        let px = bitmap.pixmap().pixels()[0];
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
        assert!(Bitmap::from_rgba8(2, 2, &[0; 4]).is_err());
        assert!(Bitmap::from_rgba8(0, 2, &[]).is_err());
    }

    #[test]
    fn test_store_evict() {
        let mut store = BitmapStore::new();
        let bitmap = Bitmap::from_rgba8(1, 1, &[0, 0, 0, 255]).unwrap();
        store.insert(SourceId(1), bitmap.clone());
        store.insert(SourceId(2), bitmap);
        store.evict(&[SourceId(1)]);
        assert!(store.get(SourceId(1)).is_none());
        assert_eq!(store.len(), 1);
    }
}
