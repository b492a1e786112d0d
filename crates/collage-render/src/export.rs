//! Encoding rendered frames to PNG or JPEG.

use crate::bitmap::BitmapStore;
use crate::frame::Frame;
use crate::renderer::{RenderContext, RenderError, RenderResult, Renderer, Scene};
use collage_core::{ExportFormat, ExportSettings, SerializableColor};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

/// An encoded export, ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ExportFormat,
    pub file_name: String,
}

impl ExportedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Encode a frame as RGBA PNG.
pub fn encode_png(frame: &Frame) -> RenderResult<Vec<u8>> {
    let (width, height) = (frame.width(), frame.height());
    let rgba = frame.to_rgba8();
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError::Encode(format!("PNG header: {e}")))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| RenderError::Encode(format!("PNG data: {e}")))?;
    }
    Ok(png_data)
}

/// Color transparent pixels are flattened onto for formats without alpha.
///
/// An opaque background is used as is; anything else is composited over white.
pub fn jpeg_matte(background: SerializableColor) -> [u8; 3] {
    if background.is_opaque() {
        return [background.r, background.g, background.b];
    }
    let a = u32::from(background.a);
    let over_white = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
    [over_white(background.r), over_white(background.g), over_white(background.b)]
}

/// `quality` in `[0, 1]` mapped to the encoder's 1..=100.
fn jpeg_quality(quality: f64) -> u8 {
    let q = if quality.is_finite() { (quality * 100.0).round() } else { 92.0 };
    q.clamp(1.0, 100.0) as u8
}

/// Encode a frame as JPEG, flattening alpha onto `matte`.
pub fn encode_jpeg(frame: &Frame, quality: f64, matte: [u8; 3]) -> RenderResult<Vec<u8>> {
    let (width, height) = (frame.width(), frame.height());
    let rgba = frame.to_rgba8();
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = u32::from(px[3]);
        for (c, m) in px[..3].iter().zip(matte) {
            rgb.push(((u32::from(*c) * a + u32::from(m) * (255 - a) + 127) / 255) as u8);
        }
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality))
        .encode(&rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| RenderError::Encode(format!("JPEG: {e}")))?;
    Ok(bytes)
}

/// Encode `frame` in the requested format.
pub fn encode(frame: &Frame, settings: &ExportSettings, background: SerializableColor) -> RenderResult<Vec<u8>> {
    match settings.format {
        ExportFormat::Png => encode_png(frame),
        ExportFormat::Jpeg => encode_jpeg(frame, settings.jpeg_quality, jpeg_matte(background)),
    }
}

/// Render `scene` at the export scale and encode it.
///
/// Returns `Ok(None)` when there is nothing to export (zero-sized frame).
pub fn export_composition(
    renderer: &mut dyn Renderer,
    scene: &Scene,
    bitmaps: &BitmapStore,
    settings: &ExportSettings,
) -> RenderResult<Option<ExportedImage>> {
    let scale = settings.sanitized().scale.value();
    export_at_scale(renderer, scene, bitmaps, settings, scale)
}

/// Like [`export_composition`], with the canvas-to-output `scale` given
/// explicitly (e.g. an export scale combined with an output budget).
pub fn export_at_scale(
    renderer: &mut dyn Renderer,
    scene: &Scene,
    bitmaps: &BitmapStore,
    settings: &ExportSettings,
    scale: f64,
) -> RenderResult<Option<ExportedImage>> {
    let settings = settings.sanitized();
    let ctx = RenderContext::export(scene, scale);
    let frame = renderer.render(&ctx, bitmaps)?;
    if frame.is_empty() {
        log::info!("Nothing to export");
        return Ok(None);
    }

    let bytes = encode(&frame, &settings, scene.background.into())?;
    log::info!(
        "Exported {}x{} {} ({} bytes)",
        frame.width(),
        frame.height(),
        settings.format.extension(),
        bytes.len()
    );
    Ok(Some(ExportedImage {
        bytes,
        width: frame.width(),
        height: frame.height(),
        format: settings.format,
        file_name: settings.file_name(),
    }))
}
