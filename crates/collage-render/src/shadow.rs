//! Drop shadows: a blurred copy of the caster path drawn under an item.
//!
//! Blur and offsets are in output pixels, unaffected by the content
//! transform, matching 2D canvas shadow semantics.

use collage_core::Shadow;
use image::{ImageBuffer, Rgba};
use tiny_skia::{Color, FillRule, FilterQuality, IntSize, Paint, Path, Pixmap, PixmapPaint, Transform};

/// Largest shadow surface edge blurred at full resolution.
const MAX_SHADOW_EDGE: f32 = 8192.0;

/// Draw the shadow of `path` (in canvas units, mapped by `transform`) onto
/// `target`, with the item's `opacity` applied on top of the shadow alpha.
///
/// Only the part of the shadow that can reach `target` is rasterized. When
/// that part is still wider than [`MAX_SHADOW_EDGE`] it is blurred at a
/// reduced resolution and scaled back up.
pub fn draw_shadow(target: &mut Pixmap, path: &Path, transform: Transform, shadow: &Shadow, opacity: f32) {
    if !shadow.is_visible() || opacity <= 0.0 {
        return;
    }
    let Some(bounds) = path.clone().transform(transform).map(|p| p.bounds()) else {
        return;
    };

    let sigma = (shadow.blur / 2.0) as f32;
    let pad = (3.0 * sigma).ceil() + 2.0;
    let (ox, oy) = (shadow.offset_x as f32, shadow.offset_y as f32);
    let left = (bounds.left().floor() - pad).max((-ox - pad).floor());
    let top = (bounds.top().floor() - pad).max((-oy - pad).floor());
    let right = (bounds.right().ceil() + pad).min((target.width() as f32 - ox + pad).ceil());
    let bottom = (bounds.bottom().ceil() + pad).min((target.height() as f32 - oy + pad).ceil());
    if right <= left || bottom <= top {
        return;
    }
    let (width, height) = (right - left, bottom - top);

    let factor = (MAX_SHADOW_EDGE / width.max(height)).min(1.0);
    if factor < 1.0 {
        log::debug!("Blurring {}x{} shadow at {:.3}x", width, height, factor);
    }
    let (mask_w, mask_h) = ((width * factor).ceil().max(1.0), (height * factor).ceil().max(1.0));
    let Some(mut mask) = Pixmap::new(mask_w as u32, mask_h as u32) else {
        log::warn!("Cannot allocate a {}x{} shadow surface", mask_w, mask_h);
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba(0.0, 0.0, 0.0, shadow.alpha as f32).unwrap_or(Color::BLACK));
    paint.anti_alias = true;
    mask.fill_path(
        path,
        &paint,
        FillRule::Winding,
        transform.post_translate(-left, -top).post_scale(factor, factor),
        None,
    );

    let Some(blurred) = blur(mask, sigma * factor) else {
        return;
    };
    let paint = PixmapPaint {
        opacity,
        quality: if factor < 1.0 {
            FilterQuality::Bilinear
        } else {
            FilterQuality::Nearest
        },
        ..PixmapPaint::default()
    };
    target.draw_pixmap(
        0,
        0,
        blurred.as_ref(),
        &paint,
        Transform::from_row(1.0 / factor, 0.0, 0.0, 1.0 / factor, left + ox, top + oy),
        None,
    );
}

/// Gaussian blur of a premultiplied pixmap.
fn blur(pixmap: Pixmap, sigma: f32) -> Option<Pixmap> {
    if sigma <= 0.0 {
        return Some(pixmap);
    }
    let (width, height) = (pixmap.width(), pixmap.height());
    let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixmap.take())?;
    let blurred = image::imageops::blur(&buffer, sigma);
    Pixmap::from_vec(blurred.into_raw(), IntSize::from_wh(width, height)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{PathBuilder, Rect};

    fn square() -> Path {
        PathBuilder::from_rect(Rect::from_xywh(20.0, 20.0, 20.0, 20.0).unwrap())
    }

    #[test]
    fn test_shadow_spreads_outside_caster() {
        let mut target = Pixmap::new(80, 80).unwrap();
        let shadow = Shadow {
            blur: 8.0,
            alpha: 1.0,
            offset_x: 0.0,
            offset_y: 10.0,
        };
        draw_shadow(&mut target, &square(), Transform::identity(), &shadow, 1.0);
        // below the caster, inside the offset shadow
        assert!(target.pixel(30, 45).unwrap().alpha() > 100);
        // blurred edge bleeds past the offset rect
        assert!(target.pixel(30, 52).unwrap().alpha() > 0);
        // far away stays clear
        assert_eq!(target.pixel(75, 5).unwrap().alpha(), 0);
    }

    fn band(x: f32, y: f32, w: f32, h: f32) -> Path {
        PathBuilder::from_rect(Rect::from_xywh(x, y, w, h).unwrap())
    }

    #[test]
    fn test_shadow_of_huge_caster_is_drawn() {
        // caster far wider than any surface we would allocate for it
        let mut target = Pixmap::new(100, 60).unwrap();
        let shadow = Shadow {
            blur: 4.0,
            alpha: 1.0,
            offset_x: 0.0,
            offset_y: 10.0,
        };
        draw_shadow(&mut target, &band(0.0, 10.0, 20000.0, 20.0), Transform::identity(), &shadow, 1.0);
        assert!(target.pixel(50, 30).unwrap().alpha() > 100);
        assert!(target.pixel(99, 30).unwrap().alpha() > 100);
        assert_eq!(target.pixel(50, 55).unwrap().alpha(), 0);
    }

    #[test]
    fn test_oversized_shadow_is_downscaled_not_dropped() {
        let mut target = Pixmap::new(9000, 40).unwrap();
        let shadow = Shadow {
            blur: 4.0,
            alpha: 1.0,
            offset_x: 0.0,
            offset_y: 10.0,
        };
        draw_shadow(&mut target, &band(0.0, 5.0, 9000.0, 10.0), Transform::identity(), &shadow, 1.0);
        for x in [100, 4500, 8900] {
            assert!(target.pixel(x, 20).unwrap().alpha() > 100, "x = {x}");
            assert_eq!(target.pixel(x, 38).unwrap().alpha(), 0, "x = {x}");
        }
    }

    #[test]
    fn test_invisible_shadow_draws_nothing() {
        let mut target = Pixmap::new(40, 40).unwrap();
        draw_shadow(&mut target, &square(), Transform::identity(), &Shadow::none(), 1.0);
        assert!(target.pixels().iter().all(|p| p.alpha() == 0));
    }
}
