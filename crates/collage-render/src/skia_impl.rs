//! CPU compositor built on tiny-skia.

use crate::bitmap::BitmapStore;
use crate::frame::Frame;
use crate::renderer::{DrawItem, RenderContext, RenderError, RenderResult, Renderer};
use crate::shadow::draw_shadow;
use crate::text::GlyphFont;
use collage_core::geometry::{clamp, effective_radius};
use collage_core::interaction::{HANDLE_SIZE, handles};
use collage_core::watermark::WatermarkConfig;
use kurbo::{Affine, BezPath, Line, PathEl, Rect, Shape};
use peniko::Color;
use tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, Path, PathBuilder, Pattern, Pixmap, SpreadMode, Stroke, StrokeDash,
    Transform,
};

/// Grid line spacing in canvas units.
pub const GRID_STEP: f64 = 50.0;
const GRID_ALPHA: f32 = 0.12;
const GUIDE_ALPHA: f32 = 0.8;
const GUIDE_DASH: [f32; 2] = [6.0, 6.0];
const SELECTION_WIDTH: f64 = 2.0;
const HANDLE_COLOR: Color = Color::from_rgba8(0x11, 0x18, 0x27, 0xff);

/// tiny-skia renderer.
pub struct SkiaRenderer {
    font: GlyphFont,
}

impl SkiaRenderer {
    /// Create a renderer with the bundled watermark font.
    pub fn new() -> RenderResult<Self> {
        Ok(Self {
            font: GlyphFont::embedded()?,
        })
    }

    fn render_grid(&self, pixmap: &mut Pixmap, ctx: &RenderContext<'_>, transform: Transform) {
        let canvas = ctx.scene.canvas;
        let mut path = BezPath::new();
        let mut x = 0.0;
        while x <= canvas.width {
            path.move_to((x, 0.0));
            path.line_to((x, canvas.height));
            x += GRID_STEP;
        }
        let mut y = 0.0;
        while y <= canvas.height {
            path.move_to((0.0, y));
            path.line_to((canvas.width, y));
            y += GRID_STEP;
        }
        if let Some(path) = to_skia_path(&path) {
            let paint = solid(Color::BLACK, GRID_ALPHA);
            let stroke = Stroke {
                width: 1.0,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }

    fn render_item(&self, pixmap: &mut Pixmap, item: &DrawItem, bitmaps: &BitmapStore, transform: Transform) {
        let Some(bitmap) = bitmaps.get(item.source) else {
            log::warn!("Bitmap for {} is not decoded yet, skipping", item.source);
            return;
        };
        let opacity = clamp(item.opacity, 0.0, 1.0) as f32;
        let radius = effective_radius(item.radius, item.rect.size());
        let Some(outline) = rounded_rect_path(item.rect, radius) else {
            return;
        };

        if item.shadow.is_visible() {
            draw_shadow(pixmap, &outline, transform, &item.shadow, opacity);
            pixmap.fill_path(&outline, &solid(Color::WHITE, opacity), FillRule::Winding, transform, None);
        }

        let (bw, bh) = (f64::from(bitmap.width()), f64::from(bitmap.height()));
        let image_to_canvas = Transform::from_row(
            (item.rect.width() / bw) as f32,
            0.0,
            0.0,
            (item.rect.height() / bh) as f32,
            item.rect.x0 as f32,
            item.rect.y0 as f32,
        );
        let paint = Paint {
            shader: Pattern::new(
                bitmap.pixmap().as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bilinear,
                opacity,
                image_to_canvas,
            ),
            anti_alias: true,
            ..Paint::default()
        };

        let mask = item.clip.and_then(|clip| {
            let mut mask = Mask::new(pixmap.width(), pixmap.height())?;
            let clip_path = rounded_rect_path(clip, 0.0)?;
            mask.fill_path(&clip_path, FillRule::Winding, true, transform);
            Some(mask)
        });
        pixmap.fill_path(&outline, &paint, FillRule::Winding, transform, mask.as_ref());
    }

    fn render_guides(&self, pixmap: &mut Pixmap, guides: &[Line], transform: Transform) {
        if guides.is_empty() {
            return;
        }
        let mut path = BezPath::new();
        for guide in guides {
            path.move_to(guide.p0);
            path.line_to(guide.p1);
        }
        let Some(path) = to_skia_path(&path) else {
            return;
        };
        let stroke = Stroke {
            width: 1.0,
            dash: StrokeDash::new(GUIDE_DASH.to_vec(), 0.0),
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &solid(Color::BLACK, GUIDE_ALPHA), &stroke, transform, None);
    }

    fn render_selection(&self, pixmap: &mut Pixmap, rect: Rect, ui_scale: f64, transform: Transform) {
        let ui_scale = if ui_scale > 0.0 { ui_scale } else { 1.0 };
        if let Some(outline) = rounded_rect_path(rect, 0.0) {
            let stroke = Stroke {
                width: (SELECTION_WIDTH / ui_scale) as f32,
                ..Stroke::default()
            };
            pixmap.stroke_path(&outline, &solid(Color::BLACK, 1.0), &stroke, transform, None);
        }

        let size = HANDLE_SIZE / ui_scale;
        let paint = solid(HANDLE_COLOR, 1.0);
        for handle in handles(rect) {
            let square = Rect::from_center_size(handle.position, (size, size));
            if let Some(path) = rounded_rect_path(square, 0.0) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
            }
        }
    }

    fn render_watermark(&self, pixmap: &mut Pixmap, config: &WatermarkConfig) {
        if config.visible_text().is_none() {
            return;
        }
        let config = config.clone().sanitized();
        let Some(text) = config.visible_text() else {
            return;
        };
        let output = kurbo::Size::new(f64::from(pixmap.width()), f64::from(pixmap.height()));
        let width = self.font.measure(text, config.font_size);
        let Some(layout) = config.layout(output, width) else {
            return;
        };
        let paint = solid(config.color.with_opacity(config.opacity).into(), 1.0);
        let base = affine_to_transform(layout.transform);

        for run in &layout.runs {
            let x = run.origin.x + run.align.offset(width);
            let Some(path) = self.font.text_path(text, config.font_size, x) else {
                continue;
            };
            let transform = base.pre_translate(0.0, run.origin.y as f32);
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
    }
}

impl Renderer for SkiaRenderer {
    fn render(&mut self, ctx: &RenderContext<'_>, bitmaps: &BitmapStore) -> RenderResult<Frame> {
        let (width, height) = ctx.output;
        if width == 0 || height == 0 || ctx.scene.is_empty() {
            return Ok(Frame::empty());
        }
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
        let transform = affine_to_transform(ctx.transform);

        if let Some(background) = rounded_rect_path(Rect::from_origin_size((0.0, 0.0), ctx.scene.canvas), 0.0) {
            pixmap.fill_path(
                &background,
                &solid(ctx.scene.background, 1.0),
                FillRule::Winding,
                transform,
                None,
            );
        }

        if ctx.show_grid {
            self.render_grid(&mut pixmap, ctx, transform);
        }

        for item in &ctx.scene.items {
            self.render_item(&mut pixmap, item, bitmaps, transform);
        }

        self.render_guides(&mut pixmap, ctx.guides, transform);

        if let Some(rect) = ctx.selection {
            self.render_selection(&mut pixmap, rect, ctx.ui_scale, transform);
        }

        // output pixel space, independent of the content transform
        self.render_watermark(&mut pixmap, &ctx.scene.watermark);

        log::debug!("Rendered {} items into {}x{}", ctx.scene.items.len(), width, height);
        Ok(Frame::from_pixmap(pixmap))
    }
}

fn solid(color: Color, opacity: f32) -> Paint<'static> {
    let rgba = color.to_rgba8();
    let alpha = (f32::from(rgba.a) * clamp(f64::from(opacity), 0.0, 1.0) as f32).round() as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba.r, rgba.g, rgba.b, alpha);
    paint.anti_alias = true;
    paint
}

fn affine_to_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Convert a kurbo path to a tiny-skia path.
fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => builder.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => builder.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

/// Path of `rect` with corner `radius` (0 gives a plain rectangle).
fn rounded_rect_path(rect: Rect, radius: f64) -> Option<Path> {
    if radius > 0.0 {
        to_skia_path(&rect.to_rounded_rect(radius).to_path(0.1))
    } else {
        to_skia_path(&rect.to_path(0.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::Bitmap;
    use crate::renderer::Scene;
    use collage_core::watermark::{Anchor, WatermarkMode};
    use collage_core::{Shadow, SourceId, ViewState};
    use kurbo::{Point, Size};

    fn solid_bitmap(w: u32, h: u32, rgba: [u8; 4]) -> Bitmap {
        let pixels: Vec<u8> = rgba.iter().copied().cycle().take((w * h * 4) as usize).collect();
        Bitmap::from_rgba8(w, h, &pixels).unwrap()
    }

    fn red_scene() -> (Scene, BitmapStore) {
        let mut store = BitmapStore::new();
        store.insert(SourceId(1), solid_bitmap(10, 10, [255, 0, 0, 255]));
        let mut scene = Scene::new(Size::new(300.0, 200.0));
        scene.items.push(DrawItem {
            source: SourceId(1),
            rect: Rect::new(100.0, 50.0, 200.0, 150.0),
            clip: None,
            radius: 0.0,
            opacity: 1.0,
            shadow: Shadow::none(),
        });
        (scene, store)
    }

    #[test]
    fn test_empty_scene_gives_empty_frame() {
        let mut renderer = SkiaRenderer::new().unwrap();
        let scene = Scene::new(Size::ZERO);
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &BitmapStore::new()).unwrap();
        assert!(frame.is_empty());
        assert_eq!((frame.width(), frame.height()), (0, 0));
    }

    #[test]
    fn test_background_and_item() {
        let (scene, store) = red_scene();
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        assert_eq!(frame.pixel(5, 5), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(150, 100), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_export_scale_doubles_size() {
        let (scene, store) = red_scene();
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 2.0), &store).unwrap();
        assert_eq!((frame.width(), frame.height()), (600, 400));
        assert_eq!(frame.pixel(300, 200), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(190, 90), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_missing_bitmap_is_skipped() {
        let (scene, _) = red_scene();
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &BitmapStore::new()).unwrap();
        assert_eq!(frame.pixel(150, 100), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_opacity_blends_with_background() {
        let (mut scene, store) = red_scene();
        scene.items[0].opacity = 0.5;
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        let [r, g, b, a] = frame.pixel(150, 100).unwrap();
        assert_eq!((r, a), (255, 255));
        assert!((120..=136).contains(&g) && (120..=136).contains(&b), "{g} {b}");
    }

    #[test]
    fn test_rounded_corner_is_clipped() {
        let (mut scene, store) = red_scene();
        scene.items[0].radius = 40.0;
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        assert_eq!(frame.pixel(101, 51), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(150, 100), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_clip_limits_cover_overflow() {
        let (mut scene, store) = red_scene();
        scene.items[0].clip = Some(Rect::new(120.0, 50.0, 180.0, 150.0));
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        assert_eq!(frame.pixel(110, 100), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(150, 100), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_z_order_top_item_wins() {
        let (mut scene, mut store) = red_scene();
        store.insert(SourceId(2), solid_bitmap(4, 4, [0, 0, 255, 255]));
        scene.items.push(DrawItem {
            source: SourceId(2),
            rect: Rect::new(150.0, 100.0, 250.0, 190.0),
            ..scene.items[0]
        });
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        assert_eq!(frame.pixel(175, 125), Some([0, 0, 255, 255]));
        assert_eq!(frame.pixel(125, 75), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_selection_and_guides_drawn() {
        let (scene, store) = red_scene();
        let guides = [Line::new(Point::new(50.0, 0.0), Point::new(50.0, 200.0))];
        let ctx = RenderContext::export(&scene, 1.0)
            .with_guides(&guides)
            .with_selection(Some(Rect::new(100.0, 50.0, 200.0, 150.0)));
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&ctx, &store).unwrap();
        // handle square at the top-left corner
        assert_eq!(frame.pixel(100, 50), Some([0x11, 0x18, 0x27, 255]));
        // first dash of the guide
        let [r, _, _, _] = frame.pixel(50, 2).unwrap();
        assert!(r < 200);
    }

    fn dark_pixels(frame: &Frame) -> usize {
        frame.to_rgba8().chunks_exact(4).filter(|p| p[0] < 128).count()
    }

    #[test]
    fn test_watermark_is_output_space() {
        let mut scene = Scene::new(Size::new(300.0, 200.0));
        scene.watermark = WatermarkConfig {
            enabled: true,
            text: "Hi".into(),
            opacity: 1.0,
            mode: WatermarkMode::Anchored {
                anchor: Anchor::TopLeft,
            },
            ..WatermarkConfig::default()
        };
        let mut renderer = SkiaRenderer::new().unwrap();
        let store = BitmapStore::new();
        let one = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        let two = renderer.render(&RenderContext::export(&scene, 2.0), &store).unwrap();
        let (a, b) = (dark_pixels(&one), dark_pixels(&two));
        assert!(a > 20);
        // same apparent size: ink area does not grow with the output scale
        assert!((a as f64 - b as f64).abs() <= a as f64 * 0.1, "{a} vs {b}");
    }

    #[test]
    fn test_tiled_watermark_with_raw_negative_spacing() {
        let mut scene = Scene::new(Size::new(300.0, 200.0));
        scene.watermark = WatermarkConfig {
            enabled: true,
            text: "Hi".into(),
            font_size: 32.0,
            opacity: 1.0,
            mode: WatermarkMode::Tiled { spacing: -32.0 },
            ..WatermarkConfig::default()
        };
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer
            .render(&RenderContext::export(&scene, 1.0), &BitmapStore::new())
            .unwrap();
        assert!(dark_pixels(&frame) > 20);
    }

    #[test]
    fn test_preview_applies_view_transform() {
        let (scene, store) = red_scene();
        let mut view = ViewState::new();
        view.scale = 0.5;
        view.offset = kurbo::Vec2::new(20.0, 10.0);
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::preview(&scene, &view), &store).unwrap();
        assert_eq!((frame.width(), frame.height()), (150, 100));
        // item lands at 70..120 x 35..85
        assert_eq!(frame.pixel(95, 60), Some([255, 0, 0, 255]));
        assert_eq!(frame.pixel(60, 60), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(125, 60), Some([255, 255, 255, 255]));
        // left of the panned canvas
        assert_eq!(frame.pixel(5, 50), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_grid_only_in_preview() {
        let mut scene = Scene::new(Size::new(300.0, 200.0));
        scene.show_grid = true;
        let mut renderer = SkiaRenderer::new().unwrap();
        let store = BitmapStore::new();
        let line_red = |frame: &Frame| {
            let [a, ..] = frame.pixel(49, 120).unwrap();
            let [b, ..] = frame.pixel(50, 120).unwrap();
            a.min(b)
        };

        let preview = renderer
            .render(&RenderContext::preview(&scene, &ViewState::new()), &store)
            .unwrap();
        assert!(line_red(&preview) < 250);
        assert_eq!(preview.pixel(75, 120), Some([255, 255, 255, 255]));

        let export = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        assert_eq!(line_red(&export), 255);
    }

    #[test]
    fn test_shadow_darkens_below_item() {
        let (mut scene, store) = red_scene();
        scene.items[0].shadow = Shadow::default();
        let mut renderer = SkiaRenderer::new().unwrap();
        let frame = renderer.render(&RenderContext::export(&scene, 1.0), &store).unwrap();
        let [r, g, _, _] = frame.pixel(150, 155).unwrap();
        assert!(r < 255 && g < 255);
        assert_eq!(frame.pixel(150, 100), Some([255, 0, 0, 255]));
    }
}
