//! Renderer trait abstraction and the per-frame render context.

use crate::bitmap::BitmapStore;
use crate::frame::Frame;
use collage_core::layout::{Layout, Placement};
use collage_core::{CompositableItem, Editor, Shadow, SourceId, StitchSession, ViewState, WatermarkConfig};
use kurbo::{Affine, Line, Rect, Size};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
    #[error("Font error: {0}")]
    Font(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// One bitmap draw with its appearance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub source: SourceId,
    /// Destination rectangle in canvas units.
    pub rect: Rect,
    /// Optional clip rectangle in canvas units.
    pub clip: Option<Rect>,
    pub radius: f64,
    pub opacity: f64,
    pub shadow: Shadow,
}

impl DrawItem {
    /// Draw for a freeform item at its freeform `placement`.
    pub fn from_item(item: &CompositableItem, placement: &Placement) -> Self {
        Self {
            source: item.source,
            rect: placement.rect,
            clip: placement.clip,
            radius: item.appearance.radius,
            opacity: item.appearance.opacity,
            shadow: item.appearance.shadow,
        }
    }

    /// Plain draw for a stitched placement.
    pub fn from_placement(source: SourceId, placement: &Placement) -> Self {
        Self {
            source,
            rect: placement.rect,
            clip: placement.clip,
            radius: 0.0,
            opacity: 1.0,
            shadow: Shadow::none(),
        }
    }
}

/// Everything that determines the pixels of a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Content bounds in canvas units.
    pub canvas: Size,
    pub background: Color,
    /// Draws, bottom to top.
    pub items: Vec<DrawItem>,
    pub watermark: WatermarkConfig,
    /// Draw the background grid in previews. Exports never show it.
    pub show_grid: bool,
}

impl Scene {
    pub fn new(canvas: Size) -> Self {
        Self {
            canvas,
            background: Color::WHITE,
            items: Vec::new(),
            watermark: WatermarkConfig::default(),
            show_grid: false,
        }
    }

    /// Scene of the freeform editor, in stack order.
    pub fn from_editor(editor: &Editor) -> Self {
        let layout = editor.layout();
        Self {
            canvas: layout.size,
            background: editor.canvas.background.into(),
            items: editor
                .items
                .iter()
                .zip(&layout.placements)
                .map(|(item, placement)| DrawItem::from_item(item, placement))
                .collect(),
            watermark: editor.watermark.clone(),
            show_grid: editor.canvas.show_grid,
        }
    }

    /// Scene of a stitch session for an already computed `layout`.
    pub fn from_stitch(session: &StitchSession, layout: &Layout) -> Self {
        Self {
            canvas: layout.size,
            background: session.background.into(),
            items: session
                .items()
                .iter()
                .zip(&layout.placements)
                .map(|(item, placement)| DrawItem::from_placement(item.source, placement))
                .collect(),
            watermark: session.watermark.clone(),
            show_grid: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.canvas.width <= 0.0 || self.canvas.height <= 0.0
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    /// Output size in pixels.
    pub output: (u32, u32),
    /// Canvas-to-output transform.
    pub transform: Affine,
    /// Zoom used to keep overlay strokes a constant screen width.
    pub ui_scale: f64,
    pub show_grid: bool,
    /// Alignment guides in canvas units.
    pub guides: &'a [Line],
    /// Selected rectangle in canvas units.
    pub selection: Option<Rect>,
}

impl<'a> RenderContext<'a> {
    /// Render `scene` at a uniform output `scale` (export).
    pub fn export(scene: &'a Scene, scale: f64) -> Self {
        Self {
            scene,
            output: scaled_size(scene.canvas, scale),
            transform: Affine::scale(scale),
            ui_scale: scale,
            show_grid: false,
            guides: &[],
            selection: None,
        }
    }

    /// Render `scene` through the interactive view transform (preview).
    ///
    /// The output covers the canvas at the current zoom; the pan offset
    /// shifts the content inside it. The grid follows the scene.
    pub fn preview(scene: &'a Scene, view: &ViewState) -> Self {
        Self {
            scene,
            output: scaled_size(scene.canvas, view.scale),
            transform: view.transform(),
            ui_scale: view.scale,
            show_grid: scene.show_grid,
            guides: &[],
            selection: None,
        }
    }

    /// Preview of `editor` with its live guides and selection outline.
    pub fn editor_preview(scene: &'a Scene, editor: &'a Editor) -> Self {
        Self::preview(scene, &editor.view)
            .with_guides(editor.guides())
            .with_selection(editor.selected_item().map(|item| item.rect()))
    }

    /// Set the guides to draw.
    pub fn with_guides(mut self, guides: &'a [Line]) -> Self {
        self.guides = guides;
        self
    }

    /// Set the selection outline.
    pub fn with_selection(mut self, rect: Option<Rect>) -> Self {
        self.selection = rect;
        self
    }
}

/// `round(size * scale)` in whole pixels.
pub fn scaled_size(size: Size, scale: f64) -> (u32, u32) {
    let px = |v: f64| {
        let v = (v * scale).round();
        if v.is_finite() && v > 0.0 { v as u32 } else { 0 }
    };
    (px(size.width), px(size.height))
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Rasterize one frame.
    ///
    /// Items whose bitmap is not in `bitmaps` are skipped.
    fn render(&mut self, ctx: &RenderContext<'_>, bitmaps: &BitmapStore) -> RenderResult<Frame>;
}
