//! Layout engines: map an ordered list of images to placement rectangles.
//!
//! Every engine is a pure function of the image order and its parameters.
//! Nothing is cached between calls; the stitch variants recompute the whole
//! layout whenever the order or a parameter changes.

use crate::document::ItemStack;
use crate::geometry::{FitMode, finite_or, non_degenerate, scale_to_fit};
use crate::item::MIN_SIZE;
use kurbo::{Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Largest canvas dimension most rasterizers accept.
pub const RASTER_LIMIT: f64 = 16384.0;

/// Margin used by freeform auto-arrange.
pub const AUTO_ARRANGE_GAP: f64 = 20.0;

/// How the reference dimension of a strip is chosen.
///
/// The stitcher front-ends disagree here (first image, designated image,
/// largest image), so the choice is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Cross-axis size of the first image.
    #[default]
    First,
    /// Largest cross-axis size.
    Max,
    /// Smallest cross-axis size.
    Min,
    /// Cross-axis size of the image at this index (falls back to `First`).
    Designated(usize),
    /// A fixed size in pixels.
    Explicit(f64),
}

impl ReferencePolicy {
    /// Resolve the reference from the images' cross-axis sizes.
    pub fn resolve(self, cross: &[f64]) -> f64 {
        let first = cross.first().copied().unwrap_or(1.0);
        let value = match self {
            ReferencePolicy::First => first,
            ReferencePolicy::Max => cross.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ReferencePolicy::Min => cross.iter().copied().fold(f64::INFINITY, f64::min),
            ReferencePolicy::Designated(index) => cross.get(index).copied().unwrap_or(first),
            ReferencePolicy::Explicit(px) => px,
        };
        non_degenerate(value)
    }
}

/// Parameters of a horizontal or vertical strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripParams {
    pub reference: ReferencePolicy,
    /// Space between neighbouring images (>= 0).
    pub gap: f64,
    /// Scale uniformly to the reference; otherwise only the cross axis is stretched.
    pub keep_aspect: bool,
}

impl Default for StripParams {
    fn default() -> Self {
        Self {
            reference: ReferencePolicy::First,
            gap: 0.0,
            keep_aspect: true,
        }
    }
}

impl StripParams {
    /// Strip without gaps, as in the two-image stitcher.
    pub fn seamless(reference: ReferencePolicy) -> Self {
        Self {
            reference,
            gap: 0.0,
            keep_aspect: true,
        }
    }

    pub fn sanitized(self) -> Self {
        Self {
            gap: finite_or(self.gap, 0.0).max(0.0),
            ..self
        }
    }
}

/// Parameters of the grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Number of columns (>= 1).
    pub cols: usize,
    /// Explicit cell size; derived from the first image when `None`.
    pub cell: Option<Size>,
    /// Space between cells (>= 0).
    pub gap: f64,
    pub fit: FitMode,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            cols: 2,
            cell: None,
            gap: 0.0,
            fit: FitMode::Contain,
        }
    }
}

impl GridParams {
    pub fn sanitized(self) -> Self {
        Self {
            cols: self.cols.max(1),
            cell: self.cell.map(|c| Size::new(non_degenerate(c.width), non_degenerate(c.height))),
            gap: finite_or(self.gap, 0.0).max(0.0),
            fit: self.fit,
        }
    }
}

/// Layout strategy with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// Items keep their explicit geometry on a fixed canvas.
    Freeform { canvas: Size },
    HorizontalStrip(StripParams),
    VerticalStrip(StripParams),
    Grid(GridParams),
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::HorizontalStrip(StripParams::default())
    }
}

/// One image to lay out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInput {
    /// Natural size in pixels.
    pub natural: Size,
    /// Explicit geometry, used by the freeform mode only.
    pub rect: Option<Rect>,
}

impl LayoutInput {
    pub fn natural(natural: Size) -> Self {
        Self { natural, rect: None }
    }
}

/// Where one image is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Destination rectangle of the bitmap.
    pub rect: Rect,
    /// Clip rectangle (grid cells); `None` draws unclipped.
    pub clip: Option<Rect>,
}

/// Result of a layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    /// One placement per input, in input order.
    pub placements: Vec<Placement>,
    /// Content bounds before any output budget.
    pub size: Size,
    /// The content is larger than [`RASTER_LIMIT`] on some axis.
    pub exceeds_raster_limit: bool,
}

impl Layout {
    fn new(placements: Vec<Placement>, size: Size) -> Self {
        let exceeds_raster_limit = size.width > RASTER_LIMIT || size.height > RASTER_LIMIT;
        if exceeds_raster_limit {
            log::warn!("Layout {}x{} exceeds the raster limit", size.width, size.height);
        }
        Self {
            placements,
            size,
            exceeds_raster_limit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Compute placements for `inputs` under `mode`.
pub fn compute_layout(mode: &LayoutMode, inputs: &[LayoutInput]) -> Layout {
    let layout = match mode {
        LayoutMode::Freeform { canvas } => freeform(*canvas, inputs),
        LayoutMode::HorizontalStrip(params) => strip(&params.sanitized(), inputs, Axis::Horizontal),
        LayoutMode::VerticalStrip(params) => strip(&params.sanitized(), inputs, Axis::Vertical),
        LayoutMode::Grid(params) => grid(&params.sanitized(), inputs),
    };
    log::debug!(
        "Computed layout: {} placements, {}x{}",
        layout.placements.len(),
        layout.size.width,
        layout.size.height
    );
    layout
}

fn freeform(canvas: Size, inputs: &[LayoutInput]) -> Layout {
    let placements = inputs
        .iter()
        .map(|input| Placement {
            rect: input
                .rect
                .unwrap_or_else(|| Rect::from_origin_size((0.0, 0.0), input.natural)),
            clip: None,
        })
        .collect();
    Layout::new(placements, canvas)
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn strip(params: &StripParams, inputs: &[LayoutInput], axis: Axis) -> Layout {
    if inputs.is_empty() {
        return Layout::default();
    }

    // (main, cross) sizes of each input along the strip direction
    let dims: Vec<(f64, f64)> = inputs
        .iter()
        .map(|input| match axis {
            Axis::Horizontal => (input.natural.width, input.natural.height),
            Axis::Vertical => (input.natural.height, input.natural.width),
        })
        .collect();
    let cross: Vec<f64> = dims.iter().map(|&(_, c)| c).collect();
    let reference = params.reference.resolve(&cross).round().max(1.0);

    let mut placements = Vec::with_capacity(inputs.len());
    let mut cursor = 0.0;
    for (i, &(main, cross)) in dims.iter().enumerate() {
        if i > 0 {
            cursor += params.gap;
        }
        // a sliver still gets one pixel
        let length = if params.keep_aspect {
            (non_degenerate(main) * reference / non_degenerate(cross)).round()
        } else {
            non_degenerate(main).round()
        }
        .max(1.0);
        let rect = match axis {
            Axis::Horizontal => Rect::new(cursor, 0.0, cursor + length, reference),
            Axis::Vertical => Rect::new(0.0, cursor, reference, cursor + length),
        };
        placements.push(Placement { rect, clip: None });
        cursor += length;
    }

    let size = match axis {
        Axis::Horizontal => Size::new(cursor, reference),
        Axis::Vertical => Size::new(reference, cursor),
    };
    Layout::new(placements, size)
}

fn grid(params: &GridParams, inputs: &[LayoutInput]) -> Layout {
    let Some(first) = inputs.first() else {
        return Layout::default();
    };
    let n = inputs.len();
    let cols = params.cols.min(n);
    let rows = n.div_ceil(cols);
    let cell = params.cell.unwrap_or(Size::new(
        non_degenerate(first.natural.width),
        non_degenerate(first.natural.height),
    ));
    let gap = params.gap;

    let placements = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let (row, col) = (i / cols, i % cols);
            let origin = Vec2::new(
                col as f64 * (cell.width + gap),
                row as f64 * (cell.height + gap),
            );
            let cell_rect = Rect::from_origin_size(origin.to_point(), cell);
            Placement {
                rect: params.fit.fit(input.natural, cell) + origin,
                clip: Some(cell_rect),
            }
        })
        .collect();

    let size = Size::new(
        cols as f64 * cell.width + (cols - 1) as f64 * gap,
        rows as f64 * cell.height + (rows - 1) as f64 * gap,
    );
    Layout::new(placements, size)
}

/// Downscale-only bound on the final output size. `0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputBudget {
    pub max_width: f64,
    pub max_height: f64,
}

impl OutputBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(max_width: f64, max_height: f64) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Uniform scale (<= 1) applied to a composition of `size`.
    pub fn scale_for(&self, size: Size) -> f64 {
        scale_to_fit(size.width, size.height, self.max_width, self.max_height)
    }

    /// Final output pixel size of a composition of `size`.
    pub fn output_size(&self, size: Size) -> (u32, u32) {
        let scale = self.scale_for(size);
        (
            (size.width * scale).round().max(0.0) as u32,
            (size.height * scale).round().max(0.0) as u32,
        )
    }
}

/// Arrange every freeform item in a near-square grid inside `canvas`.
///
/// Items are contained in their cell (never upscaled past 1x), centered,
/// and floor-clamped to [`MIN_SIZE`].
pub fn auto_arrange(stack: &mut ItemStack, canvas: Size) {
    let n = stack.len();
    if n == 0 {
        return;
    }
    let gap = AUTO_ARRANGE_GAP;
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let cell_w = (canvas.width - gap * (cols as f64 + 1.0)) / cols as f64;
    let cell_h = (canvas.height - gap * (rows as f64 + 1.0)) / rows as f64;

    let order = stack.order().to_vec();
    for (i, id) in order.into_iter().enumerate() {
        let Some(item) = stack.get_mut(id) else {
            continue;
        };
        let (row, col) = (i / cols, i % cols);
        let natural = Size::new(non_degenerate(item.natural.width), non_degenerate(item.natural.height));
        let scale = (cell_w / natural.width).min(cell_h / natural.height).min(1.0);
        item.width = (natural.width * scale).round().max(MIN_SIZE);
        item.height = (natural.height * scale).round().max(MIN_SIZE);
        item.position.x = (gap + col as f64 * (cell_w + gap) + (cell_w - item.width) / 2.0).round();
        item.position.y = (gap + row as f64 * (cell_h + gap) + (cell_h - item.height) / 2.0).round();
    }
    log::debug!("Auto-arranged {} items in {}x{} grid", n, cols, rows);
}
