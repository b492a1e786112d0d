//! Command-line arguments and how they override a job file.

use crate::config::{Composition, Job};
use crate::error::{AppError, AppResult};
use clap::{Parser, ValueEnum};
use collage_core::settings::parse_number;
use collage_core::{
    Anchor, CanvasSettings, ExportFormat, ExportScale, FitMode, GridParams, LayoutMode, OutputBudget,
    ReferencePolicy, SerializableColor, StripParams, WatermarkMode,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Freeform,
    Horizontal,
    Vertical,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReferenceArg {
    First,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnchorArg {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
    Tiled,
}

/// Compose images into a collage and export it as PNG or JPEG.
#[derive(Debug, Parser)]
#[command(name = "collage", version, about, allow_negative_numbers = true)]
pub struct Args {
    /// Input images (appended after the job file's inputs)
    pub inputs: Vec<PathBuf>,

    /// JSON job file
    #[arg(long, short = 'j')]
    pub job: Option<PathBuf>,

    /// Output file or directory
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Composition mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Freeform canvas size, e.g. 1200x800
    #[arg(long)]
    pub canvas: Option<String>,

    /// Background color (#rgb, #rrggbb, #rrggbbaa or "transparent")
    #[arg(long)]
    pub background: Option<String>,

    /// Tile freeform items in a grid before export
    #[arg(long)]
    pub arrange: bool,

    /// Show the background grid in the preview
    #[arg(long)]
    pub grid: bool,

    /// Also write a PNG of the editor view (freeform only)
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Strip reference size policy
    #[arg(long, value_enum)]
    pub reference: Option<ReferenceArg>,

    /// Strip reference from the image at this index
    #[arg(long, conflicts_with = "reference")]
    pub reference_index: Option<usize>,

    /// Gap between stitched images
    #[arg(long)]
    pub gap: Option<String>,

    /// Stretch strip images to the reference instead of keeping aspect
    #[arg(long)]
    pub stretch: bool,

    /// Grid columns
    #[arg(long)]
    pub cols: Option<usize>,

    /// Crop grid images to fill their cells
    #[arg(long)]
    pub cover: bool,

    /// Maximum output width (0 = unbounded)
    #[arg(long)]
    pub max_width: Option<String>,

    /// Maximum output height (0 = unbounded)
    #[arg(long)]
    pub max_height: Option<String>,

    /// Export scale (presets 1, 2, 3; anything else is a custom value >= 0.25)
    #[arg(long)]
    pub scale: Option<String>,

    /// Output format; inferred from the output extension when omitted
    #[arg(long)]
    pub format: Option<String>,

    /// JPEG quality in [0, 1]
    #[arg(long)]
    pub quality: Option<String>,

    /// Watermark text (enables the watermark)
    #[arg(long)]
    pub watermark: Option<String>,

    /// Watermark placement
    #[arg(long, value_enum)]
    pub watermark_at: Option<AnchorArg>,

    /// Watermark rotation in degrees
    #[arg(long)]
    pub watermark_rotation: Option<String>,

    /// Watermark opacity in [0, 1]
    #[arg(long)]
    pub watermark_opacity: Option<String>,

    /// Print the session status line
    #[arg(long)]
    pub status: bool,
}

const SCALE_PRESETS: [f64; 3] = [1.0, 2.0, 3.0];

/// Parse `WxH`.
fn parse_size(input: &str) -> AppResult<(f64, f64)> {
    let (w, h) = input
        .split_once(['x', 'X'])
        .ok_or_else(|| AppError::InvalidArgument(format!("canvas size `{input}`, expected WxH")))?;
    Ok((parse_number(w).unwrap_or(0.0), parse_number(h).unwrap_or(0.0)))
}

fn strip_params(current: &LayoutMode) -> StripParams {
    match current {
        LayoutMode::HorizontalStrip(p) | LayoutMode::VerticalStrip(p) => *p,
        _ => StripParams::default(),
    }
}

fn grid_params(current: &LayoutMode) -> GridParams {
    match current {
        LayoutMode::Grid(p) => *p,
        _ => GridParams::default(),
    }
}

impl Args {
    /// Build the job: the job file (if any) with these flags applied on top.
    pub fn into_job(self) -> AppResult<Job> {
        let mut job = match &self.job {
            Some(path) => Job::load(path)?,
            None => Job::default(),
        };
        self.apply(&mut job)?;
        Ok(job.sanitized())
    }

    fn apply(&self, job: &mut Job) -> AppResult<()> {
        job.inputs.extend(self.inputs.iter().cloned());
        if self.output.is_some() {
            job.output.clone_from(&self.output);
        }
        if self.preview.is_some() {
            job.preview.clone_from(&self.preview);
        }
        self.apply_composition(job)?;
        self.apply_watermark(job);
        self.apply_export(job)
    }

    fn apply_composition(&self, job: &mut Job) -> AppResult<()> {
        let current_layout = match &job.composition {
            Composition::Stitch { layout, .. } => *layout,
            Composition::Freeform { .. } => LayoutMode::default(),
        };
        match self.mode {
            Some(ModeArg::Freeform) if !matches!(job.composition, Composition::Freeform { .. }) => {
                job.composition = Composition::default();
            }
            Some(ModeArg::Horizontal) => {
                set_layout(job, LayoutMode::HorizontalStrip(strip_params(&current_layout)));
            }
            Some(ModeArg::Vertical) => {
                set_layout(job, LayoutMode::VerticalStrip(strip_params(&current_layout)));
            }
            Some(ModeArg::Grid) => set_layout(job, LayoutMode::Grid(grid_params(&current_layout))),
            _ => {}
        }

        let background = self
            .background
            .as_deref()
            .map(|bg| SerializableColor::parse_or(bg, SerializableColor::black()));

        match &mut job.composition {
            Composition::Freeform { canvas, auto_arrange } => {
                if let Some(size) = &self.canvas {
                    let (width, height) = parse_size(size)?;
                    *canvas = CanvasSettings {
                        width,
                        height,
                        ..*canvas
                    };
                }
                if let Some(bg) = background {
                    canvas.background = bg;
                }
                *auto_arrange |= self.arrange;
                canvas.show_grid |= self.grid;
            }
            Composition::Stitch {
                layout,
                budget,
                background: stitch_bg,
            } => {
                if let Some(bg) = background {
                    *stitch_bg = bg;
                }
                if self.max_width.is_some() || self.max_height.is_some() {
                    let number = |v: &Option<String>, current: f64| {
                        v.as_deref().map_or(current, |s| parse_number(s).unwrap_or(0.0))
                    };
                    *budget = OutputBudget::new(
                        number(&self.max_width, budget.max_width),
                        number(&self.max_height, budget.max_height),
                    );
                }
                self.apply_layout(layout);
            }
        }
        Ok(())
    }

    fn apply_layout(&self, layout: &mut LayoutMode) {
        let gap = self.gap.as_deref().map(|g| parse_number(g).unwrap_or(0.0));
        match layout {
            LayoutMode::HorizontalStrip(params) | LayoutMode::VerticalStrip(params) => {
                if let Some(reference) = self.reference {
                    params.reference = match reference {
                        ReferenceArg::First => ReferencePolicy::First,
                        ReferenceArg::Max => ReferencePolicy::Max,
                        ReferenceArg::Min => ReferencePolicy::Min,
                    };
                }
                if let Some(index) = self.reference_index {
                    params.reference = ReferencePolicy::Designated(index);
                }
                if let Some(gap) = gap {
                    params.gap = gap;
                }
                if self.stretch {
                    params.keep_aspect = false;
                }
                *params = params.sanitized();
            }
            LayoutMode::Grid(params) => {
                if let Some(cols) = self.cols {
                    params.cols = cols;
                }
                if let Some(gap) = gap {
                    params.gap = gap;
                }
                if self.cover {
                    params.fit = FitMode::Cover;
                }
                *params = params.sanitized();
            }
            LayoutMode::Freeform { .. } => {}
        }
    }

    fn apply_watermark(&self, job: &mut Job) {
        let watermark = &mut job.watermark;
        if let Some(text) = &self.watermark {
            watermark.text.clone_from(text);
            watermark.enable_default_text();
        }
        match self.watermark_at {
            Some(AnchorArg::Tiled) => {
                if !matches!(watermark.mode, WatermarkMode::Tiled { .. }) {
                    watermark.mode = WatermarkMode::Tiled { spacing: 0.0 };
                }
            }
            Some(at) => {
                let anchor = match at {
                    AnchorArg::TopLeft => Anchor::TopLeft,
                    AnchorArg::TopRight => Anchor::TopRight,
                    AnchorArg::BottomLeft => Anchor::BottomLeft,
                    AnchorArg::Center => Anchor::Center,
                    AnchorArg::BottomRight | AnchorArg::Tiled => Anchor::BottomRight,
                };
                watermark.mode = WatermarkMode::Anchored { anchor };
            }
            None => {}
        }
        if let Some(rotation) = &self.watermark_rotation {
            watermark.rotation_deg = parse_number(rotation).unwrap_or(0.0);
        }
        if let Some(opacity) = &self.watermark_opacity {
            watermark.opacity = parse_number(opacity).unwrap_or(0.0);
        }
    }

    fn apply_export(&self, job: &mut Job) -> AppResult<()> {
        if let Some(scale) = &self.scale {
            let value = parse_number(scale).unwrap_or(1.0);
            job.export.scale = if SCALE_PRESETS.contains(&value) {
                ExportScale::Preset(value)
            } else {
                ExportScale::Custom(value)
            };
        }

        let from_output = job
            .output
            .as_ref()
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension);
        if let Some(format) = &self.format {
            job.export.format = ExportFormat::from_extension(format)
                .ok_or_else(|| AppError::InvalidArgument(format!("unknown format `{format}`")))?;
        } else if let Some(format) = from_output {
            job.export.format = format;
        }

        if let Some(quality) = &self.quality {
            job.export.jpeg_quality = parse_number(quality).unwrap_or(0.0);
        }
        Ok(())
    }
}

fn set_layout(job: &mut Job, mode: LayoutMode) {
    match &mut job.composition {
        Composition::Stitch { layout, .. } => *layout = mode,
        Composition::Freeform { .. } => {
            job.composition = Composition::Stitch {
                layout: mode,
                budget: OutputBudget::unbounded(),
                background: SerializableColor::white(),
            };
        }
    }
}
