//! Collage Core Library
//!
//! Platform-agnostic layout, item model and interaction logic for the
//! collage compositor. Nothing in here touches pixels.

pub mod color;
pub mod document;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod item;
pub mod layout;
pub mod session;
pub mod settings;
pub mod snap;
pub mod source;
pub mod view;
pub mod watermark;

pub use color::SerializableColor;
pub use document::{ItemStack, LayerEntry};
pub use error::{CoreError, CoreResult};
pub use geometry::{FitMode, clamp, fit_rect_contain, fit_rect_cover, scale_to_fit};
pub use interaction::{Effect, HandleKind, InputEvent, Interaction, InteractionState, Key, Transition, step};
pub use item::{Appearance, CompositableItem, ItemId, MIN_SIZE, Shadow};
pub use layout::{
    GridParams, Layout, LayoutInput, LayoutMode, OutputBudget, Placement, ReferencePolicy, StripParams,
    auto_arrange, compute_layout,
};
pub use session::{Editor, StitchItem, StitchSession};
pub use settings::{CanvasSettings, ExportFormat, ExportScale, ExportSettings};
pub use snap::{SnapResult, SnapSettings};
pub use source::{DisplayHandle, HandleReleaser, RecordingReleaser, ReleasePolicy, SourceId, SourceRegistry};
pub use view::ViewState;
pub use watermark::{Anchor, TextAlign, WatermarkConfig, WatermarkLayout, WatermarkMode};
