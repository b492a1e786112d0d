//! Collage Render Library
//!
//! Renderer abstraction and the tiny-skia CPU compositor used for both the
//! interactive preview and PNG/JPEG export.

pub mod bitmap;
pub mod export;
mod frame;
mod renderer;
mod shadow;
mod skia_impl;
pub mod text;

pub use bitmap::{Bitmap, BitmapStore, DecodeReport, decode_all, decode_image};
pub use export::{ExportedImage, encode, encode_jpeg, encode_png, export_at_scale, export_composition};
pub use frame::Frame;
pub use renderer::{DrawItem, RenderContext, RenderError, RenderResult, Renderer, Scene, scaled_size};
pub use skia_impl::{GRID_STEP, SkiaRenderer};
