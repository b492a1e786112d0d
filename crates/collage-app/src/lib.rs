//! Collage Application
//!
//! Command-line shell over the core and render crates: reads a job file
//! and flags, composes the inputs and writes the export.

pub mod cli;
mod compose;
pub mod config;
mod error;

pub use cli::Args;
pub use compose::{ComposeOutcome, Composed, LogReleaser, compose, output_path, run};
pub use config::{Composition, Job};
pub use error::{AppError, AppResult};
