//! Core error type.

use thiserror::Error;

/// Errors raised by the compositing core.
///
/// Almost everything in the core recovers locally (invalid numbers fall
/// back to defaults, empty layouts produce an empty canvas). The only
/// hard failure is an image that has no usable size.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// A source image reported a zero or non-finite size.
    #[error("Degenerate image size {width}x{height}")]
    DegenerateImage { width: f64, height: f64 },
    /// A referenced item does not exist.
    #[error("Unknown item {0}")]
    UnknownItem(u64),
    /// A referenced source image was never registered or was released.
    #[error("Unknown source src-{0}")]
    UnknownSource(u64),
    /// An index is outside the item sequence.
    #[error("Index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Check that a natural image size is usable.
pub fn validate_natural_size(width: f64, height: f64) -> CoreResult<kurbo::Size> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(kurbo::Size::new(width, height))
    } else {
        Err(CoreError::DegenerateImage { width, height })
    }
}
