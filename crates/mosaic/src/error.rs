//! Error types for compositing.

use radar_common::ElevationAngle;
use thiserror::Error;

/// Result type alias using MosaicError.
pub type MosaicResult<T> = Result<T, MosaicError>;

#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("Grid data length {found} does not match {ny}x{nx} shape")]
    LengthMismatch { ny: usize, nx: usize, found: usize },

    #[error("Layer shape {found:?} does not match composite shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Layer at {next} folded after {previous}; layers must arrive lowest first")]
    OutOfOrderLayer {
        previous: ElevationAngle,
        next: ElevationAngle,
    },

    #[error("No layers available to composite")]
    NoLayers,

    #[error("Failed to decode scan file: {0}")]
    Decode(String),
}
