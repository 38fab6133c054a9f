//! Error types shared across the radar composite services.

use thiserror::Error;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

#[derive(Debug, Error)]
pub enum RadarError {
    #[error("Invalid scan timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid elevation angle: {0}")]
    InvalidElevation(f64),
}
