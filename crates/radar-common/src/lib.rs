//! Common types shared across the radar composite services.

pub mod elevation;
pub mod error;
pub mod timestamp;

pub use elevation::ElevationAngle;
pub use error::{RadarError, RadarResult};
pub use timestamp::ScanTime;
