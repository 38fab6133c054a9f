//! Lowest-valid-altitude compositing of multi-elevation radar scans.
//!
//! Decoded per-elevation reflectivity grids are folded, lowest angle first,
//! into a single composite where each cell holds the value from the lowest
//! elevation that has valid data there. Layers stream through one at a time
//! so peak memory stays at one layer plus the composite.

pub mod compose;
pub mod decoder;
pub mod error;
pub mod grid;
pub mod qc;

pub use compose::{compose, CompositeBuilder, QcRange};
pub use decoder::ScanDecoder;
pub use error::{MosaicError, MosaicResult};
pub use grid::{Composite, DecodedScan, Grid2d};
pub use qc::apply_quality_control;
