//! Seam to the external binary-format decoder.

use std::path::Path;

use crate::error::MosaicError;
use crate::grid::DecodedScan;

/// Decodes a local scan file into grids.
///
/// Implemented outside this crate (the decode library wrapper). A decode
/// failure means "this elevation unavailable for this cycle", not a fatal
/// composite error.
pub trait ScanDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedScan, MosaicError>;
}
