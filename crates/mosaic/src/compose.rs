//! Streaming lowest-valid-altitude fill.

use std::collections::BTreeMap;
use std::path::PathBuf;

use radar_common::ElevationAngle;
use tracing::{debug, warn};

use crate::decoder::ScanDecoder;
use crate::error::MosaicError;
use crate::grid::{Composite, DecodedScan, Grid2d};
use crate::qc::{apply_quality_control, DEFAULT_VALID_MAX, DEFAULT_VALID_MIN};

/// Configured plausible-value bounds applied to every input layer.
#[derive(Debug, Clone, Copy)]
pub struct QcRange {
    pub min: f32,
    pub max: f32,
}

impl Default for QcRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_VALID_MIN,
            max: DEFAULT_VALID_MAX,
        }
    }
}

/// Folds elevation layers, lowest first, into a composite.
///
/// The first layer is copied whole and donates the coordinate grids;
/// each later layer only fills cells still missing in the composite.
/// Layers are consumed by value so each can be dropped before the next
/// one is decoded.
pub struct CompositeBuilder {
    qc: QcRange,
    state: Option<BuildState>,
}

struct BuildState {
    reflectivity: Grid2d<f32>,
    latitude: Grid2d<f64>,
    longitude: Grid2d<f64>,
    elevations: Vec<ElevationAngle>,
}

impl CompositeBuilder {
    pub fn new(qc: QcRange) -> Self {
        Self { qc, state: None }
    }

    /// Fold one layer in. Layers must arrive in ascending elevation order.
    pub fn fold(
        &mut self,
        elevation: ElevationAngle,
        mut scan: DecodedScan,
    ) -> Result<(), MosaicError> {
        // Intersect the configured range with the bounds the decoder
        // reported for this layer.
        let min = self.qc.min.max(scan.valid_min);
        let max = self.qc.max.min(scan.valid_max);
        apply_quality_control(&mut scan.reflectivity, min, max);

        match &mut self.state {
            None => {
                normalize_longitudes(&mut scan.longitude);
                self.state = Some(BuildState {
                    reflectivity: scan.reflectivity,
                    latitude: scan.latitude,
                    longitude: scan.longitude,
                    elevations: vec![elevation],
                });
            }
            Some(state) => {
                let previous = *state.elevations.last().expect("state has a layer");
                if elevation <= previous {
                    return Err(MosaicError::OutOfOrderLayer {
                        previous,
                        next: elevation,
                    });
                }
                if scan.reflectivity.shape() != state.reflectivity.shape() {
                    return Err(MosaicError::ShapeMismatch {
                        expected: state.reflectivity.shape(),
                        found: scan.reflectivity.shape(),
                    });
                }

                let mut filled = 0usize;
                for (dst, src) in state
                    .reflectivity
                    .as_mut_slice()
                    .iter_mut()
                    .zip(scan.reflectivity.as_slice())
                {
                    if dst.is_nan() && !src.is_nan() {
                        *dst = *src;
                        filled += 1;
                    }
                }
                debug!(elevation = %elevation, filled, "folded layer into composite");
                state.elevations.push(elevation);
            }
        }

        Ok(())
    }

    pub fn finish(self) -> Result<Composite, MosaicError> {
        let state = self.state.ok_or(MosaicError::NoLayers)?;
        Ok(Composite {
            reflectivity: state.reflectivity,
            latitude: state.latitude,
            longitude: state.longitude,
            elevations: state.elevations,
        })
    }
}

/// Decode and composite a batch of per-elevation files, lowest angle first.
///
/// Files that fail to decode are skipped with a warning; the composite
/// fails only when no layer decoded at all or when a decoded layer's shape
/// disagrees with the first layer.
pub fn compose<D: ScanDecoder>(
    decoder: &D,
    paths: &BTreeMap<ElevationAngle, PathBuf>,
    qc: QcRange,
) -> Result<Composite, MosaicError> {
    let mut builder = CompositeBuilder::new(qc);

    for (&elevation, path) in paths {
        match decoder.decode(path) {
            Ok(scan) => builder.fold(elevation, scan)?,
            Err(e) => {
                warn!(
                    elevation = %elevation,
                    path = %path.display(),
                    error = %e,
                    "Skipping layer that failed to decode"
                );
            }
        }
    }

    builder.finish()
}

/// Shift longitudes from the 0..360 convention to signed -180..180.
pub fn normalize_longitudes(longitude: &mut Grid2d<f64>) {
    for value in longitude.as_mut_slice() {
        if *value > 180.0 {
            *value -= 360.0;
        }
    }
}
