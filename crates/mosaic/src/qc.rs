//! Quality control of reflectivity values.

use crate::grid::Grid2d;

/// Default plausible reflectivity bounds (dBZ).
pub const DEFAULT_VALID_MIN: f32 = -30.0;
pub const DEFAULT_VALID_MAX: f32 = 80.0;

/// Mark values outside `[min, max]` as missing (NaN). Bounds are inclusive.
pub fn apply_quality_control(grid: &mut Grid2d<f32>, min: f32, max: f32) {
    for value in grid.as_mut_slice() {
        if !value.is_nan() && (*value < min || *value > max) {
            *value = f32::NAN;
        }
    }
}
