//! Grid containers for decoded scans and composites.

use radar_common::ElevationAngle;

use crate::error::MosaicError;

/// A dense row-major 2D array.
///
/// Reflectivity grids use `f32` with `NaN` as the no-data sentinel;
/// coordinate grids use `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2d<T> {
    ny: usize,
    nx: usize,
    data: Vec<T>,
}

impl<T> Grid2d<T> {
    /// Wrap an existing row-major buffer, checking the length.
    pub fn from_vec(ny: usize, nx: usize, data: Vec<T>) -> Result<Self, MosaicError> {
        if data.len() != ny * nx {
            return Err(MosaicError::LengthMismatch {
                ny,
                nx,
                found: data.len(),
            });
        }
        Ok(Self { ny, nx, data })
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, j: usize, i: usize) -> Option<&T> {
        if j >= self.ny || i >= self.nx {
            return None;
        }
        Some(&self.data[j * self.nx + i])
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// One elevation layer as produced by the binary decoder collaborator.
///
/// All three grids share one shape; latitude/longitude are cell-center
/// coordinates co-registered across elevations.
#[derive(Debug, Clone)]
pub struct DecodedScan {
    pub reflectivity: Grid2d<f32>,
    pub latitude: Grid2d<f64>,
    pub longitude: Grid2d<f64>,
    /// Physically plausible value bounds reported by the decoder (dBZ).
    pub valid_min: f32,
    pub valid_max: f32,
}

/// The lowest-valid-altitude composite surface.
///
/// Same shape contract as a [`DecodedScan`]; longitudes are normalized to
/// the signed -180..180 convention.
#[derive(Debug, Clone)]
pub struct Composite {
    pub reflectivity: Grid2d<f32>,
    pub latitude: Grid2d<f64>,
    pub longitude: Grid2d<f64>,
    /// Elevation angles folded in, ascending.
    pub elevations: Vec<ElevationAngle>,
}

impl Composite {
    /// Count of cells holding a valid (non-NaN) value.
    pub fn valid_cells(&self) -> usize {
        self.reflectivity
            .as_slice()
            .iter()
            .filter(|v| !v.is_nan())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_length_check() {
        assert!(Grid2d::from_vec(2, 3, vec![0.0f32; 6]).is_ok());
        assert!(matches!(
            Grid2d::from_vec(2, 3, vec![0.0f32; 5]),
            Err(MosaicError::LengthMismatch { found: 5, .. })
        ));
    }

    #[test]
    fn test_get_row_major() {
        let grid = Grid2d::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(0, 1), Some(&2));
        assert_eq!(grid.get(1, 0), Some(&3));
        assert_eq!(grid.get(2, 0), None);
    }
}
