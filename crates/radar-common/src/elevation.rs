//! Elevation angle identification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// Radar beam tilt angle identifying one scan layer.
///
/// Stored as integer hundredths of a degree so that angles compare exactly
/// and can key ordered maps; "lowest" is the numerically smallest angle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "f64", into = "f64")]
pub struct ElevationAngle(u32);

impl ElevationAngle {
    /// Build from a decimal-degree value, e.g. `0.50`.
    ///
    /// Rejects non-finite, negative, and implausibly steep (> 90°) values.
    pub fn from_degrees(deg: f64) -> Result<Self, RadarError> {
        if !deg.is_finite() || !(0.0..=90.0).contains(&deg) {
            return Err(RadarError::InvalidElevation(deg));
        }
        Ok(Self((deg * 100.0).round() as u32))
    }

    pub fn degrees(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Cache subdirectory name for this angle, e.g. `0.50` -> `00_50`.
    pub fn dir_name(self) -> String {
        format!("{:02}_{:02}", self.0 / 100, self.0 % 100)
    }

    /// Listing-path component for this angle, e.g. `0.50` -> `00.50`.
    pub fn url_component(self) -> String {
        format!("{:02}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for ElevationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl TryFrom<f64> for ElevationAngle {
    type Error = RadarError;

    fn try_from(deg: f64) -> Result<Self, Self::Error> {
        Self::from_degrees(deg)
    }
}

impl From<ElevationAngle> for f64 {
    fn from(angle: ElevationAngle) -> f64 {
        angle.degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming() {
        let angle = ElevationAngle::from_degrees(0.50).unwrap();
        assert_eq!(angle.dir_name(), "00_50");
        assert_eq!(angle.url_component(), "00.50");
        assert_eq!(angle.to_string(), "0.50");

        let steep = ElevationAngle::from_degrees(12.5).unwrap();
        assert_eq!(steep.dir_name(), "12_50");
        assert_eq!(steep.to_string(), "12.50");
    }

    #[test]
    fn test_ordering() {
        let a = ElevationAngle::from_degrees(0.50).unwrap();
        let b = ElevationAngle::from_degrees(0.75).unwrap();
        let c = ElevationAngle::from_degrees(1.25).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(ElevationAngle::from_degrees(-0.5).is_err());
        assert!(ElevationAngle::from_degrees(f64::NAN).is_err());
        assert!(ElevationAngle::from_degrees(91.0).is_err());
    }

    #[test]
    fn test_round_trip_through_f64() {
        let angle = ElevationAngle::from_degrees(2.25).unwrap();
        assert_eq!(ElevationAngle::from_degrees(angle.degrees()).unwrap(), angle);
    }
}
