//! Scan timestamp handling.
//!
//! Archive filenames embed a volume scan time as `YYYYMMDD-HHMMSS`. That
//! string is the key used to correlate scans across elevation angles and to
//! deduplicate downloads, so it gets a real type with total ordering.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// Canonical timestamp of one radar volume scan (UTC, second resolution).
///
/// Two scan times are equal iff their `YYYYMMDD-HHMMSS` renderings are
/// equal; ordering follows the rendered string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ScanTime(NaiveDateTime);

impl ScanTime {
    /// Parse the canonical `YYYYMMDD-HHMMSS` form.
    ///
    /// Returns `None` for anything that is not exactly 15 digits-and-hyphen
    /// or that names an impossible instant (month 13, minute 70, ...).
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 15 || bytes[8] != b'-' {
            return None;
        }
        let (date, time) = (&s[..8], &s[9..]);
        if !date.bytes().all(|b| b.is_ascii_digit()) || !time.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let year: i32 = date[..4].parse().ok()?;
        let month: u32 = date[4..6].parse().ok()?;
        let day: u32 = date[6..8].parse().ok()?;
        let hour: u32 = time[..2].parse().ok()?;
        let minute: u32 = time[2..4].parse().ok()?;
        let second: u32 = time[4..6].parse().ok()?;

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .map(Self)
    }

    /// Extract the scan time from an archive filename.
    ///
    /// Filenames follow `..._<angle>_<YYYYMMDD>-<HHMMSS>.<ext>[.gz]`, e.g.
    /// `MRMS_MergedReflectivityQC_00.50_20251107-200036.grib2.gz`. The
    /// timestamp is the token after the last underscore, with extensions
    /// stripped. Returns `None` when the name does not match.
    pub fn from_filename(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".gz").unwrap_or(name);
        let stem = match stem.rfind('.') {
            Some(dot) => &stem[..dot],
            None => stem,
        };
        let token = stem.rsplit('_').next()?;
        Self::parse(token)
    }

    /// The underlying UTC instant.
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Absolute distance to another scan time, in seconds.
    ///
    /// Used to pick the closest-matching scan when elevation angles are not
    /// perfectly synchronized.
    pub fn drift_secs(&self, other: ScanTime) -> i64 {
        (self.0 - other.0).num_seconds().abs()
    }
}

impl fmt::Display for ScanTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d-%H%M%S"))
    }
}

impl TryFrom<String> for ScanTime {
    type Error = RadarError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or(RadarError::InvalidTimestamp(s))
    }
}

impl From<ScanTime> for String {
    fn from(ts: ScanTime) -> String {
        ts.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for s in ["20251107-200036", "20240229-000000", "19990101-235959"] {
            let ts = ScanTime::parse(s).unwrap();
            assert_eq!(ts.to_string(), s);
            assert_eq!(ScanTime::parse(&ts.to_string()), Some(ts));
        }
    }

    #[test]
    fn test_parse_rejects_invalid_instants() {
        // Month 13, minute 70, day 32, Feb 30
        assert_eq!(ScanTime::parse("20251307-200036"), None);
        assert_eq!(ScanTime::parse("20251107-207036"), None);
        assert_eq!(ScanTime::parse("20251132-200036"), None);
        assert_eq!(ScanTime::parse("20250230-120000"), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(ScanTime::parse(""), None);
        assert_eq!(ScanTime::parse("20251107200036"), None);
        assert_eq!(ScanTime::parse("20251107-20003"), None);
        assert_eq!(ScanTime::parse("2025110a-200036"), None);
        assert_eq!(ScanTime::parse("20251107_200036"), None);
    }

    #[test]
    fn test_from_filename() {
        let ts = ScanTime::from_filename(
            "MRMS_MergedReflectivityQC_00.50_20251107-200036.grib2.gz",
        )
        .unwrap();
        assert_eq!(ts.to_string(), "20251107-200036");

        // Decompressed form parses to the same instant
        let ts2 = ScanTime::from_filename(
            "MRMS_MergedReflectivityQC_00.50_20251107-200036.grib2",
        )
        .unwrap();
        assert_eq!(ts, ts2);
    }

    #[test]
    fn test_from_filename_rejects_garbage() {
        assert_eq!(ScanTime::from_filename("latest.grib2.gz"), None);
        assert_eq!(ScanTime::from_filename("readme.txt"), None);
        assert_eq!(
            ScanTime::from_filename("MRMS_MergedReflectivityQC_00.50_20251307-200036.grib2.gz"),
            None
        );
    }

    #[test]
    fn test_ordering_matches_string_order() {
        let a = ScanTime::parse("20251107-200036").unwrap();
        let b = ScanTime::parse("20251107-200236").unwrap();
        assert!(a < b);
        assert!(a.to_string() < b.to_string());
    }

    #[test]
    fn test_drift_secs() {
        let a = ScanTime::parse("20251107-200036").unwrap();
        let b = ScanTime::parse("20251107-200236").unwrap();
        assert_eq!(a.drift_secs(b), 120);
        assert_eq!(b.drift_secs(a), 120);
        assert_eq!(a.drift_secs(a), 0);
    }
}
