//! Updater configuration.
//!
//! Loaded from an optional YAML file with serde defaults; `main` applies
//! CLI/env overrides on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use radar_common::ElevationAngle;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Archive root, one listing directory per elevation underneath.
    pub base_url: String,
    /// Product prefix of the per-elevation listing directories.
    pub product: String,
    /// Configured scan angles; immutable for the process lifetime.
    pub elevation_angles: Vec<ElevationAngle>,
    /// Root of the local file cache.
    pub cache_dir: PathBuf,
    /// One cache subdirectory per elevation (vs a single shared directory).
    pub elevation_subdirs: bool,
    /// Seconds between refresh cycles.
    pub update_interval_secs: u64,
    /// Timeout for listing and file requests.
    pub download_timeout_secs: u64,
    /// Maximum files kept per cache directory by the janitor.
    pub max_cache_files: usize,
    /// Maximum scan timestamps retained in the dedup ledger.
    pub ledger_capacity: usize,
    /// Largest tolerated |scan time - target| when matching angles whose
    /// scans are not perfectly synchronized.
    pub max_scan_drift_secs: i64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mrms.ncep.noaa.gov/3DRefl".to_string(),
            product: "MergedReflectivityQC".to_string(),
            elevation_angles: [0.50, 0.75, 1.00, 1.25, 1.50, 1.75, 2.00, 2.25, 2.50]
                .iter()
                .map(|&deg| ElevationAngle::from_degrees(deg).expect("static angle"))
                .collect(),
            cache_dir: PathBuf::from("cache"),
            elevation_subdirs: true,
            update_interval_secs: 300,
            download_timeout_secs: 30,
            max_cache_files: 50,
            ledger_capacity: 100,
            max_scan_drift_secs: 300,
        }
    }
}

impl UpdaterConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: UpdaterConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), "Loaded updater config");
        Ok(config)
    }

    /// Configured angles, ascending. The first entry is the anchor angle
    /// whose newest scan drives each refresh cycle.
    pub fn angles(&self) -> Vec<ElevationAngle> {
        let mut angles = self.elevation_angles.clone();
        angles.sort_unstable();
        angles.dedup();
        angles
    }

    /// Listing endpoint for one elevation,
    /// e.g. `https://host/3DRefl/MergedReflectivityQC_00.50`.
    pub fn listing_url(&self, angle: ElevationAngle) -> String {
        format!(
            "{}/{}_{}",
            self.base_url.trim_end_matches('/'),
            self.product,
            angle.url_component()
        )
    }

    /// Cache directory for one elevation, e.g. `cache/00_50`.
    pub fn cache_dir_for(&self, angle: ElevationAngle) -> PathBuf {
        if self.elevation_subdirs {
            self.cache_dir.join(angle.dir_name())
        } else {
            self.cache_dir.clone()
        }
    }

    /// Path of the persisted dedup ledger record.
    pub fn ledger_path(&self) -> PathBuf {
        self.cache_dir.join("downloads.json")
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
