//! Multi-angle scan downloads.
//!
//! Given a target scan time, pulls the closest-matching file for every
//! configured elevation into the local cache and decompresses it. Each
//! angle gets an explicit outcome; one angle failing never aborts the rest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use futures::StreamExt;
use radar_common::{ElevationAngle, ScanTime};
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::scrape::{ArchiveScraper, RemoteFileEntry, USER_AGENT};

/// Why an elevation produced no file this cycle.
#[derive(Debug, Clone)]
pub enum MissReason {
    /// Listing empty or unreachable.
    NoListing,
    /// Closest scan is further from the target than the configured drift.
    DriftExceeded { nearest: ScanTime, drift_secs: i64 },
    /// Download or decompression failed.
    Failed(String),
}

/// Per-elevation result of a batch download.
#[derive(Debug, Clone)]
pub enum ElevationOutcome {
    /// Decompressed scan file available in the cache.
    Ready { path: PathBuf, cache_hit: bool },
    Missing(MissReason),
}

/// Outcomes for every configured elevation, ordered by angle.
#[derive(Debug, Default)]
pub struct DownloadBatch {
    outcomes: BTreeMap<ElevationAngle, ElevationOutcome>,
}

impl DownloadBatch {
    pub fn insert(&mut self, angle: ElevationAngle, outcome: ElevationOutcome) {
        self.outcomes.insert(angle, outcome);
    }

    pub fn outcomes(&self) -> &BTreeMap<ElevationAngle, ElevationOutcome> {
        &self.outcomes
    }

    /// Elevations that landed a decompressed file, ascending by angle.
    pub fn ready_paths(&self) -> BTreeMap<ElevationAngle, PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|(angle, outcome)| match outcome {
                ElevationOutcome::Ready { path, .. } => Some((*angle, path.clone())),
                ElevationOutcome::Missing(_) => None,
            })
            .collect()
    }

    pub fn ready_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ElevationOutcome::Ready { .. }))
            .count()
    }
}

/// Downloads the closest-matching scan per elevation angle.
pub struct MultiAngleDownloader {
    scraper: Arc<ArchiveScraper>,
    client: Client,
    config: Arc<UpdaterConfig>,
}

impl MultiAngleDownloader {
    pub fn new(scraper: Arc<ArchiveScraper>, config: Arc<UpdaterConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.download_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            scraper,
            client,
            config,
        })
    }

    /// Fetch the batch for `target` across all configured elevations.
    ///
    /// The result holds one outcome per configured angle; an angle absent
    /// from `ready_paths()` means no data this cycle for that angle.
    pub async fn fetch_batch(&self, target: ScanTime) -> DownloadBatch {
        let listings = self.scraper.list_all().await;
        let mut batch = DownloadBatch::default();

        for angle in self.config.angles() {
            let outcome = match listings.get(&angle) {
                Some(entries) if !entries.is_empty() => {
                    self.fetch_one(angle, entries, target).await
                }
                _ => {
                    warn!(elevation = %angle, "No listing entries for elevation");
                    ElevationOutcome::Missing(MissReason::NoListing)
                }
            };
            batch.insert(angle, outcome);
        }

        info!(
            target = %target,
            ready = batch.ready_count(),
            configured = self.config.angles().len(),
            "Download batch complete"
        );
        batch
    }

    async fn fetch_one(
        &self,
        angle: ElevationAngle,
        entries: &[RemoteFileEntry],
        target: ScanTime,
    ) -> ElevationOutcome {
        let Some((entry, drift_secs)) = closest_entry(entries, target) else {
            return ElevationOutcome::Missing(MissReason::NoListing);
        };

        if drift_secs > self.config.max_scan_drift_secs {
            warn!(
                elevation = %angle,
                nearest = %entry.scan_time,
                drift_secs,
                "Closest scan drifts too far from target"
            );
            return ElevationOutcome::Missing(MissReason::DriftExceeded {
                nearest: entry.scan_time,
                drift_secs,
            });
        }

        match self.materialize(angle, entry).await {
            Ok((path, cache_hit)) => ElevationOutcome::Ready { path, cache_hit },
            Err(e) => {
                warn!(elevation = %angle, url = %entry.url, error = %e, "Elevation download failed");
                ElevationOutcome::Missing(MissReason::Failed(e.to_string()))
            }
        }
    }

    /// Ensure the decompressed form of `entry` exists in the cache,
    /// downloading and/or decompressing as needed.
    async fn materialize(
        &self,
        angle: ElevationAngle,
        entry: &RemoteFileEntry,
    ) -> Result<(PathBuf, bool)> {
        let dir = self.config.cache_dir_for(angle);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;

        let compressed = dir.join(&entry.filename);
        let decompressed = compressed.with_extension("");

        if compressed.exists() {
            debug!(path = %compressed.display(), "Cache hit");
            if !decompressed.exists() {
                decompress(compressed.clone(), decompressed.clone()).await?;
            }
            return Ok((decompressed, true));
        }

        self.download_to(&entry.url, &compressed).await?;
        decompress(compressed.clone(), decompressed.clone()).await?;

        info!(
            elevation = %angle,
            path = %decompressed.display(),
            "Downloaded and decompressed scan"
        );
        Ok((decompressed, false))
    }

    /// Stream a remote file to disk, removing any partial output on failure.
    async fn download_to(&self, url: &str, path: &Path) -> Result<()> {
        debug!(url = %url, "Downloading");

        let result = self.try_download_to(url, path).await;
        if result.is_err() && path.exists() {
            fs::remove_file(path).await.ok();
        }
        result
    }

    async fn try_download_to(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Download request failed")?;

        if !response.status().is_success() {
            bail!("Download of {} returned {}", url, response.status());
        }

        let mut file = fs::File::create(path)
            .await
            .context("Failed to create output file")?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading response chunk")?;
            file.write_all(&chunk)
                .await
                .context("Error writing to file")?;
        }

        file.flush().await?;
        Ok(())
    }
}

/// Pick the entry with minimal |scan time - target|.
pub fn closest_entry(
    entries: &[RemoteFileEntry],
    target: ScanTime,
) -> Option<(&RemoteFileEntry, i64)> {
    entries
        .iter()
        .map(|entry| (entry, entry.scan_time.drift_secs(target)))
        .min_by_key(|(_, drift)| *drift)
}

/// Gunzip `input` into `output`, removing partial output on failure.
async fn decompress(input: PathBuf, output: PathBuf) -> Result<()> {
    let result = tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        let mut decoder = GzDecoder::new(std::io::BufReader::new(file));
        let mut out = std::fs::File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;

        if let Err(e) = std::io::copy(&mut decoder, &mut out) {
            drop(out);
            std::fs::remove_file(&output).ok();
            return Err(anyhow!(e).context("Decompression failed"));
        }
        Ok(())
    })
    .await
    .context("Decompress task panicked")?;

    result
}
