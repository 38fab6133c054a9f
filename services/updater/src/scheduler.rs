//! Periodic refresh scheduling.
//!
//! One cooperative timer drives at most one refresh cycle at a time. A
//! fire (timer or manual trigger) while a cycle is in flight is dropped,
//! never queued; every cycle ends back in the idle state regardless of
//! outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use radar_common::{ElevationAngle, ScanTime};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::download::MultiAngleDownloader;
use crate::janitor;
use crate::ledger::DownloadLedger;
use crate::scrape::ArchiveScraper;

/// Scheduler state for external observation.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub update_in_progress: bool,
    pub update_interval_secs: u64,
    pub next_run: Option<DateTime<Utc>>,
    pub last_check: DateTime<Utc>,
    pub tracked_scans: usize,
}

/// How one refresh cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Dropped because another cycle was in flight.
    Skipped,
    /// Archive listing empty or unreachable.
    NoData,
    /// Newest scan already in the ledger; nothing to do.
    AlreadyCurrent,
    /// A new scan was found but no elevation landed a file; the scan is
    /// not registered so the next cycle retries it.
    NothingDownloaded,
    Updated {
        scan_time: ScanTime,
        elevations: Vec<ElevationAngle>,
    },
}

/// Drives the fetch -> download -> janitor refresh cycle on an interval.
pub struct UpdateScheduler {
    scraper: Arc<ArchiveScraper>,
    downloader: MultiAngleDownloader,
    ledger: Arc<DownloadLedger>,
    config: Arc<UpdaterConfig>,
    running: AtomicBool,
    in_progress: AtomicBool,
    next_run: Mutex<Option<DateTime<Utc>>>,
}

impl UpdateScheduler {
    pub fn new(
        scraper: Arc<ArchiveScraper>,
        downloader: MultiAngleDownloader,
        ledger: Arc<DownloadLedger>,
        config: Arc<UpdaterConfig>,
    ) -> Self {
        Self {
            scraper,
            downloader,
            ledger,
            config,
            running: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            next_run: Mutex::new(None),
        }
    }

    /// Run one refresh cycle, unless one is already in flight.
    ///
    /// Safe to call from outside the timer (manual trigger); the
    /// in-progress flag is the single-flight guard.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = CycleGuard::acquire(&self.in_progress) else {
            warn!("Update already in progress, skipping this run");
            return CycleOutcome::Skipped;
        };

        info!("Starting radar update cycle");
        let outcome = self.run_cycle_inner().await;
        info!(outcome = outcome_label(&outcome), "Radar update cycle complete");
        outcome
    }

    async fn run_cycle_inner(&self) -> CycleOutcome {
        let angles = self.config.angles();
        let Some(&lowest) = angles.first() else {
            warn!("No elevation angles configured");
            return CycleOutcome::NoData;
        };

        // The lowest angle's newest scan anchors the whole cycle.
        let listing = match self.scraper.list_elevation(lowest).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(elevation = %lowest, error = %e, "Lowest-elevation listing failed");
                return CycleOutcome::NoData;
            }
        };

        let Some(newest) = listing.first() else {
            warn!(elevation = %lowest, "No scan files available on archive");
            return CycleOutcome::NoData;
        };
        let target = newest.scan_time;

        if self.ledger.has(&target) {
            debug!(scan = %target, "Scan already downloaded, skipping");
            return CycleOutcome::AlreadyCurrent;
        }

        info!(scan = %target, "New scan available");
        let batch = self.downloader.fetch_batch(target).await;
        let ready = batch.ready_paths();

        if ready.is_empty() {
            warn!(scan = %target, "No elevation files landed, will retry next cycle");
            return CycleOutcome::NothingDownloaded;
        }

        self.ledger.add(target);

        for angle in ready.keys() {
            let dir = self.config.cache_dir_for(*angle);
            match janitor::enforce(&dir, self.config.max_cache_files) {
                Ok(evicted) if evicted > 0 => {
                    info!(dir = %dir.display(), evicted, "Cache janitor evicted files");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Cache janitor failed");
                }
            }
        }

        CycleOutcome::Updated {
            scan_time: target,
            elevations: ready.keys().copied().collect(),
        }
    }

    /// Run until shutdown: one immediate cycle, then the interval timer.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.config.update_interval();
        info!(interval_secs = period.as_secs(), "Starting update scheduler");

        self.running.store(true, Ordering::SeqCst);

        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First cycle fires immediately, ahead of the interval timer.
        self.store_next_run(period);
        self.run_cycle().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.store_next_run(period);
                    self.run_cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down update scheduler");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        *self.next_run.lock().expect("next_run lock poisoned") = None;
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            update_in_progress: self.in_progress.load(Ordering::SeqCst),
            update_interval_secs: self.config.update_interval_secs,
            next_run: *self.next_run.lock().expect("next_run lock poisoned"),
            last_check: self.ledger.last_check(),
            tracked_scans: self.ledger.len(),
        }
    }

    fn store_next_run(&self, period: std::time::Duration) {
        let next = Utc::now()
            + ChronoDuration::from_std(period).unwrap_or_else(|_| ChronoDuration::seconds(300));
        *self.next_run.lock().expect("next_run lock poisoned") = Some(next);
    }
}

fn outcome_label(outcome: &CycleOutcome) -> &'static str {
    match outcome {
        CycleOutcome::Skipped => "skipped",
        CycleOutcome::NoData => "no_data",
        CycleOutcome::AlreadyCurrent => "already_current",
        CycleOutcome::NothingDownloaded => "nothing_downloaded",
        CycleOutcome::Updated { .. } => "updated",
    }
}

/// RAII single-flight guard; clears the flag on every exit path.
struct CycleGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then_some(Self { flag })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
