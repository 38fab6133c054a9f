//! Persistent record of already-downloaded scan times.
//!
//! A single JSON file holds the bounded history plus the last-check
//! instant. Every mutation rewrites the file inside the lock so a crash
//! right after an `add` never loses that scan.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use radar_common::ScanTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// On-disk shape of the ledger record.
#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    /// Newest first, bounded to the ledger capacity.
    timestamps: Vec<ScanTime>,
    last_check: DateTime<Utc>,
}

struct LedgerState {
    scans: BTreeSet<ScanTime>,
    last_check: DateTime<Utc>,
}

/// Thread-safe dedup ledger with write-through persistence.
pub struct DownloadLedger {
    path: PathBuf,
    capacity: usize,
    inner: Mutex<LedgerState>,
}

impl DownloadLedger {
    /// Open the ledger at `path`, keeping at most `capacity` scan times.
    ///
    /// A missing or corrupt record file is a cold start, never an error.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();

        let state = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<LedgerRecord>(&content) {
                Ok(record) => {
                    info!(
                        path = %path.display(),
                        count = record.timestamps.len(),
                        "Loaded download ledger"
                    );
                    LedgerState {
                        scans: record.timestamps.into_iter().collect(),
                        last_check: record.last_check,
                    }
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Corrupt ledger record, starting fresh"
                    );
                    LedgerState {
                        scans: BTreeSet::new(),
                        last_check: Utc::now(),
                    }
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No ledger record found, starting fresh");
                LedgerState {
                    scans: BTreeSet::new(),
                    last_check: Utc::now(),
                }
            }
        };

        let ledger = Self {
            path,
            capacity,
            inner: Mutex::new(state),
        };
        // Materialize the record so a cold start is visible on disk.
        ledger.persist(&ledger.inner.lock().expect("ledger lock poisoned"));
        ledger
    }

    /// Whether this scan time has already been processed.
    pub fn has(&self, scan: &ScanTime) -> bool {
        let state = self.inner.lock().expect("ledger lock poisoned");
        state.scans.contains(scan)
    }

    /// Record a processed scan. Idempotent: re-adding a known scan only
    /// refreshes the last-check instant. Overflow evicts the oldest scans
    /// in the same persisted write as the add.
    pub fn add(&self, scan: ScanTime) {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        state.last_check = Utc::now();

        if state.scans.insert(scan) {
            while state.scans.len() > self.capacity {
                let oldest = *state.scans.iter().next().expect("non-empty set");
                state.scans.remove(&oldest);
                debug!(scan = %oldest, "Evicted oldest scan from ledger");
            }
            info!(scan = %scan, total = state.scans.len(), "Recorded scan in ledger");
        } else {
            debug!(scan = %scan, "Scan already recorded");
        }

        self.persist(&state);
    }

    /// All tracked scan times, newest first.
    pub fn list(&self) -> Vec<ScanTime> {
        let state = self.inner.lock().expect("ledger lock poisoned");
        state.scans.iter().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        let state = self.inner.lock().expect("ledger lock poisoned");
        state.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_check(&self) -> DateTime<Utc> {
        let state = self.inner.lock().expect("ledger lock poisoned");
        state.last_check
    }

    /// Drop all tracked scans.
    pub fn clear(&self) {
        let mut state = self.inner.lock().expect("ledger lock poisoned");
        state.scans.clear();
        state.last_check = Utc::now();
        self.persist(&state);
        info!("Cleared download ledger");
    }

    /// Full rewrite of the persisted record. A failed write is logged and
    /// the in-memory state stays authoritative.
    fn persist(&self, state: &LedgerState) {
        let record = LedgerRecord {
            timestamps: state
                .scans
                .iter()
                .rev()
                .take(self.capacity)
                .copied()
                .collect(),
            last_check: state.last_check,
        };

        let result = serde_json::to_vec_pretty(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .and_then(|json| std::fs::write(&self.path, json));

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to persist ledger");
        }
    }
}
