//! Cache directory eviction.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

/// Keep at most `max_files` files in `dir`, evicting oldest-by-mtime first.
///
/// Returns the number of files removed. Individual deletion failures are
/// logged and skipped; a missing directory counts as already clean.
pub fn enforce(dir: &Path, max_files: usize) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((entry.path(), mtime));
    }

    // Newest first; everything past max_files goes.
    files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut evicted = 0;
    for (path, _) in files.iter().skip(max_files) {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Evicted old cache file");
                evicted += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to evict cache file");
            }
        }
    }

    Ok(evicted)
}
