//! Setup phase run before the pipeline: stale package cleanup.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Name prefix shared by package folders, their archives and build temp roots.
pub const PACKAGE_PREFIX: &str = "deltapack-";

/// Remove `deltapack-*` folders and archives directly under `root` whose
/// modification time is older than `max_age`.
///
/// A missing `root` is not an error, and a zero `max_age` disables cleanup.
/// Entries that cannot be removed are logged and left in place.
pub fn cleanup_stale_packages(root: &Path, max_age: Duration) -> Result<Vec<PathBuf>> {
    if max_age.is_zero() || !root.is_dir() {
        return Ok(Vec::new());
    }

    let now = SystemTime::now();
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to list output folder {}", root.display()))?;

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(PACKAGE_PREFIX) {
            continue;
        }

        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        match age {
            Some(age) if age > max_age => {}
            _ => continue,
        }

        let outcome = if metadata.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match outcome {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale package");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale package"),
        }
    }

    removed.sort();
    if !removed.is_empty() {
        info!(count = removed.len(), root = %root.display(), "cleaned up stale packages");
    }
    Ok(removed)
}
