//! Reports handed back to the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::change::ClassifiedChangeSet;
use crate::domain::unit::BuildResult;

/// Counts computed by a dry run. Nothing is written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewReport {
    pub total_changes: usize,
    pub static_files: usize,
    pub compiled_files: usize,
}

impl PreviewReport {
    /// Changes that are neither copied nor built.
    pub fn unclassified(&self) -> usize {
        self.total_changes
            .saturating_sub(self.static_files + self.compiled_files)
    }
}

impl From<&ClassifiedChangeSet> for PreviewReport {
    fn from(set: &ClassifiedChangeSet) -> Self {
        Self {
            total_changes: set.total_changes,
            static_files: set.static_files.len(),
            compiled_files: set.compiled_files.len(),
        }
    }
}

/// A unit that did not make it into the package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub reason: String,
}

/// What a package run actually produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageSummary {
    pub total_changes: usize,
    pub static_files_copied: usize,
    pub units_attempted: usize,
    pub units_built: usize,
    pub failures: Vec<UnitFailure>,
    pub package_folder: PathBuf,
    pub archive_path: Option<PathBuf>,
    pub archive_sha256: Option<String>,
}

impl PackageSummary {
    /// Build a summary from the copied static count and the per-unit results.
    pub fn new(
        package_folder: PathBuf,
        total_changes: usize,
        static_files_copied: usize,
        results: &[BuildResult],
    ) -> Self {
        let failures = results
            .iter()
            .filter_map(|r| {
                r.failure_reason().map(|reason| UnitFailure {
                    unit: r.unit.name.clone(),
                    reason,
                })
            })
            .collect();

        Self {
            total_changes,
            static_files_copied,
            units_attempted: results.len(),
            units_built: results.iter().filter(|r| r.succeeded()).count(),
            failures,
            package_folder,
            archive_path: None,
            archive_sha256: None,
        }
    }

    /// True when every attempted unit was built.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
