//! Delta-to-package pipeline orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use deltapack_core::git;
use deltapack_core::{
    classify, BuildResult, BuildUnitResolver, ClassifiedChangeSet, ClassifierConfig, DeltaError,
    PackageAssembler, PackageSummary, PreviewReport, Result, RevisionRange,
};
use tracing::{info, instrument, warn};

use crate::pool::BuildPool;
use crate::runner::BuildExecutor;

/// Prefix of the shared temp root holding per-unit build output.
pub const BUILD_TEMP_PREFIX: &str = "deltapack-build-";

/// Everything one package run needs to know.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    pub repo_root: PathBuf,
    pub range: RevisionRange,
    pub package_root: PathBuf,
    pub classifier: ClassifierConfig,
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    pub summary: PackageSummary,

    /// One entry per resolved unit, in resolution order.
    pub results: Vec<BuildResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PackageOutcome {
    pub fn built_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.built_count()
    }
}

/// Classifies a commit range, builds the affected units and assembles the
/// package tree.
pub struct DeltaPipeline {
    pool: BuildPool,
}

impl DeltaPipeline {
    pub fn new(executor: Arc<dyn BuildExecutor>, max_concurrent: usize) -> Self {
        Self {
            pool: BuildPool::new(executor, max_concurrent),
        }
    }

    /// Classified counts for `request`. Read-only: the package root is not
    /// touched and nothing is built.
    pub fn preview(&self, request: &PackageRequest) -> Result<PreviewReport> {
        let repo_root = canonical_repo_root(&request.repo_root)?;
        let set = classify(&repo_root, &request.range, &request.classifier)?;
        Ok(PreviewReport::from(&set))
    }

    /// Execute the pipeline.
    ///
    /// Input validation and the diff happen before anything is written. Static
    /// files are copied first, then every resolved unit is built in its own
    /// temp directory and its artifact placed under `<unit dir>/bin/`. A failed
    /// unit is recorded in the summary and never aborts its siblings.
    #[instrument(skip(self, request), fields(repo = %request.repo_root.display(), range = %request.range))]
    pub async fn run(&self, request: &PackageRequest) -> Result<PackageOutcome> {
        let start = Instant::now();

        let repo_root = canonical_repo_root(&request.repo_root)?;
        let set = classify(&repo_root, &request.range, &request.classifier)?;
        log_unclassified(&set);

        std::fs::create_dir_all(&request.package_root)
            .map_err(|e| DeltaError::copy_failed(&request.package_root, e))?;
        let assembler = PackageAssembler::new(&repo_root, &request.package_root);

        let copied = assembler.copy_static(&set.static_files)?;
        info!(copied, package = %assembler.package_root().display(), "static files copied");

        let units = BuildUnitResolver::new(&repo_root).resolve(&set.compiled_files);
        info!(units = units.len(), "build units resolved");

        let results = if units.is_empty() {
            Vec::new()
        } else {
            // Lives until every worker has returned and artifacts are placed.
            let temp_root = tempfile::Builder::new()
                .prefix(BUILD_TEMP_PREFIX)
                .tempdir()?;
            let results = self.pool.run(&units, temp_root.path()).await;

            for result in results.iter().filter(|r| r.succeeded()) {
                assembler.place_artifact(result)?;
            }
            results
        };

        let summary = PackageSummary::new(
            request.package_root.clone(),
            set.total_changes,
            copied,
            &results,
        );
        for failure in &summary.failures {
            warn!(unit = %failure.unit, reason = %failure.reason, "unit excluded from package");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            built = summary.units_built,
            attempted = summary.units_attempted,
            duration_ms,
            "package assembled"
        );

        Ok(PackageOutcome {
            summary,
            results,
            duration_ms,
        })
    }
}

/// Canonical top of the work tree containing `path`.
///
/// Diff paths are relative to the work-tree top, so a subdirectory is widened
/// to it. A directory outside any work tree is returned as is and fails later
/// at the diff.
fn canonical_repo_root(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(DeltaError::InvalidInput(format!(
            "repository path does not exist: {}",
            path.display()
        )));
    }
    let root = if git::is_git_repo(path) {
        git::toplevel(path)?
    } else {
        path.to_path_buf()
    };
    root.canonicalize().map_err(|e| {
        DeltaError::InvalidInput(format!("cannot resolve repository path {}: {e}", root.display()))
    })
}

fn log_unclassified(set: &ClassifiedChangeSet) {
    let unclassified = set.unclassified_count();
    if unclassified > 0 {
        info!(unclassified, "changes matched neither static nor compiled extensions");
    }
}
