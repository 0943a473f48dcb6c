//! Bounded concurrent execution of unit builds.
//!
//! Every unit gets its own subdirectory of a shared temp root, so concurrent
//! builds never write to the same place. A concurrency degree of 1 gives
//! strictly sequential builds with identical results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use deltapack_core::{BuildOutcome, BuildResult, BuildUnit};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::runner::BuildExecutor;

/// Runs builds through a [`BuildExecutor`] with at most `max_concurrent` in flight.
pub struct BuildPool {
    executor: Arc<dyn BuildExecutor>,
    max_concurrent: usize,
}

impl BuildPool {
    pub fn new(executor: Arc<dyn BuildExecutor>, max_concurrent: usize) -> Self {
        Self {
            executor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Build every unit under `temp_root`. Results come back in `units` order,
    /// one per unit, whatever happened to the build.
    #[instrument(skip(self, units), fields(units = units.len(), max_concurrent = self.max_concurrent))]
    pub async fn run(&self, units: &[BuildUnit], temp_root: &Path) -> Vec<BuildResult> {
        let sem = Arc::new(Semaphore::new(self.max_concurrent));
        let dirs = output_dirs(units, temp_root);

        let mut tasks = Vec::with_capacity(units.len());
        for (unit, output_dir) in units.iter().cloned().zip(dirs) {
            let executor = Arc::clone(&self.executor);
            let sem = Arc::clone(&sem);
            let task_unit = unit.clone();
            let task_dir = output_dir.clone();

            let task = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                executor.build(&task_unit, &task_dir).await
            });
            tasks.push((unit, output_dir, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (unit, output_dir, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(unit = %unit.name, error = %e, "build task aborted");
                    BuildResult {
                        unit,
                        kind: None,
                        output_directory: output_dir,
                        artifact_path: None,
                        outcome: BuildOutcome::Failed {
                            exit_code: -1,
                            reason: format!("build task aborted: {e}"),
                        },
                        duration_ms: 0,
                    }
                }
            };
            results.push(result);
        }

        let built = results.iter().filter(|r| r.succeeded()).count();
        info!(built, attempted = results.len(), "build pool finished");
        results
    }
}

/// One output directory per unit, keyed by unit name. Units sharing a name
/// get `-2`, `-3`, ... suffixes in order.
pub fn output_dirs(units: &[BuildUnit], temp_root: &Path) -> Vec<PathBuf> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    units
        .iter()
        .map(|unit| {
            let count = seen.entry(unit.name.to_ascii_lowercase()).or_insert(0);
            *count += 1;
            let dir_name = if *count == 1 {
                unit.name.clone()
            } else {
                format!("{}-{}", unit.name, count)
            };
            temp_root.join(dir_name)
        })
        .collect()
}
