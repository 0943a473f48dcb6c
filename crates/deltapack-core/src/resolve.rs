//! Build-unit resolution: map compiled files to their nearest descriptor.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::descriptor::DESCRIPTOR_EXTENSION;
use crate::domain::change::ChangeRecord;
use crate::domain::unit::BuildUnit;

/// Walks upward from each changed file to the closest descriptor, never
/// leaving the repository root.
#[derive(Debug, Clone)]
pub struct BuildUnitResolver {
    repo_root: PathBuf,
    descriptor_extension: String,
}

impl BuildUnitResolver {
    /// `repo_root` should be absolute and normalized (e.g. canonicalized).
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            descriptor_extension: DESCRIPTOR_EXTENSION.to_string(),
        }
    }

    pub fn with_descriptor_extension(mut self, extension: &str) -> Self {
        self.descriptor_extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Unique units owning `compiled_files`, ordered by descriptor path.
    ///
    /// Files with no enclosing descriptor contribute nothing.
    pub fn resolve(&self, compiled_files: &[ChangeRecord]) -> Vec<BuildUnit> {
        let mut units: BTreeMap<PathBuf, BuildUnit> = BTreeMap::new();

        for record in compiled_files {
            match self.nearest_descriptor(&record.path) {
                Some(descriptor) => {
                    debug!(
                        path = %record.path.display(),
                        descriptor = %descriptor.display(),
                        "resolved build unit"
                    );
                    units
                        .entry(descriptor.clone())
                        .or_insert_with(|| BuildUnit::from_descriptor(descriptor));
                }
                None => {
                    warn!(path = %record.path.display(), "no build unit found for changed file");
                }
            }
        }

        units.into_values().collect()
    }

    /// Closest descriptor above the repository-relative `path`.
    pub fn nearest_descriptor(&self, path: &Path) -> Option<PathBuf> {
        let mut dir = self.repo_root.join(path).parent()?.to_path_buf();

        loop {
            if !dir.starts_with(&self.repo_root) {
                return None;
            }
            if let Some(found) = self.descriptor_in(&dir) {
                return Some(found);
            }
            if dir == self.repo_root {
                return None;
            }
            dir = dir.parent()?.to_path_buf();
        }
    }

    /// First descriptor in `dir` by name, non-recursive.
    fn descriptor_in(&self, dir: &Path) -> Option<PathBuf> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "cannot list directory");
                return None;
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && self.is_descriptor(p))
            .min()
    }

    fn is_descriptor(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.descriptor_extension))
    }
}
