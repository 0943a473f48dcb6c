//! Package assembly: copy static files and build artifacts into a tree that
//! mirrors repository-relative paths.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::domain::change::ChangeRecord;
use crate::domain::error::{DeltaError, Result};
use crate::domain::unit::BuildResult;

/// Directory under each unit's relative path that receives its artifact.
pub const ARTIFACT_DIR: &str = "bin";

/// Writes into a package root. Every destination is derived from a
/// repository-relative path, so distinct sources never share a destination.
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    repo_root: PathBuf,
    package_root: PathBuf,
}

impl PackageAssembler {
    pub fn new(repo_root: impl Into<PathBuf>, package_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            package_root: package_root.into(),
        }
    }

    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    /// Copy each static file to `package_root/<relative path>`, overwriting.
    ///
    /// Returns the number of files copied.
    pub fn copy_static(&self, static_files: &[ChangeRecord]) -> Result<usize> {
        for record in static_files {
            let source = self.repo_root.join(&record.path);
            let dest = self.package_root.join(&record.path);
            copy_file(&source, &dest)?;
            debug!(path = %record.path.display(), "copied static file");
        }
        if !static_files.is_empty() {
            info!(count = static_files.len(), "copied static files");
        }
        Ok(static_files.len())
    }

    /// Copy a successful unit's artifact to
    /// `package_root/<descriptor dir relative to repo>/bin/`.
    ///
    /// Returns the destination, or `None` when the result has no artifact.
    pub fn place_artifact(&self, result: &BuildResult) -> Result<Option<PathBuf>> {
        let Some(artifact) = result.artifact_path.as_deref() else {
            return Ok(None);
        };
        let Some(file_name) = artifact.file_name() else {
            return Ok(None);
        };

        let dest = self.artifact_dir_for(result)?.join(file_name);
        copy_file(artifact, &dest)?;
        info!(unit = %result.unit.name, dest = %dest.display(), "placed build artifact");
        Ok(Some(dest))
    }

    /// Destination directory for a unit's artifact.
    pub fn artifact_dir_for(&self, result: &BuildResult) -> Result<PathBuf> {
        let unit_dir = result.unit.directory();
        let relative = unit_dir.strip_prefix(&self.repo_root).map_err(|_| {
            DeltaError::InvalidInput(format!(
                "descriptor {} is outside repository {}",
                result.unit.descriptor_path.display(),
                self.repo_root.display()
            ))
        })?;
        Ok(self.package_root.join(relative).join(ARTIFACT_DIR))
    }
}

/// Copy `source` to `dest`, creating parent directories first.
///
/// The content lands in a temporary file beside `dest` and is renamed into
/// place, so a failed copy never leaves a truncated destination.
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| {
            DeltaError::copy_failed(
                dest,
                io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"),
            )
        })?;
    fs::create_dir_all(parent).map_err(|e| DeltaError::copy_failed(parent, e))?;

    let mut reader = File::open(source).map_err(|e| DeltaError::copy_failed(source, e))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| DeltaError::copy_failed(dest, e))?;
    io::copy(&mut reader, &mut tmp).map_err(|e| DeltaError::copy_failed(dest, e))?;
    // Temp files are created owner-only; keep the source's mode instead.
    let permissions = reader
        .metadata()
        .map_err(|e| DeltaError::copy_failed(source, e))?
        .permissions();
    fs::set_permissions(tmp.path(), permissions).map_err(|e| DeltaError::copy_failed(dest, e))?;
    tmp.persist(dest)
        .map_err(|e| DeltaError::copy_failed(dest, e.error))?;
    Ok(())
}
