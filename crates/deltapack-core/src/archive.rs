//! Compress an assembled package into a single `.tar.gz` next to it.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::info;

use crate::domain::error::{DeltaError, Result};

pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// A written archive and its content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub sha256: String,
}

/// `<package_root>.tar.gz`
pub fn archive_path_for(package_root: &Path) -> PathBuf {
    let mut name = OsString::from(package_root.as_os_str());
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    PathBuf::from(name)
}

fn archive_err(e: io::Error) -> DeltaError {
    DeltaError::Archive(e.to_string())
}

/// Archive `package_root` to [`archive_path_for`], replacing any existing
/// archive. Entries are stored under the package folder's own name.
pub fn create_archive(package_root: &Path) -> Result<ArchiveInfo> {
    if !package_root.is_dir() {
        return Err(DeltaError::Archive(format!(
            "package folder {} does not exist",
            package_root.display()
        )));
    }
    let dest = archive_path_for(package_root);
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let top_level = package_root
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("package"));

    let tmp = NamedTempFile::new_in(parent).map_err(archive_err)?;
    let mut builder = tar::Builder::new(GzEncoder::new(tmp, Compression::default()));
    builder.follow_symlinks(false);
    builder
        .append_dir_all(&top_level, package_root)
        .map_err(archive_err)?;
    let tmp = builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(archive_err)?;
    tmp.persist(&dest).map_err(|e| archive_err(e.error))?;

    let sha256 = sha256_file(&dest)?;
    info!(archive = %dest.display(), sha256 = %sha256, "wrote package archive");
    Ok(ArchiveInfo { path: dest, sha256 })
}

/// Hex SHA-256 of a file's content.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
