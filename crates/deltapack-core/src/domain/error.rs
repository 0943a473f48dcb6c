//! Error taxonomy for deltapack.

use std::path::PathBuf;

/// deltapack errors.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("diff unavailable: {0}")]
    DiffUnavailable(String),

    #[error("required tool not found: {tool}")]
    ToolMissing { tool: String },

    #[error("build failed for {unit}: {reason}")]
    BuildFailed { unit: String, reason: String },

    #[error("copy failed for {}: {source}", path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeltaError {
    /// Wrap an I/O error raised while writing `path` into the package tree.
    pub fn copy_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CopyFailed {
            path: path.into(),
            source,
        }
    }
}

/// Result type for deltapack operations.
pub type Result<T> = std::result::Result<T, DeltaError>;
