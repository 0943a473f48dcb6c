//! Domain models for deltapack.
//!
//! Canonical definitions for the core entities:
//! - `ChangeRecord` / `ClassifiedChangeSet`: what the commit range touched
//! - `BuildUnit`: a project boundary owning compiled sources
//! - `BuildResult`: outcome of rebuilding one unit
//! - `PackageSummary` / `PreviewReport`: what is handed back to the caller

pub mod change;
pub mod error;
pub mod summary;
pub mod unit;

pub use change::{normalize_repo_path, ChangeRecord, ChangeStatus, ClassifiedChangeSet};
pub use error::{DeltaError, Result};
pub use summary::{PackageSummary, PreviewReport, UnitFailure};
pub use unit::{BuildOutcome, BuildResult, BuildUnit, ProjectKind};
