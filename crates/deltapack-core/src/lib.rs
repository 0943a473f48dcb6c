//! deltapack Core Library
//!
//! Turns a commit range into the inputs of an incremental deployment package:
//! the classified diff, the build units owning changed sources, and the
//! package tree those feed into.

pub mod archive;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod descriptor;
pub mod domain;
pub mod git;
pub mod resolve;
pub mod telemetry;

pub use domain::{
    normalize_repo_path, BuildOutcome, BuildResult, BuildUnit, ChangeRecord, ChangeStatus,
    ClassifiedChangeSet, DeltaError, PackageSummary, PreviewReport, ProjectKind, Result,
    UnitFailure,
};

pub use archive::{archive_path_for, create_archive, ArchiveInfo, ARCHIVE_EXTENSION};
pub use assemble::{PackageAssembler, ARTIFACT_DIR};
pub use classify::{
    classify, classify_records, parse_name_status_z, ClassifierConfig, COMPILED_EXTENSION,
    DEFAULT_STATIC_EXTENSIONS,
};
pub use config::{DeltaConfig, ProjectProfile, DEFAULT_CONFIG_FILE};
pub use descriptor::{DescriptorClassifier, DescriptorRule, DESCRIPTOR_EXTENSION};
pub use git::{is_git_repo, RevisionRange, MAX_REVISION_COUNT};
pub use resolve::BuildUnitResolver;
pub use telemetry::init_tracing;
