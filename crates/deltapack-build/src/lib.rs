//! deltapack Build - build dispatch and package pipeline
//!
//! Provides the delta-to-package pipeline that:
//! - Classifies a commit range into static and compiled changes
//! - Builds each affected unit with the modern or legacy toolchain
//! - Runs builds concurrently, each in its own temp directory
//! - Assembles copied files and build artifacts into one package tree

pub mod availability;
pub mod pipeline;
pub mod pool;
pub mod runner;
pub mod toolchain;

// Re-export key types
pub use availability::{check_prerequisites, tool_available, ToolAvailability};
pub use pipeline::{DeltaPipeline, PackageOutcome, PackageRequest, BUILD_TEMP_PREFIX};
pub use pool::BuildPool;
pub use runner::{execute_step, locate_artifact, BuildExecutor, ProcessBuildExecutor, StepOutput};
pub use toolchain::{BuildStep, ToolCommand, Toolchain, ARTIFACT_EXTENSION};
