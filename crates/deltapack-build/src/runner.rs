//! Build dispatch: run one unit's build and locate its artifact.

use async_trait::async_trait;
use deltapack_core::{BuildOutcome, BuildResult, BuildUnit, DescriptorClassifier, ProjectKind};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::availability::ToolAvailability;
use crate::toolchain::{BuildStep, Toolchain};

/// Lines of build output kept in a failure reason.
const FAILURE_TAIL_LINES: usize = 20;

/// Builds one unit into an isolated output directory.
///
/// Implementations never return an error: every failure is recorded on the
/// [`BuildResult`] so sibling builds carry on.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    async fn build(&self, unit: &BuildUnit, output_dir: &Path) -> BuildResult;
}

/// Captured output of a finished build process.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
}

/// Run a build step to completion, enforcing its timeout.
pub async fn execute_step(step: &BuildStep) -> anyhow::Result<StepOutput> {
    let start = Instant::now();

    if step.command.is_empty() {
        anyhow::bail!("Build step {} has empty command", step.name);
    }

    let exe = &step.command[0];
    let args = &step.command[1..];

    let child = Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = if step.timeout_secs > 0 {
        tokio::time::timeout(
            std::time::Duration::from_secs(step.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "Build of {} timed out after {} seconds",
                step.name,
                step.timeout_secs
            )
        })??
    } else {
        child.wait_with_output().await?
    };

    Ok(StepOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        success: output.status.success(),
    })
}

/// First file named `file_name` under `dir`, searching recursively in
/// file-name order.
pub fn locate_artifact(dir: &Path, file_name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| entry.file_name() == std::ffi::OsStr::new(file_name))
        .map(|entry| entry.into_path())
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Runs the modern or legacy tool as external processes.
pub struct ProcessBuildExecutor {
    toolchain: Toolchain,
    classifier: DescriptorClassifier,
    availability: ToolAvailability,
}

impl ProcessBuildExecutor {
    pub fn new(
        toolchain: Toolchain,
        classifier: DescriptorClassifier,
        availability: ToolAvailability,
    ) -> Self {
        Self {
            toolchain,
            classifier,
            availability,
        }
    }

    fn failed(
        unit: &BuildUnit,
        kind: Option<ProjectKind>,
        output_dir: &Path,
        exit_code: i32,
        reason: String,
        duration_ms: u64,
    ) -> BuildResult {
        warn!(unit = %unit.name, exit_code, reason = %reason, "build failed");
        BuildResult {
            unit: unit.clone(),
            kind,
            output_directory: output_dir.to_path_buf(),
            artifact_path: None,
            outcome: BuildOutcome::Failed { exit_code, reason },
            duration_ms,
        }
    }
}

#[async_trait]
impl BuildExecutor for ProcessBuildExecutor {
    async fn build(&self, unit: &BuildUnit, output_dir: &Path) -> BuildResult {
        let kind = match unit.kind(&self.classifier) {
            Ok(kind) => kind,
            Err(e) => {
                return Self::failed(
                    unit,
                    None,
                    output_dir,
                    -1,
                    format!("cannot read {}: {e}", unit.descriptor_path.display()),
                    0,
                )
            }
        };

        if kind == ProjectKind::Legacy && !self.availability.legacy {
            warn!(
                unit = %unit.name,
                tool = %self.toolchain.legacy.program,
                "legacy build tool unavailable, skipping unit"
            );
            return BuildResult {
                kind: Some(kind),
                ..BuildResult::skipped(
                    unit.clone(),
                    output_dir.to_path_buf(),
                    format!("{} not available", self.toolchain.legacy.program),
                )
            };
        }

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            return Self::failed(
                unit,
                Some(kind),
                output_dir,
                -1,
                format!("cannot create {}: {e}", output_dir.display()),
                0,
            );
        }

        let step = self.toolchain.step_for(unit, kind, output_dir);
        info!(unit = %unit.name, kind = %kind, "building unit");

        let output = match execute_step(&step).await {
            Ok(output) => output,
            Err(e) => return Self::failed(unit, Some(kind), output_dir, -1, e.to_string(), 0),
        };

        if !output.success {
            let log = if output.stderr.trim().is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            return Self::failed(
                unit,
                Some(kind),
                output_dir,
                output.exit_code,
                tail(log, FAILURE_TAIL_LINES),
                output.duration_ms,
            );
        }

        let file_name = self.toolchain.artifact_file_name(unit);
        let artifact_path = locate_artifact(output_dir, &file_name);
        let outcome = match &artifact_path {
            Some(path) => {
                info!(unit = %unit.name, artifact = %path.display(), duration_ms = output.duration_ms, "unit built");
                BuildOutcome::Built
            }
            None => {
                warn!(unit = %unit.name, expected = %file_name, "build succeeded but no artifact was produced");
                BuildOutcome::ArtifactMissing
            }
        };

        BuildResult {
            unit: unit.clone(),
            kind: Some(kind),
            output_directory: output_dir.to_path_buf(),
            artifact_path,
            outcome,
            duration_ms: output.duration_ms,
        }
    }
}
