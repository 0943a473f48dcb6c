//! Build tool definitions and per-unit command construction.

use deltapack_core::config::{
    DeltaConfig, DEFAULT_BUILD_CONFIGURATION, DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_LEGACY_TOOL,
    DEFAULT_MODERN_TOOL,
};
use deltapack_core::{BuildUnit, ProjectKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension of the primary artifact a unit produces.
pub const ARTIFACT_EXTENSION: &str = "dll";

/// An external executable and the arguments used to check it is installed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub version_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, version_args: &[&str]) -> Self {
        Self {
            program: program.into(),
            version_args: version_args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The two build toolchains and the settings shared by every build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toolchain {
    /// Publishes self-contained (SDK-style) projects.
    pub modern: ToolCommand,

    /// Full build tool for legacy projects.
    pub legacy: ToolCommand,

    /// Build configuration name, e.g. `Release`.
    pub configuration: String,

    /// Per-unit timeout in seconds; 0 disables it.
    pub timeout_secs: u64,

    pub artifact_extension: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            modern: ToolCommand::new(DEFAULT_MODERN_TOOL, &["--version"]),
            legacy: ToolCommand::new(DEFAULT_LEGACY_TOOL, &["-version"]),
            configuration: DEFAULT_BUILD_CONFIGURATION.to_string(),
            timeout_secs: DEFAULT_BUILD_TIMEOUT_SECS,
            artifact_extension: ARTIFACT_EXTENSION.to_string(),
        }
    }
}

impl Toolchain {
    pub fn from_config(config: &DeltaConfig) -> Self {
        let defaults = Self::default();
        Self {
            modern: ToolCommand {
                program: config.modern_tool().to_string(),
                ..defaults.modern
            },
            legacy: ToolCommand {
                program: config.legacy_tool().to_string(),
                ..defaults.legacy
            },
            configuration: config.build_configuration().to_string(),
            timeout_secs: config.build_timeout_secs(),
            artifact_extension: defaults.artifact_extension,
        }
    }

    pub fn tool_for(&self, kind: ProjectKind) -> &ToolCommand {
        match kind {
            ProjectKind::Modern => &self.modern,
            ProjectKind::Legacy => &self.legacy,
        }
    }

    /// Build step for `unit`, writing into `output_dir`.
    pub fn step_for(&self, unit: &BuildUnit, kind: ProjectKind, output_dir: &Path) -> BuildStep {
        let descriptor = unit.descriptor_path.to_string_lossy().into_owned();
        let output = output_dir.to_string_lossy().into_owned();

        let mut command = vec![self.tool_for(kind).program.clone()];
        match kind {
            ProjectKind::Modern => command.extend([
                "publish".to_string(),
                descriptor,
                "-c".to_string(),
                self.configuration.clone(),
                "-o".to_string(),
                output,
            ]),
            ProjectKind::Legacy => command.extend([
                descriptor,
                "/t:Build".to_string(),
                format!("/p:Configuration={}", self.configuration),
                // OutDir must end with a separator.
                format!("/p:OutDir={}{}", output, std::path::MAIN_SEPARATOR),
            ]),
        }

        BuildStep {
            name: unit.name.clone(),
            kind,
            command,
            timeout_secs: self.timeout_secs,
        }
    }

    /// File name the artifact of `unit` must have.
    pub fn artifact_file_name(&self, unit: &BuildUnit) -> String {
        format!("{}.{}", unit.name, self.artifact_extension)
    }
}

/// One external build invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStep {
    /// Unit name.
    pub name: String,

    pub kind: ProjectKind,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Timeout in seconds; 0 disables it.
    pub timeout_secs: u64,
}
