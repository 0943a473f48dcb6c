//! Build units and their build outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::descriptor::DescriptorClassifier;
use crate::domain::error::Result;

/// How a build unit must be built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// Self-contained build graph, built with the publish command.
    Modern,

    /// Needs the external full build tool.
    Legacy,
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKind::Modern => write!(f, "modern"),
            ProjectKind::Legacy => write!(f, "legacy"),
        }
    }
}

/// A project boundary discovered from a descriptor file.
///
/// Identity is the descriptor's absolute path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildUnit {
    pub descriptor_path: PathBuf,
    pub name: String,
}

impl BuildUnit {
    /// Create a unit from an absolute descriptor path. The name is the file stem.
    pub fn from_descriptor(descriptor_path: impl Into<PathBuf>) -> Self {
        let descriptor_path = descriptor_path.into();
        let name = descriptor_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            descriptor_path,
            name,
        }
    }

    /// Directory holding the descriptor.
    pub fn directory(&self) -> &Path {
        self.descriptor_path.parent().unwrap_or(Path::new(""))
    }

    /// Read the descriptor and decide how this unit is built.
    pub fn kind(&self, classifier: &DescriptorClassifier) -> Result<ProjectKind> {
        let content = std::fs::read_to_string(&self.descriptor_path)?;
        Ok(classifier.classify(&content))
    }
}

impl fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// What happened when a unit was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BuildOutcome {
    /// Build succeeded and the artifact was found.
    Built,

    /// Build process exited non-zero, timed out or could not be spawned.
    Failed { exit_code: i32, reason: String },

    /// Build exited zero but no `<name>.<ext>` file was produced.
    ArtifactMissing,

    /// Unit was not built at all.
    Skipped { reason: String },
}

/// Outcome of building one [`BuildUnit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub unit: BuildUnit,

    /// Kind the unit was dispatched as, when the descriptor could be read.
    pub kind: Option<ProjectKind>,

    /// Isolated output directory the build wrote into.
    pub output_directory: PathBuf,

    /// Located primary artifact. Its file stem always equals `unit.name`.
    pub artifact_path: Option<PathBuf>,

    pub outcome: BuildOutcome,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildResult {
    /// Result for a unit that was never handed to a build tool.
    pub fn skipped(unit: BuildUnit, output_directory: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            unit,
            kind: None,
            output_directory,
            artifact_path: None,
            outcome: BuildOutcome::Skipped {
                reason: reason.into(),
            },
            duration_ms: 0,
        }
    }

    /// Process succeeded and an artifact is available.
    pub fn succeeded(&self) -> bool {
        self.outcome == BuildOutcome::Built && self.artifact_path.is_some()
    }

    /// Human-readable reason this unit is missing from the package.
    pub fn failure_reason(&self) -> Option<String> {
        match &self.outcome {
            BuildOutcome::Built if self.artifact_path.is_some() => None,
            BuildOutcome::Built | BuildOutcome::ArtifactMissing => Some(format!(
                "no {} artifact found under {}",
                self.unit.name,
                self.output_directory.display()
            )),
            BuildOutcome::Failed { exit_code, reason } => {
                Some(format!("exit code {exit_code}: {reason}"))
            }
            BuildOutcome::Skipped { reason } => Some(format!("skipped: {reason}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_name_from_descriptor() {
        let unit = BuildUnit::from_descriptor("/repo/lib/Foo/Foo.csproj");
        assert_eq!(unit.name, "Foo");
        assert_eq!(unit.directory(), Path::new("/repo/lib/Foo"));
        assert_eq!(unit.to_string(), "Foo");
    }

    #[test]
    fn test_unit_name_keeps_inner_dots() {
        let unit = BuildUnit::from_descriptor("/repo/src/Acme.Web.Api.csproj");
        assert_eq!(unit.name, "Acme.Web.Api");
    }

    #[test]
    fn test_succeeded_requires_artifact() {
        let unit = BuildUnit::from_descriptor("/repo/Foo/Foo.csproj");
        let mut result = BuildResult {
            unit,
            kind: Some(ProjectKind::Modern),
            output_directory: PathBuf::from("/tmp/build/Foo"),
            artifact_path: Some(PathBuf::from("/tmp/build/Foo/Foo.dll")),
            outcome: BuildOutcome::Built,
            duration_ms: 10,
        };
        assert!(result.succeeded());
        assert!(result.failure_reason().is_none());

        result.artifact_path = None;
        assert!(!result.succeeded());
        assert!(result.failure_reason().unwrap().contains("no Foo artifact"));
    }

    #[test]
    fn test_failed_outcome_reason() {
        let unit = BuildUnit::from_descriptor("/repo/Bar/Bar.csproj");
        let result = BuildResult {
            unit,
            kind: Some(ProjectKind::Legacy),
            output_directory: PathBuf::from("/tmp/build/Bar"),
            artifact_path: None,
            outcome: BuildOutcome::Failed {
                exit_code: 1,
                reason: "CS1002: ; expected".to_string(),
            },
            duration_ms: 10,
        };
        assert!(!result.succeeded());
        let reason = result.failure_reason().unwrap();
        assert!(reason.contains("exit code 1"));
        assert!(reason.contains("CS1002"));
    }

    #[test]
    fn test_skipped_result() {
        let unit = BuildUnit::from_descriptor("/repo/Old/Old.csproj");
        let result = BuildResult::skipped(unit, PathBuf::from("/tmp/build/Old"), "msbuild not found");
        assert!(!result.succeeded());
        assert_eq!(result.kind, None);
        assert!(result.failure_reason().unwrap().contains("msbuild not found"));
    }
}
