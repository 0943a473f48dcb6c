//! Optional JSON configuration document.
//!
//! Every key is a convenience default. A missing file yields
//! [`DeltaConfig::default`]; a malformed one is rejected before anything runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::{ClassifierConfig, COMPILED_EXTENSION, DEFAULT_STATIC_EXTENSIONS};
use crate::domain::error::{DeltaError, Result};

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "deltapack.json";

pub const DEFAULT_BUILD_CONFIGURATION: &str = "Release";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_MODERN_TOOL: &str = "dotnet";
pub const DEFAULT_LEGACY_TOOL: &str = "msbuild";
pub const DEFAULT_STALE_PACKAGE_MAX_AGE_HOURS: u64 = 24;

/// A named repository with its own package location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectProfile {
    pub name: String,
    pub repo_path: PathBuf,
    #[serde(default)]
    pub package_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DeltaConfig {
    /// Parent folder for generated packages. Defaults to the system temp dir.
    #[serde(default)]
    pub default_output_folder: Option<PathBuf>,

    /// Extensions copied verbatim. Replaces the built-in list when present.
    #[serde(default)]
    pub static_extensions: Option<Vec<String>>,

    #[serde(default)]
    pub projects: Vec<ProjectProfile>,

    /// Concurrent builds. Defaults to the processor count; 1 is sequential.
    #[serde(default)]
    pub max_parallel_builds: Option<usize>,

    #[serde(default)]
    pub build_configuration: Option<String>,

    /// Per-unit build timeout; 0 disables it.
    #[serde(default)]
    pub build_timeout_secs: Option<u64>,

    #[serde(default)]
    pub modern_tool: Option<String>,

    #[serde(default)]
    pub legacy_tool: Option<String>,

    #[serde(default)]
    pub stale_package_max_age_hours: Option<u64>,
}

impl DeltaConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] in the working
    /// directory. A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).map_err(|e| {
                DeltaError::InvalidInput(format!("malformed config {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_parallel_builds == Some(0) {
            return Err(DeltaError::InvalidInput(
                "MaxParallelBuilds must be at least 1".to_string(),
            ));
        }
        if let Some(dup) = self
            .projects
            .iter()
            .enumerate()
            .find(|(i, p)| self.projects[..*i].iter().any(|q| q.name.eq_ignore_ascii_case(&p.name)))
            .map(|(_, p)| &p.name)
        {
            return Err(DeltaError::InvalidInput(format!(
                "duplicate project name: {dup}"
            )));
        }
        Ok(())
    }

    /// Look up a project profile by name, case-insensitively.
    pub fn project(&self, name: &str) -> Option<&ProjectProfile> {
        self.projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn classifier(&self) -> ClassifierConfig {
        match &self.static_extensions {
            Some(exts) => ClassifierConfig::new(exts, COMPILED_EXTENSION),
            None => ClassifierConfig::new(DEFAULT_STATIC_EXTENSIONS.iter().copied(), COMPILED_EXTENSION),
        }
    }

    /// Parent folder for packages when none is given explicitly.
    pub fn output_folder(&self) -> PathBuf {
        self.default_output_folder
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn max_parallel_builds(&self) -> usize {
        self.max_parallel_builds.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn build_configuration(&self) -> &str {
        self.build_configuration
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_CONFIGURATION)
    }

    pub fn build_timeout_secs(&self) -> u64 {
        self.build_timeout_secs.unwrap_or(DEFAULT_BUILD_TIMEOUT_SECS)
    }

    pub fn modern_tool(&self) -> &str {
        self.modern_tool.as_deref().unwrap_or(DEFAULT_MODERN_TOOL)
    }

    pub fn legacy_tool(&self) -> &str {
        self.legacy_tool.as_deref().unwrap_or(DEFAULT_LEGACY_TOOL)
    }

    pub fn stale_package_max_age_hours(&self) -> u64 {
        self.stale_package_max_age_hours
            .unwrap_or(DEFAULT_STALE_PACKAGE_MAX_AGE_HOURS)
    }
}
