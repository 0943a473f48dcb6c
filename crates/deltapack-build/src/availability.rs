//! Host tool probing, run once by the orchestrator before the pipeline.

use std::process::{Command, Stdio};

use deltapack_core::{DeltaError, Result};
use tracing::{debug, warn};

use crate::toolchain::{ToolCommand, Toolchain};

/// Which build tools were found on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAvailability {
    pub modern: bool,
    pub legacy: bool,
}

impl ToolAvailability {
    /// Assume every tool is present.
    pub fn all() -> Self {
        Self {
            modern: true,
            legacy: true,
        }
    }
}

/// True when `tool` can be spawned. Its exit code is ignored.
pub fn tool_available(tool: &ToolCommand) -> bool {
    let found = Command::new(&tool.program)
        .args(&tool.version_args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok();
    debug!(tool = %tool.program, found, "checked build tool");
    found
}

/// Check everything the pipeline needs.
///
/// `git` is always required. The modern tool is required unless
/// `require_modern` is false (dry runs build nothing). A missing legacy tool is
/// only a warning: legacy units are skipped later.
pub fn check_prerequisites(toolchain: &Toolchain, require_modern: bool) -> Result<ToolAvailability> {
    let git = ToolCommand::new("git", &["--version"]);
    if !tool_available(&git) {
        return Err(DeltaError::ToolMissing {
            tool: git.program,
        });
    }

    let modern = tool_available(&toolchain.modern);
    if require_modern && !modern {
        return Err(DeltaError::ToolMissing {
            tool: toolchain.modern.program.clone(),
        });
    }

    let legacy = tool_available(&toolchain.legacy);
    if !legacy {
        warn!(
            tool = %toolchain.legacy.program,
            "legacy build tool not found, legacy projects will be skipped"
        );
    }

    Ok(ToolAvailability { modern, legacy })
}
