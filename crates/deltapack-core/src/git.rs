//! Git integration: revision comparison and display-only history output.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::error::{DeltaError, Result};

/// Upper bound on the commit count accepted from callers.
pub const MAX_REVISION_COUNT: u32 = 500;

/// A pair of revisions to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRange {
    pub from: String,
    pub to: String,
}

impl RevisionRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The last `count` commits: `HEAD~count..HEAD`.
    pub fn last_commits(count: u32) -> Result<Self> {
        if count == 0 || count > MAX_REVISION_COUNT {
            return Err(DeltaError::InvalidInput(format!(
                "revision count must be between 1 and {MAX_REVISION_COUNT}, got {count}"
            )));
        }
        Ok(Self::new(format!("HEAD~{count}"), "HEAD"))
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

fn run_git(repo_dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .map_err(|e| DeltaError::DiffUnavailable(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeltaError::DiffUnavailable(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Raw `git diff --name-status -z` output between the two revisions:
/// NUL-separated status and path fields, paths unquoted.
///
/// Fails with [`DeltaError::DiffUnavailable`] when either revision does not
/// resolve, which includes asking for more commits than the history holds.
pub fn diff_name_status(repo_dir: &Path, range: &RevisionRange) -> Result<String> {
    run_git(
        repo_dir,
        &["diff", "--name-status", "-z", &range.from, &range.to],
    )
}

/// One-line-per-commit log of the range. Display only.
pub fn commit_log(repo_dir: &Path, range: &RevisionRange) -> Result<String> {
    let revisions = range.to_string();
    run_git(repo_dir, &["log", "--oneline", "--no-decorate", &revisions])
}

/// `git diff --shortstat` summary of the range. Display only.
pub fn diff_stat(repo_dir: &Path, range: &RevisionRange) -> Result<String> {
    run_git(repo_dir, &["diff", "--shortstat", &range.from, &range.to])
        .map(|s| s.trim().to_string())
}

/// Absolute path of the work tree containing `dir`.
pub fn toplevel(dir: &Path) -> Result<PathBuf> {
    let out = run_git(dir, &["rev-parse", "--show-toplevel"])
        .map_err(|_| DeltaError::InvalidInput(format!("{} is not a git repository", dir.display())))?;
    Ok(PathBuf::from(out.trim()))
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
