//! Change records produced by a revision comparison.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a diffed path, taken from the leading letter of the
/// `--name-status` token (`M`, `A`, `R100`, ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
    /// Any other letter git may emit (`U`, `X`, ...).
    Other(char),
}

impl ChangeStatus {
    /// Parse a status token. Returns `None` for deletions and empty tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        let code = token.trim().chars().next()?;
        let status = match code.to_ascii_uppercase() {
            'D' => return None,
            'A' => ChangeStatus::Added,
            'M' => ChangeStatus::Modified,
            'R' => ChangeStatus::Renamed,
            'C' => ChangeStatus::Copied,
            'T' => ChangeStatus::TypeChanged,
            other => ChangeStatus::Other(other),
        };
        Some(status)
    }

    /// Single-letter code as reported by git.
    pub fn code(&self) -> char {
        match self {
            ChangeStatus::Added => 'A',
            ChangeStatus::Modified => 'M',
            ChangeStatus::Renamed => 'R',
            ChangeStatus::Copied => 'C',
            ChangeStatus::TypeChanged => 'T',
            ChangeStatus::Other(c) => *c,
        }
    }
}

/// One diffed path. Never a deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRecord {
    pub status: ChangeStatus,

    /// Repository-relative path using the platform separator.
    pub path: PathBuf,
}

impl ChangeRecord {
    /// Build a record from a slash-separated repository path.
    pub fn new(status: ChangeStatus, slash_path: &str) -> Self {
        Self {
            status,
            path: normalize_repo_path(slash_path),
        }
    }

    /// Lowercased extension without the leading dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Convert a slash-separated repository path into a platform path.
///
/// Empty and `.` segments are dropped so `./a//b` and `a/b` compare equal.
pub fn normalize_repo_path(slash_path: &str) -> PathBuf {
    slash_path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect()
}

/// Change records partitioned into the two buckets the pipeline acts on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifiedChangeSet {
    /// Records copied verbatim into the package.
    pub static_files: Vec<ChangeRecord>,

    /// Records whose owning build unit must be rebuilt.
    pub compiled_files: Vec<ChangeRecord>,

    /// Every non-deletion record in the diff, including ones in neither bucket.
    pub total_changes: usize,
}

impl ClassifiedChangeSet {
    /// Records that matched neither bucket.
    pub fn unclassified_count(&self) -> usize {
        self.total_changes
            .saturating_sub(self.static_files.len() + self.compiled_files.len())
    }

    pub fn is_empty(&self) -> bool {
        self.static_files.is_empty() && self.compiled_files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_token() {
        assert_eq!(ChangeStatus::from_token("M"), Some(ChangeStatus::Modified));
        assert_eq!(ChangeStatus::from_token("A"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_token("R100"), Some(ChangeStatus::Renamed));
        assert_eq!(ChangeStatus::from_token("C075"), Some(ChangeStatus::Copied));
        assert_eq!(ChangeStatus::from_token("T"), Some(ChangeStatus::TypeChanged));
        assert_eq!(ChangeStatus::from_token("U"), Some(ChangeStatus::Other('U')));
    }

    #[test]
    fn test_deletion_and_empty_tokens_rejected() {
        assert_eq!(ChangeStatus::from_token("D"), None);
        assert_eq!(ChangeStatus::from_token("d"), None);
        assert_eq!(ChangeStatus::from_token(""), None);
        assert_eq!(ChangeStatus::from_token("   "), None);
    }

    #[test]
    fn test_normalize_repo_path() {
        let expected: PathBuf = ["lib", "Foo", "Foo.cs"].iter().collect();
        assert_eq!(normalize_repo_path("lib/Foo/Foo.cs"), expected);
        assert_eq!(normalize_repo_path("./lib//Foo/Foo.cs"), expected);
    }

    #[test]
    fn test_extension_is_lowercased() {
        let record = ChangeRecord::new(ChangeStatus::Modified, "web/Site.CSS");
        assert_eq!(record.extension().as_deref(), Some("css"));

        let record = ChangeRecord::new(ChangeStatus::Added, "Makefile");
        assert_eq!(record.extension(), None);
    }

    #[test]
    fn test_unclassified_count() {
        let set = ClassifiedChangeSet {
            static_files: vec![ChangeRecord::new(ChangeStatus::Added, "a.css")],
            compiled_files: vec![ChangeRecord::new(ChangeStatus::Added, "b.cs")],
            total_changes: 5,
        };
        assert_eq!(set.unclassified_count(), 3);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_unclassified_count_never_underflows() {
        let set = ClassifiedChangeSet {
            static_files: vec![ChangeRecord::new(ChangeStatus::Added, "a.css")],
            compiled_files: vec![ChangeRecord::new(ChangeStatus::Added, "b.cs")],
            total_changes: 0,
        };
        assert_eq!(set.unclassified_count(), 0);
    }
}
