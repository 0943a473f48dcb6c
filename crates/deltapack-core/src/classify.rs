//! Diff classification: raw comparison output to a [`ClassifiedChangeSet`].

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::domain::change::{ChangeRecord, ChangeStatus, ClassifiedChangeSet};
use crate::domain::error::Result;
use crate::git::{self, RevisionRange};

/// Extensions copied verbatim when no configuration overrides them.
pub const DEFAULT_STATIC_EXTENSIONS: &[&str] = &[
    "aspx", "ascx", "asax", "ashx", "master", "cshtml", "html", "htm", "css", "js", "map", "json",
    "xml", "config", "txt", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf",
    "eot",
];

/// Extension of sources that are compiled into a build unit.
pub const COMPILED_EXTENSION: &str = "cs";

/// Separator between fields of `-z` diff output.
const FIELD_DELIMITER: char = '\0';

/// Extension rules for partitioning change records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    static_extensions: BTreeSet<String>,
    compiled_extension: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_EXTENSIONS.iter().copied(), COMPILED_EXTENSION)
    }
}

impl ClassifierConfig {
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn new<I, S>(static_extensions: I, compiled_extension: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            static_extensions: static_extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
            compiled_extension: normalize_extension(compiled_extension),
        }
    }

    pub fn is_static(&self, record: &ChangeRecord) -> bool {
        record
            .extension()
            .is_some_and(|ext| self.static_extensions.contains(&ext))
    }

    pub fn is_compiled(&self, record: &ChangeRecord) -> bool {
        record
            .extension()
            .is_some_and(|ext| ext == self.compiled_extension)
    }

    pub fn static_extensions(&self) -> impl Iterator<Item = &str> {
        self.static_extensions.iter().map(String::as_str)
    }
}

/// Lowercase and strip any leading dots: `.CSS` -> `css`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Parse `git diff --name-status -z` output, dropping deletions.
///
/// Fields are NUL-separated and never quoted, so paths may contain tabs or
/// newlines. Rename and copy entries carry two paths; the destination is kept.
pub fn parse_name_status_z(raw: &str) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    let mut fields = raw.split(FIELD_DELIMITER);

    while let Some(token) = fields.next() {
        if token.trim().is_empty() {
            continue;
        }
        let path_count = match token.chars().next() {
            Some('R') | Some('C') => 2,
            _ => 1,
        };
        let paths: Vec<&str> = fields.by_ref().take(path_count).collect();
        let Some(path) = paths.last().copied().filter(|p| !p.is_empty()) else {
            debug!(token, "ignoring diff entry without a path");
            continue;
        };

        match ChangeStatus::from_token(token) {
            Some(status) => records.push(ChangeRecord::new(status, path)),
            None => debug!(path, "dropping deleted path"),
        }
    }

    records
}

/// Partition records into static and compiled buckets. Records matching
/// neither bucket still count towards `total_changes`.
pub fn classify_records(records: Vec<ChangeRecord>, config: &ClassifierConfig) -> ClassifiedChangeSet {
    let mut set = ClassifiedChangeSet {
        total_changes: records.len(),
        ..Default::default()
    };

    for record in records {
        if config.is_static(&record) {
            set.static_files.push(record);
        } else if config.is_compiled(&record) {
            set.compiled_files.push(record);
        } else {
            debug!(path = %record.path.display(), "change matches no bucket");
        }
    }

    set
}

/// Compare two revisions of `repo_dir` and classify the result.
pub fn classify(
    repo_dir: &Path,
    range: &RevisionRange,
    config: &ClassifierConfig,
) -> Result<ClassifiedChangeSet> {
    let raw = git::diff_name_status(repo_dir, range)?;
    let set = classify_records(parse_name_status_z(&raw), config);
    debug!(
        from = %range.from,
        to = %range.to,
        total = set.total_changes,
        static_files = set.static_files.len(),
        compiled_files = set.compiled_files.len(),
        "classified diff"
    );
    Ok(set)
}
