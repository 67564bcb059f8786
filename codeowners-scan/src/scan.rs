use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    engine::{Classification, MatchEngine},
    owner::{Owner, TeamPrefix},
    patternset,
    table::{OwnershipEntry, PatternTable},
};

/// Change status of a file in a pull request, as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
}

impl ChangedFile {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}

/// The files of a proposed change, in the order the platform listed them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub files: Vec<ChangedFile>,
    pub base_ref: String,
    pub head_ref: String,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub team_prefix: TeamPrefix,
    /// Files matching any of these patterns are not examined.
    pub ignore_patterns: Vec<String>,
    /// Examine only newly added files instead of added and modified ones.
    pub added_only: bool,
}

impl ScanOptions {
    pub fn new(team_prefix: TeamPrefix) -> Self {
        Self {
            team_prefix,
            ignore_patterns: Vec::new(),
            added_only: false,
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn with_added_only(mut self, added_only: bool) -> Self {
        self.added_only = added_only;
        self
    }
}

/// Split a `paths_to_ignore` value (comma or newline separated) into patterns.
pub fn parse_ignore_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Ownership of a single examined file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOwnership {
    pub path: String,
    pub classification: Classification,
    /// Owner of the last matching entry, for display.
    pub winning_owner: Option<Owner>,
}

/// The outcome of a scan. `unowned`, `individually_owned`, `team_owned` and
/// `unassigned` partition `files_examined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedResult {
    pub files: Vec<FileOwnership>,
    pub unowned: Vec<String>,
    pub individually_owned: Vec<String>,
    pub team_owned: Vec<String>,
    pub unassigned: Vec<String>,
    pub files_examined: Vec<String>,
    pub ignored: Vec<String>,
    pub patterns: Vec<OwnershipEntry>,
    pub source_files: Vec<String>,
}

impl ClassifiedResult {
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn has_violations(&self) -> bool {
        !self.unowned.is_empty() || !self.individually_owned.is_empty()
    }

    /// One-line description of the violations, if there are any.
    pub fn summary(&self) -> Option<String> {
        let parts = [
            (!self.unowned.is_empty()).then(|| {
                format!(
                    "{} file(s) are not covered by a CODEOWNERS rule",
                    self.unowned.len()
                )
            }),
            (!self.individually_owned.is_empty()).then(|| {
                format!(
                    "{} file(s) are covered by a CODEOWNERS rule that is a user but should be a team",
                    self.individually_owned.len()
                )
            }),
        ];
        let parts = parts.into_iter().flatten().collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" and "))
        }
    }
}

/// Classify every added or changed file of `change_set` against `table`.
/// The result depends only on the inputs.
pub fn scan(change_set: &ChangeSet, table: &PatternTable, options: &ScanOptions) -> ClassifiedResult {
    let (ignore_matcher, rejected) = patternset::compile_lossy(&options.ignore_patterns);
    for (pattern, error) in rejected {
        warn!(pattern = %pattern, "skipping ignore pattern: {}", error);
    }

    let mut files_examined = Vec::new();
    let mut ignored = Vec::new();
    for file in &change_set.files {
        let in_scope = match file.status {
            FileStatus::Removed => false,
            FileStatus::Added => true,
            _ => !options.added_only,
        };
        if !in_scope {
            debug!(path = %file.path, status = ?file.status, "skipping file");
        } else if ignore_matcher.is_match(&file.path) {
            debug!(path = %file.path, "ignoring file");
            ignored.push(file.path.clone());
        } else {
            files_examined.push(file.path.clone());
        }
    }

    let engine = MatchEngine::new(table, &options.team_prefix);
    let files = classify_all(&engine, &files_examined);

    let mut result = ClassifiedResult {
        files: Vec::with_capacity(files.len()),
        unowned: Vec::new(),
        individually_owned: Vec::new(),
        team_owned: Vec::new(),
        unassigned: Vec::new(),
        files_examined,
        ignored,
        patterns: table.entries().to_vec(),
        source_files: table.source_files().to_vec(),
    };
    for file in files {
        let bucket = match file.classification {
            Classification::Unmatched => &mut result.unowned,
            Classification::OwnedByIndividual => &mut result.individually_owned,
            Classification::OwnedByTeam => &mut result.team_owned,
            Classification::Unassigned => &mut result.unassigned,
        };
        bucket.push(file.path.clone());
        result.files.push(file);
    }

    info!(
        examined = result.files_examined.len(),
        unowned = result.unowned.len(),
        individually_owned = result.individually_owned.len(),
        "scanned {} files against {} patterns from {} declaration files",
        result.files_examined.len(),
        result.pattern_count(),
        result.source_files.len()
    );
    result
}

#[cfg(feature = "rayon")]
fn classify_all(engine: &MatchEngine<'_>, paths: &[String]) -> Vec<FileOwnership> {
    use rayon::prelude::*;

    paths.par_iter().map(|path| classify_file(engine, path)).collect()
}

#[cfg(not(feature = "rayon"))]
fn classify_all(engine: &MatchEngine<'_>, paths: &[String]) -> Vec<FileOwnership> {
    paths.iter().map(|path| classify_file(engine, path)).collect()
}

fn classify_file(engine: &MatchEngine<'_>, path: &str) -> FileOwnership {
    let classification = engine.classify(path);
    let winning_owner = engine
        .winning_entry(path)
        .and_then(|entry| entry.owner.clone());
    debug!(path = %path, ?classification, "classified file");

    FileOwnership {
        path: path.to_owned(),
        classification,
        winning_owner,
    }
}
