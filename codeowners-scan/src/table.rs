use serde::Serialize;
use tracing::warn;

use crate::{
    owner::Owner,
    parser::ParsedEntry,
    patternset::{self, PatternError},
};

/// One `(pattern, owner)` declaration, together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipEntry {
    pub pattern: String,
    pub owner: Option<Owner>,
    pub source_file: String,
    pub line: usize,
}

impl OwnershipEntry {
    pub fn new(
        pattern: impl Into<String>,
        owner: Option<Owner>,
        source_file: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            owner,
            source_file: source_file.into(),
            line,
        }
    }

    pub(crate) fn from_parsed(entry: ParsedEntry, source_file: &str) -> Self {
        Self::new(entry.pattern, entry.owner, source_file, entry.line)
    }
}

/// An entry whose pattern could not be compiled and was left out of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub entry: OwnershipEntry,
    pub error: PatternError,
}

/// The ordered set of ownership entries from every declaration file that
/// exists, compiled into a single pattern matcher. Order is declaration file
/// order, then line order; the last matching entry is the authoritative one.
#[derive(Clone)]
pub struct PatternTable {
    entries: Vec<OwnershipEntry>,
    source_files: Vec<String>,
    rejected: Vec<RejectedEntry>,
    matcher: patternset::Matcher,
}

impl PatternTable {
    /// A table with no entries, under which every path is unowned.
    pub fn empty() -> Self {
        PatternTableBuilder::new().build()
    }

    pub fn entries(&self) -> &[OwnershipEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declaration files that existed, in the order their entries were added.
    pub fn source_files(&self) -> &[String] {
        &self.source_files
    }

    /// Entries dropped because their pattern failed to compile.
    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }

    /// Every entry whose pattern, tested on its own, matches `path`. Returned
    /// in table order along with each entry's index.
    pub fn matching_entries(&self, path: &str) -> Vec<(usize, &OwnershipEntry)> {
        self.matcher
            .matching_patterns(path)
            .into_iter()
            .map(|idx| (idx, &self.entries[idx]))
            .collect()
    }

    /// The entry that wins under last-match-wins precedence, if any.
    pub fn winning_entry(&self, path: &str) -> Option<&OwnershipEntry> {
        self.matcher
            .matching_patterns(path)
            .into_iter()
            .max()
            .map(|idx| &self.entries[idx])
    }
}

impl std::fmt::Debug for PatternTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternTable")
            .field("entries", &self.entries)
            .field("source_files", &self.source_files)
            .field("rejected", &self.rejected)
            .finish_non_exhaustive()
    }
}

/// Incrementally builds a [`PatternTable`].
#[derive(Default)]
pub struct PatternTableBuilder {
    entries: Vec<OwnershipEntry>,
    source_files: Vec<String>,
    rejected: Vec<RejectedEntry>,
    pattern_set_builder: patternset::Builder,
}

impl PatternTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a declaration file exists and contributes entries.
    pub fn add_source(&mut self, path: impl Into<String>) {
        self.source_files.push(path.into());
    }

    /// Compile and append an entry. An entry whose pattern does not compile
    /// is kept aside as rejected and does not take part in matching.
    pub fn add(&mut self, entry: OwnershipEntry) {
        match self.pattern_set_builder.add(&entry.pattern) {
            Ok(id) => {
                debug_assert_eq!(id, self.entries.len());
                self.entries.push(entry);
            }
            Err(error) => {
                warn!(
                    pattern = %entry.pattern,
                    file = %entry.source_file,
                    line = entry.line,
                    "dropping ownership entry: {}",
                    error
                );
                self.rejected.push(RejectedEntry { entry, error });
            }
        }
    }

    pub fn build(self) -> PatternTable {
        PatternTable {
            entries: self.entries,
            source_files: self.source_files,
            rejected: self.rejected,
            matcher: self.pattern_set_builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, Option<&str>)]) -> PatternTable {
        let mut builder = PatternTableBuilder::new();
        builder.add_source("CODEOWNERS");
        for (idx, (pattern, owner)) in entries.iter().enumerate() {
            builder.add(OwnershipEntry::new(
                *pattern,
                owner.map(Owner::new),
                "CODEOWNERS",
                idx + 1,
            ));
        }
        builder.build()
    }

    #[test]
    fn test_matching_entries_in_table_order() {
        let table = table(&[
            ("*", Some("@org/all")),
            ("src/**", Some("@org/backend")),
            ("src/legacy.go", Some("alice")),
        ]);
        let matched = table
            .matching_entries("src/legacy.go")
            .into_iter()
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        assert_eq!(matched, vec![0, 1, 2]);
        assert_eq!(
            table.winning_entry("src/legacy.go").and_then(|e| e.owner.clone()),
            Some(Owner::new("alice"))
        );
        assert_eq!(
            table.winning_entry("src/api.go").and_then(|e| e.owner.clone()),
            Some(Owner::new("@org/backend"))
        );
    }

    #[test]
    fn test_rejected_entries_do_not_shift_indices() {
        let table = table(&[
            ("docs/", Some("@org/docs")),
            ("!docs/internal", Some("@org/docs")),
            ("src/[a-z].go", Some("bob")),
            ("*.md", Some("@org/writers")),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rejected().len(), 2);
        assert_eq!(table.rejected()[0].error, PatternError::Negation);
        assert_eq!(table.rejected()[1].error, PatternError::CharacterRange);

        let matched = table.matching_entries("docs/README.md");
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].1.pattern, "docs/");
        assert_eq!(matched[1].1.pattern, "*.md");
    }

    #[test]
    fn test_empty_table() {
        let table = PatternTable::empty();
        assert!(table.is_empty());
        assert!(table.source_files().is_empty());
        assert!(table.matching_entries("anything").is_empty());
        assert!(table.winning_entry("anything").is_none());
    }
}
