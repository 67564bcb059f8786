//! Per-file ownership decisions.
//!
//! Two predicates are computed independently for every path:
//!
//! * coverage: does any entry's pattern, tested on its own, match the path?
//!   Entry order plays no part.
//! * team ownership: does the winning rule assign a team? The winning rule is
//!   the pattern of the last matching entry, together with every entry that
//!   declares that same pattern, so a pattern listed once per owner behaves
//!   like a single multi-owner line regardless of the order of its owners.

use serde::Serialize;
use tracing::warn;

use crate::{
    owner::{Owner, TeamPrefix},
    patternset,
    table::{OwnershipEntry, PatternTable, PatternTableBuilder},
};

/// How a single path is owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No entry matches the path.
    Unmatched,
    /// The winning rule has a team among its owners.
    OwnedByTeam,
    /// The winning rule names owners, none of which is a team.
    OwnedByIndividual,
    /// The winning rule has no owner.
    Unassigned,
}

impl Classification {
    pub fn is_covered(self) -> bool {
        self != Classification::Unmatched
    }
}

/// Evaluates paths against a compiled [`PatternTable`].
#[derive(Debug, Clone, Copy)]
pub struct MatchEngine<'t> {
    table: &'t PatternTable,
    team_prefix: &'t TeamPrefix,
}

impl<'t> MatchEngine<'t> {
    pub fn new(table: &'t PatternTable, team_prefix: &'t TeamPrefix) -> Self {
        Self { table, team_prefix }
    }

    /// Whether any entry declares a rule for `path`.
    pub fn is_covered(&self, path: &str) -> bool {
        !self.table.matching_entries(path).is_empty()
    }

    /// Whether the winning rule for `path` has a team among its owners.
    pub fn has_team_owner(&self, path: &str) -> bool {
        self.winning_rule(path)
            .iter()
            .any(|entry| self.is_team_owned(entry))
    }

    /// Whether the winning rule for `path` names an owner at all.
    pub fn has_owner(&self, path: &str) -> bool {
        self.winning_rule(path)
            .iter()
            .any(|entry| entry.owner.is_some())
    }

    pub fn classify(&self, path: &str) -> Classification {
        if !self.is_covered(path) {
            Classification::Unmatched
        } else if self.has_team_owner(path) {
            Classification::OwnedByTeam
        } else if self.has_owner(path) {
            Classification::OwnedByIndividual
        } else {
            Classification::Unassigned
        }
    }

    /// The authoritative entry for `path` under last-match-wins precedence.
    pub fn winning_entry(&self, path: &str) -> Option<&'t OwnershipEntry> {
        self.table.winning_entry(path)
    }

    /// Every entry matching `path` on its own, in table order.
    pub fn matching_entries(&self, path: &str) -> Vec<&'t OwnershipEntry> {
        self.table
            .matching_entries(path)
            .into_iter()
            .map(|(_, entry)| entry)
            .collect()
    }

    // Entries that match `path` on their own and declare the same pattern as
    // the last matching entry.
    fn winning_rule(&self, path: &str) -> Vec<&'t OwnershipEntry> {
        let matched = self.matching_entries(path);
        let Some(winner) = matched.last() else {
            return Vec::new();
        };
        let pattern = winner.pattern.as_str();
        matched
            .into_iter()
            .filter(|entry| entry.pattern == pattern)
            .collect()
    }

    fn is_team_owned(&self, entry: &OwnershipEntry) -> bool {
        entry
            .owner
            .as_ref()
            .map_or(false, |owner| self.team_prefix.is_team(owner))
    }
}

/// Whether `path` matches any of `patterns`. Patterns that fail to compile are
/// skipped with a warning.
pub fn matches<S: AsRef<str>>(path: &str, patterns: &[S]) -> bool {
    let (matcher, rejected) = patternset::compile_lossy(patterns);
    for (pattern, error) in rejected {
        warn!(pattern = %pattern, "skipping pattern: {}", error);
    }
    matcher.is_match(path)
}

/// Classify `path` against a raw list of `(pattern, owner)` pairs.
pub fn classify<P, O>(path: &str, entries: &[(P, Option<O>)], team_prefix: &TeamPrefix) -> Classification
where
    P: AsRef<str>,
    O: AsRef<str>,
{
    let mut builder = PatternTableBuilder::new();
    for (idx, (pattern, owner)) in entries.iter().enumerate() {
        builder.add(OwnershipEntry::new(
            pattern.as_ref(),
            owner.as_ref().map(|o| Owner::new(o.as_ref())),
            "",
            idx + 1,
        ));
    }
    let table = builder.build();
    MatchEngine::new(&table, team_prefix).classify(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> TeamPrefix {
        TeamPrefix::new("@org/")
    }

    #[test]
    fn test_matches_is_any_pattern() {
        assert!(matches("src/api.go", &["docs/", "src/**"]));
        assert!(matches("src/api.go", &["*.go"]));
        assert!(!matches("README.md", &["docs/", "src/**"]));
        assert!(!matches("README.md", &[] as &[&str]));
    }

    #[test]
    fn test_matches_skips_invalid_patterns() {
        assert!(matches("src/api.go", &["[", "src/"]));
        assert!(!matches("src/api.go", &["!src/"]));
    }

    #[test]
    fn test_matches_is_deterministic() {
        let patterns = ["/src/*/mod.rs", "*.md", "docs/**"];
        for path in ["src/a/mod.rs", "docs/x/y.txt", "a/b.md", "main.go"] {
            assert_eq!(matches(path, &patterns), matches(path, &patterns));
        }
    }

    #[test]
    fn test_classify() {
        let entries = [
            ("src/**", Some("@org/backend-team")),
            ("src/legacy.go", Some("alice")),
            ("tools/", Some("bob")),
            ("generated/", None),
        ];
        let examples = [
            ("src/api.go", Classification::OwnedByTeam),
            ("src/legacy.go", Classification::OwnedByIndividual),
            ("tools/build.sh", Classification::OwnedByIndividual),
            ("generated/schema.go", Classification::Unassigned),
            ("README.md", Classification::Unmatched),
        ];

        for (path, expected) in examples {
            assert_eq!(classify(path, &entries, &prefix()), expected, "path {}", path);
        }
    }

    #[test]
    fn test_team_wins_regardless_of_order() {
        let individual_last = [("*.go", Some("@org/go")), ("*.go", Some("alice"))];
        let individual_first = [("*.go", Some("alice")), ("*.go", Some("@org/go"))];
        assert_eq!(
            classify("main.go", &individual_last, &prefix()),
            Classification::OwnedByTeam
        );
        assert_eq!(
            classify("main.go", &individual_first, &prefix()),
            Classification::OwnedByTeam
        );
    }

    #[test]
    fn test_team_prefix_is_case_insensitive() {
        let entries = [("*", Some("@ORG/Platform"))];
        assert_eq!(classify("a.txt", &entries, &prefix()), Classification::OwnedByTeam);
    }

    #[test]
    fn test_ownerless_winning_rule() {
        let entries = [("docs/", Some("carol")), ("*.md", None)];
        assert_eq!(
            classify("docs/intro.md", &entries, &prefix()),
            Classification::Unassigned
        );
        assert_eq!(
            classify("docs/intro.txt", &entries, &prefix()),
            Classification::OwnedByIndividual
        );
    }

    #[test]
    fn test_later_team_rule_overrides_individual() {
        let entries = [("src/legacy.go", Some("alice")), ("src/", Some("@org/core"))];
        assert_eq!(
            classify("src/legacy.go", &entries, &prefix()),
            Classification::OwnedByTeam
        );
    }

    #[test]
    fn test_winning_rule_groups_by_pattern_text() {
        // `src/` and `src/**` cover the same files but are distinct rules, so
        // only the later one decides the owner.
        let entries = [("src/", Some("@org/core")), ("src/**", Some("alice"))];
        assert_eq!(
            classify("src/a.go", &entries, &prefix()),
            Classification::OwnedByIndividual
        );

        let entries = [("src/**", Some("alice")), ("src/", Some("@org/core"))];
        assert_eq!(
            classify("src/a.go", &entries, &prefix()),
            Classification::OwnedByTeam
        );
    }

    #[test]
    fn test_engine_predicates_are_independent() {
        let mut builder = PatternTableBuilder::new();
        builder.add(OwnershipEntry::new("src/", Some(Owner::new("@org/core")), "CODEOWNERS", 1));
        builder.add(OwnershipEntry::new("src/vendor/", Some(Owner::new("dave")), "CODEOWNERS", 2));
        let table = builder.build();
        let team_prefix = prefix();
        let engine = MatchEngine::new(&table, &team_prefix);

        let path = "src/vendor/lib.go";
        assert!(engine.is_covered(path));
        assert!(!engine.has_team_owner(path));
        assert!(engine.has_owner(path));
        assert_eq!(engine.classify(path), Classification::OwnedByIndividual);
        assert_eq!(engine.classify("src/main.go"), Classification::OwnedByTeam);
        assert!(!engine.is_covered("main.go"));
        assert_eq!(
            engine.winning_entry(path).and_then(|e| e.owner.as_ref()),
            Some(&Owner::new("dave"))
        );
        assert_eq!(engine.matching_entries(path).len(), 2);
    }
}
