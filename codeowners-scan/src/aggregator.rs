use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    parser,
    table::{OwnershipEntry, PatternTable, PatternTableBuilder},
};

/// Locations checked for a declaration file, in the order their entries are
/// concatenated. Every file that exists contributes; later files take
/// precedence for last-match-wins purposes.
pub const CANDIDATE_PATHS: [&str; 3] = ["CODEOWNERS", "docs/CODEOWNERS", ".github/CODEOWNERS"];

/// The location GitHub documents as the preferred one.
pub const PREFERRED_DECLARATION_FILE: &str = ".github/CODEOWNERS";

/// Coordinates of a repository at a given ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            git_ref: git_ref.into(),
        }
    }
}

/// The outcome of fetching one file. `NotFound` means the file is confirmed
/// absent; anything else that went wrong is a `TransportError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(String),
    NotFound,
    TransportError(String),
}

/// Somewhere declaration files can be read from.
pub trait FileSource {
    fn fetch_file(&self, repo: &RepoRef, path: &str) -> FetchOutcome;
}

impl<T: FileSource + ?Sized> FileSource for &T {
    fn fetch_file(&self, repo: &RepoRef, path: &str) -> FetchOutcome {
        (**self).fetch_file(repo, path)
    }
}

/// A declaration file that exists, with its raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationFile {
    pub path: String,
    pub contents: String,
}

/// Collects the declaration files of a repository into one [`PatternTable`].
pub struct Aggregator<S> {
    source: S,
    candidates: Vec<String>,
}

impl<S: FileSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            candidates: CANDIDATE_PATHS.iter().map(|&p| p.to_owned()).collect(),
        }
    }

    /// Replace the candidate locations. Order is significant.
    pub fn with_candidates<I, P>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Fetch every candidate location. Missing files are skipped; any other
    /// failure aborts, so that ownership data is never silently empty.
    pub fn fetch_files(&self, repo: &RepoRef) -> Result<Vec<DeclarationFile>> {
        let mut files = Vec::new();
        for path in &self.candidates {
            debug!(path = %path, git_ref = %repo.git_ref, "fetching declaration file");
            match self.source.fetch_file(repo, path) {
                FetchOutcome::Found(contents) => files.push(DeclarationFile {
                    path: path.clone(),
                    contents,
                }),
                FetchOutcome::NotFound => {
                    debug!(path = %path, "declaration file not found");
                }
                FetchOutcome::TransportError(detail) => {
                    return Err(Error::Fetch {
                        path: path.clone(),
                        detail,
                    });
                }
            }
        }
        Ok(files)
    }

    /// Fetch, parse and compile the declaration files of `repo`.
    pub fn fetch(&self, repo: &RepoRef) -> Result<PatternTable> {
        let files = self.fetch_files(repo)?;
        Ok(compile(&files))
    }
}

/// Parse the given declaration files and concatenate their entries, in
/// order, into a single table.
pub fn compile(files: &[DeclarationFile]) -> PatternTable {
    let mut builder = PatternTableBuilder::new();
    for file in files {
        let parsed = parser::parse(&file.contents);
        for error in &parsed.errors {
            warn!(file = %file.path, "{}", error);
        }
        info!(
            "parsed {} patterns from {}",
            parsed.entries.len(),
            file.path
        );

        builder.add_source(file.path.clone());
        for entry in parsed.entries {
            builder.add(OwnershipEntry::from_parsed(entry, &file.path));
        }
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::owner::Owner;

    use super::*;

    struct MapSource(HashMap<&'static str, FetchOutcome>);

    impl FileSource for MapSource {
        fn fetch_file(&self, _repo: &RepoRef, path: &str) -> FetchOutcome {
            self.0.get(path).cloned().unwrap_or(FetchOutcome::NotFound)
        }
    }

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widgets", "feature")
    }

    #[test]
    fn test_concatenates_in_candidate_order() {
        let source = MapSource(HashMap::from([
            (
                ".github/CODEOWNERS",
                FetchOutcome::Found("src/api.go @acme/api\n".to_owned()),
            ),
            (
                "CODEOWNERS",
                FetchOutcome::Found("# root\nsrc/** alice\n".to_owned()),
            ),
        ]));
        let table = Aggregator::new(source).fetch(&repo()).unwrap();

        assert_eq!(table.source_files(), ["CODEOWNERS", ".github/CODEOWNERS"]);
        let sources = table
            .entries()
            .iter()
            .map(|e| (e.source_file.as_str(), e.line))
            .collect::<Vec<_>>();
        assert_eq!(sources, vec![("CODEOWNERS", 2), (".github/CODEOWNERS", 1)]);
        assert_eq!(
            table.winning_entry("src/api.go").and_then(|e| e.owner.clone()),
            Some(Owner::new("@acme/api"))
        );
    }

    #[test]
    fn test_missing_files_yield_empty_table() {
        let table = Aggregator::new(MapSource(HashMap::new()))
            .fetch(&repo())
            .unwrap();
        assert!(table.is_empty());
        assert!(table.source_files().is_empty());
    }

    #[test]
    fn test_empty_file_still_counts_as_source() {
        let source = MapSource(HashMap::from([(
            "docs/CODEOWNERS",
            FetchOutcome::Found(String::new()),
        )]));
        let table = Aggregator::new(source).fetch(&repo()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.source_files(), ["docs/CODEOWNERS"]);
    }

    #[test]
    fn test_transport_errors_abort() {
        let source = MapSource(HashMap::from([
            ("CODEOWNERS", FetchOutcome::Found("* @acme/all".to_owned())),
            (
                "docs/CODEOWNERS",
                FetchOutcome::TransportError("HTTP 403: rate limited".to_owned()),
            ),
        ]));
        let err = Aggregator::new(source).fetch(&repo()).unwrap_err();
        match err {
            Error::Fetch { path, detail } => {
                assert_eq!(path, "docs/CODEOWNERS");
                assert_eq!(detail, "HTTP 403: rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_candidates() {
        let source = MapSource(HashMap::from([(
            "OWNERS",
            FetchOutcome::Found("* @acme/all".to_owned()),
        )]));
        let aggregator = Aggregator::new(&source).with_candidates(["OWNERS"]);
        assert_eq!(aggregator.candidates(), ["OWNERS"]);
        assert_eq!(aggregator.fetch(&repo()).unwrap().len(), 1);
    }
}
