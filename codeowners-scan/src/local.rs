use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::aggregator::{FetchOutcome, FileSource, RepoRef};

/// Reads declaration files from a checkout on disk. The repository
/// coordinates are ignored; everything is resolved against `root`.
#[derive(Debug, Clone)]
pub struct LocalCheckout {
    root: PathBuf,
}

impl LocalCheckout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSource for LocalCheckout {
    fn fetch_file(&self, _repo: &RepoRef, path: &str) -> FetchOutcome {
        let full_path = self.root.join(path);
        match fs::read_to_string(&full_path) {
            Ok(contents) => FetchOutcome::Found(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => FetchOutcome::NotFound,
            Err(e) => FetchOutcome::TransportError(format!("{}: {}", full_path.display(), e)),
        }
    }
}
