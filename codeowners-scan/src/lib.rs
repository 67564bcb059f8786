pub mod aggregator;
pub mod comment;
pub mod engine;
mod error;
#[cfg(feature = "github")]
pub mod github;
pub mod local;
pub mod owner;
pub mod parser;
pub mod patternset;
pub mod report;
pub mod scan;
pub mod table;

pub use aggregator::{Aggregator, DeclarationFile, FetchOutcome, FileSource, RepoRef};
pub use comment::{CommentAction, CommentStore, IssueComment, IssueRef};
pub use engine::{classify, matches, Classification, MatchEngine};
pub use error::{Error, Result};
pub use local::LocalCheckout;
pub use owner::{Owner, OwnerKind, TeamPrefix};
pub use report::{Report, ReportContext, RunDetails};
pub use scan::{scan, ChangeSet, ChangedFile, ClassifiedResult, FileOwnership, FileStatus, ScanOptions};
pub use table::{OwnershipEntry, PatternTable, PatternTableBuilder};
