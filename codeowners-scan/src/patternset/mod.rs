//! The CODEOWNERS glob dialect, compiled into a single NFA that reports every
//! pattern matching a path.

mod builder;
mod matcher;
mod nfa;

pub use self::builder::Builder;
pub use self::matcher::Matcher;

/// Why a pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("patterns cannot contain null bytes")]
    NullByte,
    #[error("negated patterns (`!`) are not supported")]
    Negation,
    #[error("character ranges (`[...]`) are not supported")]
    CharacterRange,
    #[error("invalid pattern segment `{segment}`: {reason}")]
    InvalidSegment { segment: String, reason: String },
}

/// Compile a list of patterns into a [`Matcher`], skipping (and returning)
/// the ones that fail to compile. Ids in the matcher are assigned to the
/// accepted patterns in order.
pub fn compile_lossy<S: AsRef<str>>(patterns: &[S]) -> (Matcher, Vec<(String, PatternError)>) {
    let mut builder = Builder::new();
    let mut rejected = Vec::new();
    for pattern in patterns {
        if let Err(err) = builder.add(pattern.as_ref()) {
            rejected.push((pattern.as_ref().to_owned(), err));
        }
    }
    (builder.build(), rejected)
}
