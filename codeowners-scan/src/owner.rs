use std::fmt;

use serde::Serialize;

/// An owner handle as written in a CODEOWNERS file, e.g. `@org/team`,
/// `@octocat`, `octocat` or `dev@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Owner(String);

/// The shape of an owner handle, used to label owners in reports. Whether an
/// owner counts as a team is decided by a [`TeamPrefix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    User,
    Team,
    Email,
}

impl Owner {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> OwnerKind {
        match self.0.strip_prefix('@') {
            Some(rest) if rest.contains('/') => OwnerKind::Team,
            Some(_) => OwnerKind::User,
            None if self.0.contains('@') => OwnerKind::Email,
            None => OwnerKind::User,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The namespace that marks an owner as a team, such as `@acme/`. Matching
/// is a case-insensitive prefix test on the owner handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPrefix(String);

impl TeamPrefix {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self(prefix.as_ref().to_lowercase())
    }

    /// The team namespace of a GitHub organization: `@<org>/`.
    pub fn for_organization(org: &str) -> Self {
        Self::new(format!("@{}/", org))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_team(&self, owner: &Owner) -> bool {
        owner.as_str().to_lowercase().starts_with(&self.0)
    }
}

impl fmt::Display for TeamPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
