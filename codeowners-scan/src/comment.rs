//! Keeps at most one report comment per pull request up to date.

use tracing::{debug, info};

use crate::{error::Result, report::Report};

/// An issue or pull request that comments are attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    pub body: Option<String>,
    pub author_is_bot: bool,
}

/// Where comments live.
pub trait CommentStore {
    fn list_comments(&self, issue: &IssueRef) -> Result<Vec<IssueComment>>;
    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<IssueComment>;
    fn update_comment(&self, issue: &IssueRef, comment_id: u64, body: &str) -> Result<IssueComment>;
    fn delete_comment(&self, issue: &IssueRef, comment_id: u64) -> Result<()>;
}

impl<T: CommentStore + ?Sized> CommentStore for &T {
    fn list_comments(&self, issue: &IssueRef) -> Result<Vec<IssueComment>> {
        (**self).list_comments(issue)
    }

    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<IssueComment> {
        (**self).create_comment(issue, body)
    }

    fn update_comment(&self, issue: &IssueRef, comment_id: u64, body: &str) -> Result<IssueComment> {
        (**self).update_comment(issue, comment_id, body)
    }

    fn delete_comment(&self, issue: &IssueRef, comment_id: u64) -> Result<()> {
        (**self).delete_comment(issue, comment_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Created(u64),
    Updated(u64),
    Removed(u64),
    Unchanged,
}

/// A previously posted report: written by a bot and carrying `marker`.
pub fn is_report_comment(comment: &IssueComment, marker: &str) -> bool {
    comment.author_is_bot
        && comment
            .body
            .as_deref()
            .map_or(false, |body| body.contains(marker))
}

pub fn find_existing_report<S: CommentStore>(
    store: &S,
    issue: &IssueRef,
    marker: &str,
) -> Result<Option<IssueComment>> {
    Ok(store
        .list_comments(issue)?
        .into_iter()
        .find(|comment| is_report_comment(comment, marker)))
}

/// Post `report`, replacing the body of an earlier report comment if there is one.
pub fn publish<S: CommentStore>(store: &S, issue: &IssueRef, report: &Report) -> Result<CommentAction> {
    match find_existing_report(store, issue, &report.marker)? {
        Some(existing) => {
            debug!(comment_id = existing.id, "updating report comment");
            let updated = store.update_comment(issue, existing.id, &report.body)?;
            info!(comment_id = updated.id, "updated report comment on #{}", issue.number);
            Ok(CommentAction::Updated(updated.id))
        }
        None => {
            let created = store.create_comment(issue, &report.body)?;
            info!(comment_id = created.id, "created report comment on #{}", issue.number);
            Ok(CommentAction::Created(created.id))
        }
    }
}

/// Delete an earlier report comment, if there is one.
pub fn retract<S: CommentStore>(store: &S, issue: &IssueRef, marker: &str) -> Result<CommentAction> {
    match find_existing_report(store, issue, marker)? {
        Some(existing) => {
            store.delete_comment(issue, existing.id)?;
            info!(comment_id = existing.id, "removed report comment from #{}", issue.number);
            Ok(CommentAction::Removed(existing.id))
        }
        None => Ok(CommentAction::Unchanged),
    }
}
