//! GitHub REST implementation of [`FileSource`] and [`CommentStore`].

use std::time::Duration;

use base64::Engine as _;
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    Method,
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::{
    aggregator::{FetchOutcome, FileSource, RepoRef},
    comment::{CommentStore, IssueComment, IssueRef},
    error::{Error, Result},
    scan::{ChangeSet, ChangedFile, FileStatus},
};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token: token.into(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("codeowners-scan/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: Branch,
    pub base: Branch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
    /// `None` when the head repository was deleted.
    pub repo: Option<Repository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl PullRequest {
    /// Where declaration files are read from: the head repository at the head
    /// ref, falling back to the base repository when the head is gone.
    pub fn head_repo_ref(&self, issue: &IssueRef) -> RepoRef {
        match &self.head.repo {
            Some(repo) => RepoRef::new(&repo.owner.login, &repo.name, &self.head.git_ref),
            None => RepoRef::new(&issue.owner, &issue.repo, &self.head.sha),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PullRequestFile {
    filename: String,
    status: FileStatus,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    id: u64,
    body: Option<String>,
    user: Option<Account>,
}

impl From<Comment> for IssueComment {
    fn from(comment: Comment) -> Self {
        IssueComment {
            id: comment.id,
            body: comment.body,
            author_is_bot: comment.user.map_or(false, |user| user.kind == "Bot"),
        }
    }
}

pub struct GitHubClient {
    config: GitHubConfig,
    client: Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Http {
                url: config.api_url.clone(),
                detail: e.to_string(),
            })?;
        Ok(Self::with_http_client(config, client))
    }

    /// Use a preconfigured HTTP client, e.g. one with custom proxy or TLS
    /// settings. `config.timeout` and `config.user_agent` are not applied.
    pub fn with_http_client(config: GitHubConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn get_pull_request(&self, issue: &IssueRef) -> Result<PullRequest> {
        let url = self.url(&format!(
            "repos/{}/{}/pulls/{}",
            issue.owner, issue.repo, issue.number
        ));
        self.get_json(&url)
    }

    pub fn list_changed_files(&self, issue: &IssueRef) -> Result<Vec<ChangedFile>> {
        let url = self.url(&format!(
            "repos/{}/{}/pulls/{}/files",
            issue.owner, issue.repo, issue.number
        ));
        let files = self.get_paginated::<PullRequestFile>(&url)?;
        Ok(files
            .into_iter()
            .map(|f| ChangedFile::new(f.filename, f.status))
            .collect())
    }

    /// The files of `pr` together with its base and head refs.
    pub fn change_set(&self, issue: &IssueRef, pr: &PullRequest) -> Result<ChangeSet> {
        Ok(ChangeSet {
            files: self.list_changed_files(issue)?,
            base_ref: pr.base.git_ref.clone(),
            head_ref: pr.head.git_ref.clone(),
        })
    }

    /// Contents of `path` at `repo.git_ref`, or `None` if it doesn't exist.
    pub fn get_file_contents(&self, repo: &RepoRef, path: &str) -> Result<Option<String>> {
        match self.fetch_contents(repo, path) {
            Ok(contents) => Ok(Some(contents)),
            Err(Error::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn fetch_contents(&self, repo: &RepoRef, path: &str) -> Result<String> {
        let url = self.url(&format!("repos/{}/{}/contents/{}", repo.owner, repo.repo, path));
        let request = self
            .request(Method::GET, &url)
            .query(&[("ref", repo.git_ref.as_str())]);
        let contents = parse_json::<Contents>(self.send(request, &url)?, &url)?;
        decode_contents(path, &contents)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request.send().map_err(|e| Error::Http {
            url: url.to_owned(),
            detail: e.to_string(),
        })?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "github request");
        if status.is_success() {
            return Ok(response);
        }
        Err(Error::Status {
            url: url.to_owned(),
            status: status.as_u16(),
            message: response.text().unwrap_or_default(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, url), url)?;
        parse_json(response, url)
    }

    fn get_paginated<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let request = self
                .request(Method::GET, url)
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch = parse_json::<Vec<T>>(self.send(request, url)?, url)?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}

impl FileSource for GitHubClient {
    fn fetch_file(&self, repo: &RepoRef, path: &str) -> FetchOutcome {
        fetch_outcome(self.fetch_contents(repo, path))
    }
}

/// Only a 404 means the file is absent; every other failure is fatal to the
/// caller.
fn fetch_outcome(result: Result<String>) -> FetchOutcome {
    match result {
        Ok(contents) => FetchOutcome::Found(contents),
        Err(Error::Status { status: 404, .. }) => FetchOutcome::NotFound,
        Err(e) => FetchOutcome::TransportError(e.to_string()),
    }
}

impl CommentStore for GitHubClient {
    fn list_comments(&self, issue: &IssueRef) -> Result<Vec<IssueComment>> {
        let url = self.url(&format!(
            "repos/{}/{}/issues/{}/comments",
            issue.owner, issue.repo, issue.number
        ));
        let comments = self.get_paginated::<Comment>(&url)?;
        Ok(comments.into_iter().map(IssueComment::from).collect())
    }

    fn create_comment(&self, issue: &IssueRef, body: &str) -> Result<IssueComment> {
        let url = self.url(&format!(
            "repos/{}/{}/issues/{}/comments",
            issue.owner, issue.repo, issue.number
        ));
        let request = self
            .request(Method::POST, &url)
            .json(&serde_json::json!({ "body": body }));
        let comment = parse_json::<Comment>(self.send(request, &url)?, &url)?;
        Ok(comment.into())
    }

    fn update_comment(&self, issue: &IssueRef, comment_id: u64, body: &str) -> Result<IssueComment> {
        let url = self.url(&format!(
            "repos/{}/{}/issues/comments/{}",
            issue.owner, issue.repo, comment_id
        ));
        let request = self
            .request(Method::PATCH, &url)
            .json(&serde_json::json!({ "body": body }));
        let comment = parse_json::<Comment>(self.send(request, &url)?, &url)?;
        Ok(comment.into())
    }

    fn delete_comment(&self, issue: &IssueRef, comment_id: u64) -> Result<()> {
        let url = self.url(&format!(
            "repos/{}/{}/issues/comments/{}",
            issue.owner, issue.repo, comment_id
        ));
        self.send(self.request(Method::DELETE, &url), &url)?;
        Ok(())
    }
}

fn parse_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let text = response.text().map_err(|e| Error::Http {
        url: url.to_owned(),
        detail: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Decode {
        path: url.to_owned(),
        reason: e.to_string(),
    })
}

fn decode_contents(path: &str, contents: &Contents) -> Result<String> {
    let decode_err = |reason: String| Error::Decode {
        path: path.to_owned(),
        reason,
    };
    let content = contents.content.as_deref().unwrap_or_default();
    match contents.encoding.as_deref() {
        Some("base64") => {
            let stripped = content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect::<String>();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(stripped)
                .map_err(|e| decode_err(e.to_string()))?;
            String::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))
        }
        Some("utf-8") | Some("") | None => Ok(content.to_owned()),
        Some(other) => Err(decode_err(format!("unsupported encoding `{}`", other))),
    }
}
