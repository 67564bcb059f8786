//! Markdown rendering of a [`ClassifiedResult`] for a pull request comment.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    aggregator::{CANDIDATE_PATHS, PREFERRED_DECLARATION_FILE},
    owner::{Owner, OwnerKind, TeamPrefix},
    scan::ClassifiedResult,
};

/// Correlation key embedded in every report so later runs can find and
/// update the same comment.
pub const REPORT_MARKER: &str = "7c3ad8b6-5e14-433f-9613-d965d9587089";

/// GitHub rejects comment bodies longer than this many characters.
pub const MAX_CHAR_COUNT: usize = 65536;

pub const TRUNCATION_OMISSION: &str = "... TRUNCATED ...";

pub const BODY_FOOTER_SEPARATOR: &str = "\n\n";

/// The workflow run that produced a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDetails {
    pub id: u64,
    pub url: String,
}

impl RunDetails {
    /// Link to a GitHub Actions run of `repository` (`owner/name`).
    pub fn github_actions(server_url: &str, repository: &str, run_id: u64) -> Self {
        Self {
            id: run_id,
            url: format!(
                "{}/{}/actions/runs/{}",
                server_url.trim_end_matches('/'),
                repository,
                run_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub sha: String,
    pub run: Option<RunDetails>,
    pub created_at: DateTime<Utc>,
    pub team_prefix: TeamPrefix,
    pub max_chars: usize,
}

impl ReportContext {
    pub fn new(sha: impl Into<String>, team_prefix: TeamPrefix) -> Self {
        Self {
            sha: sha.into(),
            run: None,
            created_at: Utc::now(),
            team_prefix,
            max_chars: MAX_CHAR_COUNT,
        }
    }

    pub fn with_run(mut self, run: Option<RunDetails>) -> Self {
        self.run = run;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// A rendered report. `body` is the complete comment text; it always embeds
/// `marker` in its footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub marker: String,
    pub body: String,
}

/// The hidden tag that carries `marker` inside a comment body.
pub fn marker_tag(marker: &str) -> String {
    format!("<!-- codeowners-scan: {} -->", marker)
}

/// Render `result` into a comment no longer than `ctx.max_chars` characters.
/// Only the body is truncated; the footer (and with it the marker) is always
/// kept whole.
pub fn render(result: &ClassifiedResult, ctx: &ReportContext) -> Report {
    let footer = render_footer(ctx, REPORT_MARKER);
    let budget = ctx
        .max_chars
        .saturating_sub(BODY_FOOTER_SEPARATOR.chars().count() + footer.chars().count());
    let body = truncate(&render_body(result, ctx), budget, TRUNCATION_OMISSION);

    Report {
        marker: REPORT_MARKER.to_owned(),
        body: [body.as_str(), BODY_FOOTER_SEPARATOR, footer.as_str()].concat(),
    }
}

/// Cut `s` to at most `max` characters, ending with `omission` when it was cut.
pub fn truncate(s: &str, max: usize, omission: &str) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let omission_len = omission.chars().count();
    if max <= omission_len {
        return omission.chars().take(max).collect();
    }
    let mut truncated = s.chars().take(max - omission_len).collect::<String>();
    truncated.push_str(omission);
    truncated
}

fn render_body(result: &ClassifiedResult, ctx: &ReportContext) -> String {
    let mut out = String::new();

    if result.has_violations() {
        out.push_str("## :x: CODEOWNERS scan failed\n\n");
    } else {
        out.push_str("## :white_check_mark: CODEOWNERS scan passed\n\n");
    }
    out.push_str(&format!(
        "Examined {} added or changed file(s) against {} pattern(s).\n",
        result.files_examined.len(),
        result.pattern_count()
    ));

    if !result.unowned.is_empty() {
        out.push_str(&format!(
            "\n### {} file(s) not covered by a CODEOWNERS rule\n\n",
            result.unowned.len()
        ));
        for path in &result.unowned {
            out.push_str(&format!("- `{}`\n", path));
        }
    }

    if !result.individually_owned.is_empty() {
        out.push_str(&format!(
            "\n### {} file(s) owned by a user instead of a team in `{}`\n\n",
            result.individually_owned.len(),
            ctx.team_prefix
        ));
        for file in result
            .files
            .iter()
            .filter(|f| result.individually_owned.contains(&f.path))
        {
            match &file.winning_owner {
                Some(owner) => out.push_str(&format!(
                    "- `{}` ({} `{}`)\n",
                    file.path,
                    owner_label(owner),
                    owner
                )),
                None => out.push_str(&format!("- `{}`\n", file.path)),
            }
        }
    }

    if !result.unassigned.is_empty() {
        out.push_str(&format!(
            "\n### {} file(s) matched by a rule without owners\n\n",
            result.unassigned.len()
        ));
        for path in &result.unassigned {
            out.push_str(&format!("- `{}`\n", path));
        }
    }

    if !result.ignored.is_empty() {
        out.push_str(&format!(
            "\n{} file(s) were skipped by `paths_to_ignore`.\n",
            result.ignored.len()
        ));
    }

    out.push_str("\n");
    out.push_str(&render_declarations(result));
    out
}

fn owner_label(owner: &Owner) -> &'static str {
    match owner.kind() {
        OwnerKind::User => "user",
        OwnerKind::Email => "email",
        OwnerKind::Team => "team outside the prefix",
    }
}

fn render_declarations(result: &ClassifiedResult) -> String {
    if result.source_files.is_empty() {
        return format!(
            "No CODEOWNERS file was found. Looked in {}.\n",
            CANDIDATE_PATHS
                .iter()
                .map(|p| format!("`{}`", p))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "<details><summary>{} pattern(s) from {} CODEOWNERS file(s)</summary>\n\n",
        result.pattern_count(),
        result.source_files.len()
    ));
    for file in &result.source_files {
        if file == PREFERRED_DECLARATION_FILE {
            out.push_str(&format!("- `{}` (preferred location)\n", file));
        } else {
            out.push_str(&format!("- `{}`\n", file));
        }
    }

    if !result.patterns.is_empty() {
        out.push_str("\n| Pattern | Owner | Declared in |\n| --- | --- | --- |\n");
        for entry in &result.patterns {
            let owner = entry
                .owner
                .as_ref()
                .map(|o| format!("`{}`", o))
                .unwrap_or_else(|| "_none_".to_owned());
            out.push_str(&format!(
                "| `{}` | {} | `{}:{}` |\n",
                entry.pattern, owner, entry.source_file, entry.line
            ));
        }
    }
    out.push_str("\n</details>\n");
    out
}

fn render_footer(ctx: &ReportContext, marker: &str) -> String {
    let created_at = ctx.created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let origin = match &ctx.run {
        Some(run) => format!(
            "Scanned commit {} in [run {}]({}) at {}.",
            ctx.sha, run.id, run.url, created_at
        ),
        None => format!("Scanned commit {} at {}.", ctx.sha, created_at),
    };
    format!("<sub>{}</sub>\n{}", origin, marker_tag(marker))
}
