use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, ArgAction, Args};
use codeowners_scan::{
    comment::{self, CommentAction},
    github::{GitHubClient, GitHubConfig, DEFAULT_API_URL, DEFAULT_SERVER_URL},
    report, scan,
    scan::parse_ignore_list,
    Aggregator, IssueRef, ReportContext, RunDetails, ScanOptions, TeamPrefix,
};
use tracing::info;

use crate::OutputFormat;

#[derive(Args)]
pub struct PrArgs {
    /// GitHub token used for every API request
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Owner of the repository the pull request belongs to
    #[arg(long, env = "OWNER")]
    owner: String,

    /// Repository the pull request belongs to
    #[arg(long, env = "REPO")]
    repo: String,

    /// Pull request number
    #[arg(long, env = "PR")]
    pr: u64,

    /// Comma or newline separated patterns of files to skip
    #[arg(long, env = "PATHS_TO_IGNORE")]
    paths_to_ignore: Option<String>,

    /// Owners starting with this prefix are teams [default: @<owner>/]
    #[arg(long, env = "TEAM_PREFIX")]
    team_prefix: Option<String>,

    /// Only examine files added by the pull request
    #[arg(
        long,
        env = "ADDED_ONLY",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    added_only: bool,

    /// Exit non-zero when unowned or individually owned files are found
    #[arg(
        long,
        env = "FAIL_ON_VIOLATION",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    fail_on_violation: bool,

    /// Remove the report comment instead of posting one when the scan passes
    #[arg(
        long,
        env = "ONLY_COMMENT_ON_FAILED_CHECKS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    only_comment_on_failed_checks: bool,

    /// Print the report instead of commenting on the pull request
    #[arg(long)]
    no_comment: bool,

    /// Output format of `--no-comment`
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Workflow run to link from the report
    #[arg(long, env = "GITHUB_RUN_ID")]
    run_id: Option<u64>,
}

pub fn run(args: PrArgs) -> Result<ExitCode> {
    let issue = IssueRef::new(&args.owner, &args.repo, args.pr);
    let client = GitHubClient::new(GitHubConfig::new(&args.token).with_api_url(&args.api_url))
        .context("failed to create GitHub client")?;

    let pr = client
        .get_pull_request(&issue)
        .with_context(|| format!("failed to fetch pull request #{}", args.pr))?;
    let change_set = client
        .change_set(&issue, &pr)
        .with_context(|| format!("failed to list files of pull request #{}", args.pr))?;
    let table = Aggregator::new(&client)
        .fetch(&pr.head_repo_ref(&issue))
        .context("failed to fetch CODEOWNERS files")?;

    let team_prefix = match &args.team_prefix {
        Some(prefix) => TeamPrefix::new(prefix),
        None => TeamPrefix::for_organization(&args.owner),
    };
    let options = ScanOptions::new(team_prefix.clone())
        .with_ignore_patterns(parse_ignore_list(args.paths_to_ignore.as_deref().unwrap_or("")))
        .with_added_only(args.added_only);
    let result = scan(&change_set, &table, &options);

    let run = args.run_id.map(|id| {
        RunDetails::github_actions(&args.server_url, &format!("{}/{}", args.owner, args.repo), id)
    });
    let ctx = ReportContext::new(&pr.head.sha, team_prefix).with_run(run);
    let report = report::render(&result, &ctx);

    if args.no_comment {
        match args.format {
            OutputFormat::Text => println!("{}", report.body),
            OutputFormat::Json => println!("{}", crate::render_json(&result)?),
        }
    } else if args.only_comment_on_failed_checks && !result.has_violations() {
        let action = comment::retract(&client, &issue, &report.marker)
            .context("failed to remove report comment")?;
        if action == CommentAction::Unchanged {
            info!("scan passed, no report comment to remove");
        }
    } else {
        comment::publish(&client, &issue, &report).context("failed to publish report comment")?;
    }

    Ok(crate::finish(&result, args.fail_on_violation))
}
