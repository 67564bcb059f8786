use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Result};
use clap::{builder::BoolishValueParser, ArgAction, Args};
use codeowners_scan::{
    scan, scan::parse_ignore_list, Aggregator, ChangeSet, ChangedFile, Classification,
    FileStatus, LocalCheckout, MatchEngine, RepoRef, ScanOptions, TeamPrefix,
};

use crate::OutputFormat;

#[derive(Args)]
pub struct LocalArgs {
    /// Files or directories to scan, relative to the root [default: everything]
    paths: Vec<PathBuf>,

    /// Root of the checkout
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Owners starting with this prefix are teams, e.g. `@org/`
    #[arg(long, env = "TEAM_PREFIX")]
    team_prefix: String,

    /// Comma or newline separated patterns of files to skip
    #[arg(long, env = "PATHS_TO_IGNORE")]
    paths_to_ignore: Option<String>,

    /// List every rule that matches a file, not just the winning one
    #[arg(long)]
    all_matching_rules: bool,

    /// Exit non-zero when unowned or individually owned files are found
    #[arg(
        long,
        env = "FAIL_ON_VIOLATION",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub(crate) fail_on_violation: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

pub fn run(args: LocalArgs) -> Result<ExitCode> {
    if !args.root.is_dir() {
        bail!("root is not a directory: {}", args.root.display());
    }

    let table = Aggregator::new(LocalCheckout::new(&args.root))
        .fetch(&RepoRef::new("", "", "HEAD"))
        .context("failed to read CODEOWNERS files")?;

    let change_set = ChangeSet {
        files: collect_paths(&args.root, &args.paths)?
            .into_iter()
            .map(|path| ChangedFile::new(path, FileStatus::Added))
            .collect(),
        ..Default::default()
    };
    let team_prefix = TeamPrefix::new(&args.team_prefix);
    let options = ScanOptions::new(team_prefix.clone()).with_ignore_patterns(parse_ignore_list(
        args.paths_to_ignore.as_deref().unwrap_or(""),
    ));
    let result = scan(&change_set, &table, &options);

    if args.format == OutputFormat::Json {
        println!("{}", crate::render_json(&result)?);
        return Ok(crate::finish(&result, args.fail_on_violation));
    }

    let engine = MatchEngine::new(&table, &team_prefix);
    for file in &result.files {
        match (&file.winning_owner, file.classification) {
            (_, Classification::Unmatched) | (None, _) => println!("{:<70}  (unowned)", file.path),
            (Some(owner), _) => println!("{:<70}  {}", file.path, owner),
        }
        if args.all_matching_rules {
            for entry in engine.matching_entries(&file.path) {
                let owner = entry.owner.as_ref().map_or("(none)", |o| o.as_str());
                println!(
                    "    {}:{}  {}  {}",
                    entry.source_file, entry.line, entry.pattern, owner
                );
            }
        }
    }

    Ok(crate::finish(&result, args.fail_on_violation))
}

/// Repository-relative paths of every file under `paths`, or under `root`
/// when none are given.
fn collect_paths(root: &Path, paths: &[PathBuf]) -> Result<Vec<String>> {
    let roots = if paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        paths.iter().map(|p| root.join(p)).collect()
    };

    let mut files = Vec::new();
    for path in roots {
        if !path.exists() {
            bail!("path does not exist: {}", path.display());
        }
        for entry in walk_files(&path) {
            let relative = entry
                .path()
                .strip_prefix(root)
                .with_context(|| format!("{} is outside {}", entry.path().display(), root.display()))?;
            files.push(relative.to_string_lossy().into_owned());
        }
    }
    Ok(files)
}

fn walk_files(root: &Path) -> impl Iterator<Item = walkdir::DirEntry> {
    walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|entry| !entry.file_type().is_dir())
}
