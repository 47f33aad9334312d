use std::fs;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use tracing::warn;

use trimerge::config::TrimergeConfig;
use trimerge::fixture::{self, FixtureCase};
use trimerge::format::OutputFormat;
use trimerge::sequence::{AutoResolveMode, AutoResolveReport, AutoResolver, PendingMerge};
use trimerge::telemetry;
use trimerge_core::{FileHeader, MarkerLabels, MergeData, MergeOutcome};

/// Three-way merge with automatic conflict resolution
///
/// Merges two edits of a common ancestor line by line. Regions both edits
/// changed are handed to resolve options (identical edits, enclosing edits,
/// ES import blocks, word-level edits); what no option can resolve is left
/// as a conflict.
///
/// AS A GIT MERGE DRIVER:
///
///   # .git/config
///   [merge "trimerge"]
///       driver = trimerge merge %O %A %B --path %P --markers
///
///   # .gitattributes
///   *.js merge=trimerge
///
/// Settings are read from .trimerge.toml in the current directory (or the
/// resolve root).
#[derive(Parser)]
#[command(name = "trimerge")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'trimerge <command> --help' for more information on a specific command.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one file (git merge driver compatible)
    ///
    /// Writes the merged text to --output, or back over <OURS> like git
    /// expects. Exits with status 1 when conflicts remain.
    Merge(MergeArgs),

    /// Check and run merge fixture cases
    #[command(subcommand)]
    Fixture(FixtureCommands),

    /// Auto-resolve conflicted files in a directory
    ///
    /// For every <PATH>, reads <PATH>.base, <PATH>.ours and <PATH>.theirs
    /// below <ROOT> and writes resolved files to <ROOT>/<PATH>. The mode
    /// comes from .trimerge.toml unless --mode is given; "ask" prompts on a
    /// terminal and behaves like "never" otherwise.
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct MergeArgs {
    /// Common ancestor (%O)
    base: PathBuf,
    /// Local version (%A); receives the result unless --output is given
    ours: PathBuf,
    /// Incoming version (%B)
    theirs: PathBuf,

    /// Write the result here instead of over <OURS>
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Repository path of the file (%P), used to pick resolve options
    #[arg(long)]
    path: Option<PathBuf>,

    /// Write diff3-style conflict markers when conflicts remain
    #[arg(long)]
    markers: bool,
}

#[derive(Subcommand)]
enum FixtureCommands {
    /// Check that import fixture cases are self-consistent
    Check {
        /// Case directories
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Output format (text, json)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Shorthand for --format json
        #[arg(long, hide = true, conflicts_with = "format")]
        json: bool,
    },

    /// Run every fixture case under a directory
    Run {
        /// Directory holding one sub-directory per case
        root: PathBuf,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Directory the paths are relative to
    root: PathBuf,

    /// Conflicted file paths
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Override the configured mode (always, never, ask)
    #[arg(long)]
    mode: Option<String>,

    /// Output format (text, json)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Shorthand for --format json
    #[arg(long, hide = true, conflicts_with = "format")]
    json: bool,
}

fn main() -> Result<ExitCode> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge(args) => merge(&args),
        Commands::Fixture(FixtureCommands::Check { dirs, format, json }) => {
            fixture_check(&dirs, OutputFormat::with_json_flag(format, json))
        }
        Commands::Fixture(FixtureCommands::Run { root }) => fixture_run(&root),
        Commands::Resolve(args) => resolve(&args),
    }
}

const fn exit_status(clean: bool) -> ExitCode {
    if clean { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

fn merge(args: &MergeArgs) -> Result<ExitCode> {
    let config = TrimergeConfig::load_from_root(Path::new("."))?;
    let options = config.resolve_options()?;

    let read = |path: &Path| {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    };
    let base = read(&args.base)?;
    let ours = read(&args.ours)?;
    let theirs = read(&args.theirs)?;

    let header = FileHeader::new(args.path.as_ref().unwrap_or(&args.ours));
    let data = MergeData::new(header, &base, &ours, &theirs);
    let ending = data.merged_line_ending();
    let target = args.output.as_ref().unwrap_or(&args.ours);

    match data.auto_resolve(&options)? {
        MergeOutcome::Resolved(text) => {
            fs::write(target, ending.normalize(&text))
                .with_context(|| format!("failed to write {}", target.display()))?;
            Ok(ExitCode::SUCCESS)
        }
        MergeOutcome::Conflicting { regions } => {
            if args.markers {
                let text = data.render_with_markers(&options, &MarkerLabels::default())?;
                fs::write(target, ending.normalize(&text))
                    .with_context(|| format!("failed to write {}", target.display()))?;
            }
            eprintln!(
                "{}: {} unresolved conflict(s)",
                data.header().path().display(),
                regions.len()
            );
            for lines in &regions {
                eprintln!("  base lines {}-{}", lines.start + 1, lines.end);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

// ---------------------------------------------------------------------------
// fixture
// ---------------------------------------------------------------------------

fn fixture_check(dirs: &[PathBuf], format: OutputFormat) -> Result<ExitCode> {
    let mut reports = Vec::with_capacity(dirs.len());
    for dir in dirs {
        reports.push(FixtureCase::load(dir)?.check_consistency()?);
    }
    let consistent = reports.iter().all(|report| report.is_consistent());

    match format {
        OutputFormat::Json => println!("{}", OutputFormat::to_json(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                let verdict = if report.is_consistent() { "ok" } else { "FAIL" };
                println!("{verdict} {}", report.case);
                println!("  body identical:   {}", yes_no(report.body_matches));
                println!("  imports combined: {}", yes_no(report.imports_are_union()));
                println!("  nothing dropped:  {}", yes_no(report.nothing_dropped()));
                if !report.missing.is_empty() {
                    println!("  missing from Expected: {}", join(&report.missing));
                }
                if !report.extra.is_empty() {
                    println!("  only in Expected: {}", join(&report.extra));
                }
            }
        }
    }
    Ok(exit_status(consistent))
}

fn fixture_run(root: &Path) -> Result<ExitCode> {
    let options = TrimergeConfig::load_from_root(Path::new("."))?.resolve_options()?;
    let cases = fixture::discover(root)?;
    let mut failed = 0;
    for case in &cases {
        let outcome = case.run(&options)?;
        if outcome.passed() {
            println!("ok   {}", case.name());
        } else {
            failed += 1;
            println!("FAIL {}: {}", case.name(), outcome.describe());
        }
    }
    println!("{} passed, {failed} failed", cases.len() - failed);
    Ok(exit_status(failed == 0))
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

fn resolve(args: &ResolveArgs) -> Result<ExitCode> {
    let config = TrimergeConfig::load_from_root(&args.root)?;
    let options = config.resolve_options()?;
    let mode = args
        .mode
        .as_deref()
        .map_or(config.resolve.mode, |mode| AutoResolveMode::from_str_value(Some(mode)));

    let mut merges = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let merge = PendingMerge::load(&args.root, path)
            .with_context(|| format!("failed to load versions of {}", path.display()))?;
        merges.push(merge);
    }

    let report = if mode.should_run(|| confirm_auto_resolve(merges.len())) {
        AutoResolver::new(&args.root, options, config.skip_limits()).run(merges)
    } else {
        AutoResolveReport {
            total: merges.len(),
            remaining: merges.into_iter().map(|merge| merge.path).collect(),
            ..AutoResolveReport::default()
        }
    };

    match OutputFormat::with_json_flag(args.format, args.json) {
        OutputFormat::Json => println!("{}", OutputFormat::to_json(&report)?),
        OutputFormat::Text => {
            println!("{}", report.summary());
            for path in &report.resolved {
                println!("  resolved  {}", path.display());
            }
            for path in &report.remaining {
                let note = if report.skipped.contains(path) { " (skipped, too large)" } else { "" };
                println!("  remaining {}{note}", path.display());
            }
        }
    }
    Ok(exit_status(report.remaining.is_empty()))
}

/// Ask on the terminal; without one the answer is no.
fn confirm_auto_resolve(count: usize) -> bool {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        return false;
    }
    Confirm::new()
        .with_prompt(format!("Try to auto-resolve {count} conflicting file(s)?"))
        .default(true)
        .interact()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to read confirmation");
            false
        })
}
