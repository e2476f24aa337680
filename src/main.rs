use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use git_gone::classify::{classify_all, Category, DeleteMethod, DeletionCandidate, RefKind, RiskTier};
use git_gone::config::{RunConfiguration, TagMode};
use git_gone::context::RepositoryContext;
use git_gone::error::GoneError;
use git_gone::git::Git;
use git_gone::orchestrator::{
    CancelReason, DeletionPlan, DeletionSummary, ItemOutcome, Orchestrator, RemoteCleanup,
    RunOutcome,
};
use git_gone::prompt::LinePrompter;
use git_gone::refs;
use git_gone::report::{emit_report, AnalysisReport, Emitted, RefTotals, ReportFormat};
use git_gone::select::{select_candidates, selector_for};
use git_gone::time::analysis_time_now;

/// Environment variable holding the log filter (`tracing` EnvFilter syntax).
const LOG_ENV: &str = "GIT_GONE_LOG";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Clean up local git branches and tags that are merged, gone or stale",
    long_about = None
)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', value_name = "DIR", global = true)]
    directory: Option<PathBuf>,

    /// Skip the yes/no confirmation (unmerged branches still require DELETE)
    #[arg(long, short, global = true)]
    force: bool,

    /// Select every candidate without the interactive selector
    #[arg(long, short, global = true)]
    all: bool,

    /// Choose candidates in the interactive selector (default)
    #[arg(long, short, global = true)]
    interactive: bool,

    /// Include branches that are not merged into the default branch
    #[arg(long, short, global = true)]
    unmerged: bool,

    /// Show debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete merged, gone and (with -u) unmerged local branches
    Branches,

    /// Print a non-destructive analysis of branches and stale tags
    Report {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        output: ReportFormat,

        /// Write the report to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },

    /// List or delete local tags
    Tags {
        #[command(subcommand)]
        action: TagAction,
    },
}

#[derive(Subcommand, Debug)]
enum TagAction {
    /// List local tags missing from the remote
    List(TagArgs),
    /// Delete local tags missing from the remote
    Clean(TagArgs),
}

#[derive(Args, Debug)]
struct TagArgs {
    /// Use every local tag instead of only the stale ones
    #[arg(long, short = 'n')]
    no_stale: bool,
}

impl Cli {
    fn config(&self, tag_mode: TagMode) -> RunConfiguration {
        RunConfiguration {
            force: self.force,
            select_all: self.all,
            interactive: self.interactive,
            include_unmerged: self.unmerged,
            tag_mode,
        }
    }
}

fn init_logging(verbose: bool) {
    // User-facing warnings are printed directly; logs are for diagnosis
    let default_level = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_context(git: &Git) -> Result<RepositoryContext> {
    Ok(RepositoryContext::resolve(git)?)
}

/// Fetch and prune under a spinner. Failure is a warning.
fn refresh_remotes(git: &Git, context: &RepositoryContext) {
    if !context.has_remote() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("🔄 Updating remote references...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = refs::refresh_remotes(git);
    spinner.finish_and_clear();

    if let Err(err) = result {
        print_warning(&err.to_string());
    }
}

fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠️  Warning:".yellow().bold(), message);
}

fn print_warnings(warnings: &[GoneError]) {
    for warning in warnings {
        print_warning(&warning.to_string());
    }
}

fn run_branches(git: &Git, config: RunConfiguration) -> Result<()> {
    config.validate()?;
    let context = resolve_context(git)?;
    refresh_remotes(git, &context);

    println!("📍 Default branch: {}", context.default_branch.cyan());
    println!("🌿 Current branch: {}", context.current_branch_label().cyan());

    let enumeration = refs::enumerate_branches(git, &context);
    print_warnings(&enumeration.warnings);

    let mut candidates: Vec<DeletionCandidate> = classify_all(&enumeration.refs, &context, &config)
        .into_iter()
        .filter(DeletionCandidate::is_deletable)
        .collect();

    if candidates.is_empty() {
        println!(
            "{}",
            "✅ No branches to delete (all branches are either active or unmerged)".green()
        );
        return Ok(());
    }
    candidates.sort_by_key(DeletionCandidate::display_label);

    print_breakdown(&candidates, &context.default_branch);

    let mut selector = selector_for(config.selection_mode()?);
    let selected = match select_candidates(
        selector.as_mut(),
        "Select branches to delete",
        &candidates,
    ) {
        Ok(selected) => selected,
        Err(GoneError::SelectionAborted) => {
            println!("\n{}", "❌ Selection cancelled".red());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if selected.is_empty() {
        println!("\n{}", "✅ No branches selected for deletion".green());
        return Ok(());
    }

    println!("\n{}", "⚠️  The following branches will be deleted:".yellow());
    for candidate in &selected {
        match candidate.risk_tier() {
            RiskTier::Safe => println!("  • {}", candidate.name()),
            RiskTier::Dangerous => {
                let scope = match candidate.upstream() {
                    Some(upstream) => format!("local + {upstream}"),
                    None => "local".to_string(),
                };
                println!("  • {} ({scope})", candidate.display_label().red());
            }
        }
    }

    let mut prompter = LinePrompter::stdio();
    let outcome = Orchestrator::new(git, &mut prompter, config).run(DeletionPlan::partition(selected));
    print_outcome(outcome, "branches");
    Ok(())
}

fn print_breakdown(candidates: &[DeletionCandidate], default_branch: &str) {
    let count_method = |method: DeleteMethod, category: Category| {
        candidates
            .iter()
            .filter(|c| c.method() == Some(method) && c.category() == category)
            .count()
    };
    let gone = count_method(DeleteMethod::GoneRemote, Category::Safe);
    let merged = count_method(DeleteMethod::Merged, Category::Safe);
    let local_only = count_method(DeleteMethod::Merged, Category::LocalOnly);
    let unmerged = count_method(DeleteMethod::Force, Category::Unmerged);

    println!("\n🔍 Found {} deletable branches:", candidates.len().to_string().bold());
    if gone > 0 {
        println!("   • {gone} branches with deleted remotes");
    }
    if merged > 0 {
        println!("   • {merged} branches merged into {default_branch}");
    }
    if local_only > 0 {
        println!("   • {local_only} merged branches never pushed to a remote");
    }
    if unmerged > 0 {
        println!("   • {unmerged} unmerged branches ((!) requires confirmation)");
        println!("\n   {}", "(!) Unmerged".red());
    }
}

fn print_outcome(outcome: RunOutcome, noun: &str) {
    match outcome {
        RunOutcome::Cancelled(CancelReason::SafeDeclined) => {
            println!("{}", "❌ Deletion cancelled".red());
        }
        RunOutcome::Cancelled(CancelReason::DangerousDeclined) => {
            println!("{}", "❌ Deletion of unmerged branches cancelled".red());
        }
        RunOutcome::Completed(summary) => print_summary(&summary, noun),
    }
}

fn print_summary(summary: &DeletionSummary, noun: &str) {
    for name in &summary.skipped_dangerous {
        println!("⏭️  Skipped unmerged branch: {}", name.yellow());
    }

    println!();
    for outcome in &summary.outcomes {
        match outcome {
            ItemOutcome::Deleted(deleted) => {
                let scope = match (deleted.kind, &deleted.remote) {
                    (RefKind::Branch, RemoteCleanup::Deleted | RemoteCleanup::AlreadyAbsent) => {
                        " (local + remote)"
                    }
                    _ => "",
                };
                println!("✅ Deleted {}{scope}: {}", deleted.kind.as_str(), deleted.name.green());
            }
            ItemOutcome::Failed(err) => println!("{} {}", "❌".red(), err.to_string().red()),
        }
    }

    for warning in &summary.warnings {
        print_warning(warning);
    }

    println!(
        "\n🎉 Successfully deleted {} {noun}",
        summary.success_count().to_string().bold()
    );

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!("{}", format!("❌ {} could not be deleted:", failures.len()).red());
        for failure in failures {
            println!("   • {failure}");
        }
    }
}

fn run_report(
    git: &Git,
    config: RunConfiguration,
    format: ReportFormat,
    file: Option<PathBuf>,
) -> Result<()> {
    let context = resolve_context(git)?;
    refresh_remotes(git, &context);

    let branches = refs::enumerate_branches(git, &context);
    let tags = refs::enumerate_tags(git, &context, TagMode::StaleOnly);
    print_warnings(&branches.warnings);
    print_warnings(&tags.warnings);

    let mut candidates = classify_all(&branches.refs, &context, &config);
    candidates.extend(classify_all(&tags.refs, &context, &config));

    let totals = RefTotals {
        branches: branches.refs.len(),
        tags: tags.refs.len(),
    };
    let report = AnalysisReport::build(&context, &candidates, totals, analysis_time_now());
    let rendered = report.render(format).context("failed to render report")?;

    let mut stdout = io::stdout().lock();
    match emit_report(&rendered, file.as_deref(), &mut stdout).context("failed to write report")? {
        Emitted::Stdout => {}
        Emitted::File(path) => println!("✅ Report saved to: {}", path.display()),
        Emitted::StdoutFallback { path, error } => eprintln!(
            "{} {}: {error}",
            "❌ Failed to write report to".red(),
            path.display()
        ),
    }
    Ok(())
}

fn run_tags(git: &Git, config: RunConfiguration, clean: bool) -> Result<()> {
    if clean {
        config.validate()?;
    }
    let context = resolve_context(git)?;
    let stale = config.tag_mode == TagMode::StaleOnly;

    if stale && !context.has_remote() {
        println!("⚠️  No remote configured. Cannot determine stale tags.");
        let verb = if clean { "manage" } else { "list" };
        println!("   Use --no-stale (-n) to {verb} all local tags instead.");
        return Ok(());
    }
    if stale {
        println!("🔄 Fetching remote tags...");
    }

    let enumeration = refs::enumerate_tags(git, &context, config.tag_mode);
    print_warnings(&enumeration.warnings);

    let mut candidates = classify_all(&enumeration.refs, &context, &config);
    if candidates.is_empty() {
        if enumeration.refs.is_empty() {
            println!("{}", "✅ No local tags found.".green());
        } else {
            println!("{}", "✅ No stale tags found. All local tags exist on remote.".green());
        }
        return Ok(());
    }
    candidates.sort_by(|a, b| a.name().cmp(b.name()));

    if stale {
        println!(
            "\n🏷️  Found {} stale tag(s) (local only, not on remote):",
            candidates.len()
        );
    } else {
        println!("\n🏷️  Found {} local tag(s):", candidates.len());
    }
    for candidate in &candidates {
        println!("   • {}", candidate.name());
    }

    if !clean {
        return Ok(());
    }

    let mut selector = selector_for(config.selection_mode()?);
    let selected = match select_candidates(selector.as_mut(), "Select tags to delete", &candidates) {
        Ok(selected) => selected,
        Err(GoneError::SelectionAborted) => {
            println!("\n{}", "❌ Selection cancelled".red());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if selected.is_empty() {
        println!("\n{}", "✅ No tags selected for deletion".green());
        return Ok(());
    }

    println!("\n{}", "⚠️  The following tags will be deleted:".yellow());
    for candidate in &selected {
        println!("  • {}", candidate.name());
    }

    let mut prompter = LinePrompter::stdio();
    let outcome = Orchestrator::new(git, &mut prompter, config).run(DeletionPlan::partition(selected));
    print_outcome(outcome, "tag(s)");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let workdir = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read the current directory")?,
    };
    let git = Git::new(workdir);

    match &cli.command {
        None | Some(Command::Branches) => run_branches(&git, cli.config(TagMode::StaleOnly)),
        Some(Command::Report { output, file }) => {
            run_report(&git, cli.config(TagMode::StaleOnly), *output, file.clone())
        }
        Some(Command::Tags { action }) => {
            let (args, clean) = match action {
                TagAction::List(args) => (args, false),
                TagAction::Clean(args) => (args, true),
            };
            let mode = if args.no_stale {
                TagMode::AllLocal
            } else {
                TagMode::StaleOnly
            };
            run_tags(&git, cli.config(mode), clean)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
