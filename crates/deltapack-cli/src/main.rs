//! deltapack - incremental deployment packages from git history
//!
//! The `deltapack` command turns the last N commits of a repository into a
//! package folder holding the changed static files and freshly built
//! artifacts of every project whose sources changed.
//!
//! ## Commands
//!
//! - `package`: Build a package from the last N commits
//! - `cleanup`: Remove stale packages from the output folder

mod report;
mod setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

use deltapack_build::{
    check_prerequisites, DeltaPipeline, PackageRequest, ProcessBuildExecutor, Toolchain,
};
use deltapack_core::git::{commit_log, diff_stat, toplevel};
use deltapack_core::{
    create_archive, DeltaConfig, DeltaError, DescriptorClassifier, PackageSummary,
    ProjectProfile, RevisionRange,
};

use report::{render_preview_text, render_summary_text};
use setup::{cleanup_stale_packages, PACKAGE_PREFIX};

#[derive(Parser)]
#[command(name = "deltapack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental deployment packages from git history", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (default: deltapack.json in the current directory)
    #[arg(long, global = true, env = "DELTAPACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a package from the last N commits
    Package(PackageArgs),

    /// Remove stale packages from the output folder
    Cleanup {
        /// Folder to clean (default: configured output folder)
        #[arg(long)]
        output_folder: Option<PathBuf>,

        /// Remove packages older than this many hours
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
}

#[derive(clap::Args)]
struct PackageArgs {
    /// Repository path (default: the project's RepoPath, else the current directory)
    repo: Option<PathBuf>,

    /// Number of commits to include, counted back from HEAD
    #[arg(short = 'n', long, default_value = "1")]
    commits: u32,

    /// Package folder to write (default: a timestamped folder under the output folder)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Named project from the configuration file
    #[arg(short, long)]
    project: Option<String>,

    /// Show what would be packaged without copying or building
    #[arg(long)]
    dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Also write <package>.tar.gz
    #[arg(long)]
    archive: bool,

    /// Print the summary as JSON
    #[arg(long)]
    summary_json: bool,

    /// Maximum concurrent builds (default: MaxParallelBuilds, else processor count)
    #[arg(long)]
    max_parallel: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    deltapack_core::init_tracing(cli.json, level);

    let config = DeltaConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Package(args) => cmd_package(&config, args).await,
        Commands::Cleanup {
            output_folder,
            max_age_hours,
        } => cmd_cleanup(&config, output_folder, max_age_hours),
    }
}

async fn cmd_package(config: &DeltaConfig, args: PackageArgs) -> Result<()> {
    let profile = match &args.project {
        Some(name) => Some(
            config
                .project(name)
                .ok_or_else(|| DeltaError::InvalidInput(format!("unknown project: {name}")))?,
        ),
        None => None,
    };

    let range = RevisionRange::last_commits(args.commits)?;
    let repo_root = resolve_repo_root(args.repo.as_deref(), profile)?;
    let package_root = match args.output.clone() {
        Some(path) => path,
        None => default_package_root(config, profile, &repo_root),
    };

    let toolchain = Toolchain::from_config(config);
    let availability = check_prerequisites(&toolchain, !args.dry_run)?;

    let request = PackageRequest {
        repo_root: repo_root.clone(),
        range: range.clone(),
        package_root: package_root.clone(),
        classifier: config.classifier(),
    };

    let max_parallel = args
        .max_parallel
        .unwrap_or_else(|| config.max_parallel_builds());
    let executor = ProcessBuildExecutor::new(toolchain, DescriptorClassifier::default(), availability);
    let pipeline = DeltaPipeline::new(Arc::new(executor), max_parallel);

    let preview = pipeline.preview(&request)?;
    show_history(&repo_root, &range);

    if args.dry_run {
        if args.summary_json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            println!("{}", render_preview_text(&preview));
        }
        return Ok(());
    }

    println!("{}", render_preview_text(&preview));
    println!("Package folder: {}", package_root.display());

    if !args.yes {
        let stdin = std::io::stdin();
        let proceed = confirm(&mut stdin.lock(), &mut std::io::stdout(), "Proceed?")?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let stale_age = Duration::from_secs(config.stale_package_max_age_hours() * 3600);
    cleanup_stale_packages(&config.output_folder(), stale_age)?;

    let outcome = pipeline
        .run(&request)
        .await
        .context("Package pipeline failed")?;
    let failed = outcome.failed_count();
    let mut summary = outcome.summary;

    if args.archive {
        attach_archive(&mut summary)?;
    }

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", render_summary_text(&summary));
    }
    if failed > 0 {
        warn!(failed, "some units were not packaged");
    }

    Ok(())
}

fn cmd_cleanup(
    config: &DeltaConfig,
    output_folder: Option<PathBuf>,
    max_age_hours: Option<u64>,
) -> Result<()> {
    let root = output_folder.unwrap_or_else(|| config.output_folder());
    let hours = max_age_hours.unwrap_or_else(|| config.stale_package_max_age_hours());
    let removed = cleanup_stale_packages(&root, Duration::from_secs(hours * 3600))?;

    if removed.is_empty() {
        println!("No stale packages under {}", root.display());
    }
    for path in &removed {
        println!("Removed {}", path.display());
    }
    Ok(())
}

/// Explicit path, then the project's `RepoPath`, then the working directory.
/// The result is the top of the enclosing git work tree.
fn resolve_repo_root(explicit: Option<&Path>, profile: Option<&ProjectProfile>) -> Result<PathBuf> {
    let path = match (explicit, profile) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(profile)) => profile.repo_path.clone(),
        (None, None) => std::env::current_dir().context("Failed to read current directory")?,
    };

    if !path.is_dir() {
        return Err(DeltaError::InvalidInput(format!(
            "repository path does not exist: {}",
            path.display()
        ))
        .into());
    }
    Ok(toplevel(&path)?)
}

/// `<output folder>/deltapack-<name>-<timestamp>`, unless the project pins a
/// package root.
fn default_package_root(
    config: &DeltaConfig,
    profile: Option<&ProjectProfile>,
    repo_root: &Path,
) -> PathBuf {
    if let Some(root) = profile.and_then(|p| p.package_root.clone()) {
        return root;
    }

    let name = profile
        .map(|p| p.name.clone())
        .or_else(|| {
            repo_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "package".to_string());
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");

    config
        .output_folder()
        .join(format!("{PACKAGE_PREFIX}{}-{stamp}", sanitize(&name)))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Print the commit log and diff size of `range`. Display only.
fn show_history(repo_root: &Path, range: &RevisionRange) {
    match commit_log(repo_root, range) {
        Ok(log) => {
            println!("Commits in {}:", range);
            for line in log.lines() {
                println!("  {}", line);
            }
        }
        Err(e) => warn!(error = %e, "could not read commit log"),
    }
    match diff_stat(repo_root, range) {
        Ok(stat) if !stat.is_empty() => println!("{}", stat),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not read diff size"),
    }
}

/// Ask a yes/no question. Anything but `y`/`yes` is a no.
fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn attach_archive(summary: &mut PackageSummary) -> Result<()> {
    let archive = create_archive(&summary.package_folder).context("Failed to archive package")?;
    info!(path = %archive.path.display(), sha256 = %archive.sha256, "package archived");
    summary.archive_path = Some(archive.path);
    summary.archive_sha256 = Some(archive.sha256);
    Ok(())
}
