//! Parasplit CLI
//!
//! The `parasplit` command splits a test suite into balanced groups for
//! parallel CI executors, using the test durations archived with earlier
//! builds.
//!
//! ## Commands
//!
//! - `split`: Print the splits for a job
//! - `record`: Archive a finished build and its test report
//! - `history`: List the archived builds of a job

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use parasplit_core::{ParallelismMode, RenderedSplit, SplitConfig, SplitEngine};
use parasplit_history::{
    BuildHistory, BuildRecord, BuildStatus, FsBuildArchive, JobId, JobRecord, TestReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "parasplit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split test suites across parallel executors using build history", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Root directory of the build archive
    #[arg(long, global = true, env = "PARASPLIT_ARCHIVE", default_value = ".parasplit")]
    archive: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the splits for the next build of a job
    Split {
        /// Full job name, e.g. `project/branch`
        #[arg(short, long)]
        job: JobId,

        /// Number of groups: `count(n)` or `time(n)`
        #[arg(short, long, default_value = "count(2)")]
        parallelism: ParallelismMode,

        /// Emit inclusion splits; without this every split is an exclusion
        #[arg(long)]
        generate_inclusions: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Archive a finished build and its test report
    Record {
        /// Full job name
        #[arg(short, long)]
        job: JobId,

        /// Build number
        #[arg(short, long)]
        build: u64,

        /// Build outcome
        #[arg(long, default_value = "success")]
        status: BuildStatus,

        /// Test report (JSON)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Mark the job as its project's primary branch
        #[arg(long)]
        primary: bool,
    },

    /// List archived builds of a job (newest first)
    History {
        /// Full job name
        #[arg(short, long)]
        job: JobId,

        /// Maximum number of builds to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
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
    parasplit_core::init_tracing(cli.json, level);

    let archive = FsBuildArchive::open(&cli.archive)
        .with_context(|| format!("Failed to open build archive at {:?}", cli.archive))?;

    match cli.command {
        Commands::Split {
            job,
            parallelism,
            generate_inclusions,
            format,
        } => {
            let config = SplitConfig::from_env().context("Invalid split configuration")?;
            cmd_split(archive, config, &job, parallelism, generate_inclusions, format).await
        }
        Commands::Record {
            job,
            build,
            status,
            report,
            primary,
        } => cmd_record(&archive, &job, build, status, report.as_deref(), primary).await,
        Commands::History { job, limit } => cmd_history(&archive, &job, limit).await,
    }
}

/// Compute and print the splits for `job`
async fn cmd_split(
    archive: FsBuildArchive,
    config: SplitConfig,
    job: &JobId,
    mode: ParallelismMode,
    generate_inclusions: bool,
    format: OutputFormat,
) -> Result<()> {
    let engine = SplitEngine::new(Arc::new(archive), config);
    let splits = engine.split(job, mode, generate_inclusions).await;

    let output = match format {
        OutputFormat::Text => render_splits_text(&splits),
        OutputFormat::Json => serde_json::to_string_pretty(&splits)?,
    };
    println!("{}", output);

    Ok(())
}

fn render_splits_text(splits: &[RenderedSplit]) -> String {
    let mut out = format!("splits.size={}", splits.len());
    for (i, split) in splits.iter().enumerate() {
        out.push_str(&format!("\nsplits[{}]: {}", i, split));
    }
    out
}

/// Archive a build, registering its job on first use.
///
/// With `primary`, the job becomes its project's only primary branch job:
/// any sibling still carrying the marker has it cleared.
async fn cmd_record(
    archive: &FsBuildArchive,
    job: &JobId,
    number: u64,
    status: BuildStatus,
    report: Option<&Path>,
    primary: bool,
) -> Result<()> {
    let report: Option<TestReport> = report.map(read_json_file::<TestReport>).transpose()?;

    let mut updates = Vec::new();
    match archive
        .job(job)
        .await
        .with_context(|| format!("Failed to look up job '{}'", job))?
    {
        Some(record) if record.primary || !primary => {}
        Some(record) => updates.push(record.primary()),
        None if primary => updates.push(JobRecord::new(job.clone()).primary()),
        None => updates.push(JobRecord::new(job.clone())),
    }
    if let (true, Some(project)) = (primary, job.project()) {
        let siblings = archive
            .jobs_in_project(project)
            .await
            .with_context(|| format!("Failed to list jobs of project '{}'", project))?;
        updates.extend(
            siblings
                .into_iter()
                .filter(|s| s.primary && s.id != *job)
                .map(|s| JobRecord::new(s.id)),
        );
    }

    let build = BuildRecord::completed(job.clone(), number, status);
    let writer = archive.clone();
    let written = build.clone();
    let classes = report.as_ref().map(|r| r.class_durations().len());
    tokio::task::spawn_blocking(move || -> Result<()> {
        for record in &updates {
            writer
                .register_job(record)
                .with_context(|| format!("Failed to register job '{}'", record.id))?;
            info!(job = %record.id, primary = record.primary, "Registered job");
        }
        writer
            .record_build(&written, report.as_ref())
            .with_context(|| format!("Failed to record build {}", written))
    })
    .await
    .context("Archive write task failed")??;

    match classes {
        Some(classes) => println!("Recorded {} ({}, {} test classes)", build, status, classes),
        None => println!("Recorded {} ({}, no test report)", build, status),
    }

    Ok(())
}

/// Print the newest builds of `job`
async fn cmd_history(history: &dyn BuildHistory, job: &JobId, limit: usize) -> Result<()> {
    for line in history_lines(history, job, limit).await? {
        println!("{}", line);
    }
    Ok(())
}

async fn history_lines(history: &dyn BuildHistory, job: &JobId, limit: usize) -> Result<Vec<String>> {
    let record = history
        .job(job)
        .await
        .with_context(|| format!("Failed to look up job '{}'", job))?;
    if record.is_none() {
        bail!("Job '{}' is not in the archive", job);
    }

    let builds = history
        .builds(job)
        .await
        .with_context(|| format!("Failed to list builds of '{}'", job))?;
    if builds.is_empty() {
        return Ok(vec![format!("No builds found for '{}'", job)]);
    }

    let mut lines = Vec::new();
    for build in builds.into_iter().take(limit) {
        let report = match history.test_report(job, build.number).await {
            Ok(Some(report)) => format!("{} test classes", report.class_durations().len()),
            Ok(None) => "no test report".to_string(),
            Err(e) => format!("unreadable test report ({})", e),
        };
        let completed = build
            .completed_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "#{:<6} {:<9} {:<23} {}",
            build.number,
            build.status.as_str(),
            completed,
            report
        ));
    }

    Ok(lines)
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}
