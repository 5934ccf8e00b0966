//! Command-line entry point: mirror the advisory corpus, build the
//! exploited-vulnerability index, and run the partitioning pipeline.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::time::Instant;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisory_triage::constants::corpus::{
    ADVISORIES_SUBDIR, PROJECT_DIR, PROJECT_URL, SAMPLE_DIR,
};
use advisory_triage::constants::output::{CSV_DIR, SAMPLE_CSV_DIR};
use advisory_triage::constants::workers::DEFAULT_WORKERS;
use advisory_triage::{
    CancelToken, CorpusScanner, ExploitedIndex, PipelineConfig, RunSummary, TriageError,
    partition_shares, run_pipeline,
};

#[derive(Debug, Parser)]
#[command(
    name = "advisory-triage",
    disable_help_subcommand = true,
    about = "Partition security advisories by severity into CSV archives",
    long_about = "Mirror the advisory database, flag known-exploited records, and export one \
                  compressed CSV per severity bucket.",
    after_help = "The --download, --update, and --sample modes are mutually exclusive."
)]
struct Cli {
    #[arg(
        short,
        long,
        group = "mode",
        help = "Clone the full advisory database first (may download several gigabytes)"
    )]
    download: bool,
    #[arg(
        short,
        long,
        group = "mode",
        help = "Pull only new and updated advisories into an existing clone first"
    )]
    update: bool,
    #[arg(
        short,
        long,
        group = "mode",
        help = "Run against the bundled sample corpus, keeping its output separate"
    )]
    sample: bool,
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_WORKERS,
        help = "Number of concurrent workers appending records to partitions"
    )]
    workers: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        handler_token.cancel();
        eprintln!("interrupt received, finishing in-flight work and archiving...");
    }) {
        warn!(error = %err, "could not install interrupt handler");
    }

    match run(&cli, &cancel) {
        Ok(summary) => {
            if summary.cancelled {
                warn!("run cancelled before the corpus was exhausted");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, cancel: &CancelToken) -> Result<RunSummary, TriageError> {
    let started = Instant::now();
    if cli.download {
        clone_corpus()?;
    } else if cli.update {
        update_corpus()?;
    }

    let corpus_root = if cli.sample {
        PathBuf::from(SAMPLE_DIR)
    } else {
        Path::new(PROJECT_DIR).join(ADVISORIES_SUBDIR)
    };
    let output_dir = if cli.sample { SAMPLE_CSV_DIR } else { CSV_DIR };

    let paths = CorpusScanner::new(&corpus_root).scan();
    if paths.is_empty() {
        warn!("rerun with --download to mirror the corpus, or --sample for the bundled sample");
        return Err(TriageError::EmptyCorpus { root: corpus_root });
    }
    info!(
        count = paths.len(),
        root = %corpus_root.display(),
        "advisory records discovered"
    );

    let config = PipelineConfig::default()
        .with_workers(cli.workers)
        .with_output_dir(output_dir);
    let index = ExploitedIndex::fetch(&config.feed_url)?;
    let summary = run_pipeline(paths, &index, &config, cancel)?;
    report(&summary, started);
    Ok(summary)
}

fn report(summary: &RunSummary, started: Instant) {
    for share in partition_shares(&summary.partitions) {
        info!(
            bucket = share.bucket,
            rows = share.rows,
            share = %format!("{:.1}%", share.share * 100.0),
            "partition produced"
        );
    }
    for skipped in summary.skipped.iter().take(10) {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "record skipped");
    }
    if summary.skipped_count() > 10 {
        warn!(
            more = summary.skipped_count() - 10,
            "additional skipped records not shown"
        );
    }
    info!(
        processed = summary.processed,
        skipped = summary.skipped_count(),
        drift_events = summary.drift_events,
        archives = summary.archives.len(),
        elapsed = ?started.elapsed(),
        "done"
    );
}

fn corpus_exists() -> bool {
    Path::new(PROJECT_DIR).join(".git").is_dir()
}

fn clone_corpus() -> Result<(), TriageError> {
    if corpus_exists() {
        return Err(TriageError::CorpusSync {
            reason: format!(
                "'{PROJECT_DIR}/' already exists; rerun with --update or remove it first"
            ),
        });
    }
    info!(url = PROJECT_URL, "cloning advisory database (this may take several minutes)");
    run_git(&["clone", PROJECT_URL, PROJECT_DIR])
}

fn update_corpus() -> Result<(), TriageError> {
    if !corpus_exists() {
        return Err(TriageError::CorpusSync {
            reason: format!("no clone at '{PROJECT_DIR}/'; rerun with --download first"),
        });
    }
    info!("pulling advisory database changes");
    run_git(&["-C", PROJECT_DIR, "pull", "--ff-only"])
}

fn run_git(args: &[&str]) -> Result<(), TriageError> {
    let status = Command::new("git")
        .args(args)
        .status()
        .map_err(|err| TriageError::CorpusSync {
            reason: format!("failed to launch git: {err}"),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(TriageError::CorpusSync {
            reason: format!("git {} exited with {status}", args.join(" ")),
        })
    }
}
