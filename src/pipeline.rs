use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::Receiver;
use tracing::{info, warn};

use crate::archive::archive_partitions;
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::constants::workers::SKIP_MALFORMED_MSG;
use crate::errors::TriageError;
use crate::kev::ExploitedIndex;
use crate::partition::{AppendOutcome, PartitionWriter};
use crate::record::transform_record;
use crate::summary::{RunSummary, SkippedRecord};

/// Drive the full transform-and-partition run over a discovered path
/// list.
///
/// All paths are queued up front; `config.workers` threads drain the
/// queue concurrently, each pushing rows through the shared
/// [`PartitionWriter`]. Per-record failures are isolated and surfaced
/// in the summary, never aborting the run. Finalization and archiving
/// run unconditionally once dispatch stops, so a cancelled run still
/// yields valid archives for whatever was written.
pub fn run_pipeline(
    paths: Vec<PathBuf>,
    index: &ExploitedIndex,
    config: &PipelineConfig,
    cancel: &CancelToken,
) -> Result<RunSummary, TriageError> {
    prepare_output_dir(&config.output_dir)?;
    let writer = PartitionWriter::create(&config.output_dir, config.drift_policy)?;

    let total = paths.len();
    let (sender, receiver) = crossbeam_channel::unbounded();
    for path in paths {
        sender.send(path).expect("work queue disconnected");
    }
    drop(sender);

    let processed = AtomicU64::new(0);
    let drift_events = AtomicU64::new(0);
    let skipped = Mutex::new(Vec::new());
    let workers = config.workers.max(1);
    info!(total, workers, "dispatching advisory records");

    thread::scope(|scope| {
        for _ in 0..workers {
            let receiver = receiver.clone();
            let writer = &writer;
            let processed = &processed;
            let drift_events = &drift_events;
            let skipped = &skipped;
            scope.spawn(move || {
                worker_loop(
                    receiver,
                    writer,
                    index,
                    cancel,
                    processed,
                    drift_events,
                    skipped,
                )
            });
        }
    });

    let partitions = writer.finalize()?;
    let archives = archive_partitions(&partitions)?;
    let summary = RunSummary {
        processed: processed.into_inner(),
        skipped: skipped.into_inner().expect("skip list poisoned"),
        drift_events: drift_events.into_inner(),
        cancelled: cancel.is_cancelled(),
        partitions,
        archives,
    };
    info!(
        processed = summary.processed,
        skipped = summary.skipped_count(),
        drift_events = summary.drift_events,
        cancelled = summary.cancelled,
        "pipeline run complete"
    );
    Ok(summary)
}

/// Delete and recreate the output directory so a run never mixes its
/// partitions with stale output from a previous run.
pub fn prepare_output_dir(dir: &Path) -> Result<(), TriageError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// One worker: dequeue, transform, append, until the queue drains or
/// cancellation is raised. In-flight records always finish; a row is
/// never left half-written.
fn worker_loop(
    receiver: Receiver<PathBuf>,
    writer: &PartitionWriter,
    index: &ExploitedIndex,
    cancel: &CancelToken,
    processed: &AtomicU64,
    drift_events: &AtomicU64,
    skipped: &Mutex<Vec<SkippedRecord>>,
) {
    while !cancel.is_cancelled() {
        let Ok(path) = receiver.try_recv() else {
            break;
        };
        match transform_record(&path, index) {
            Ok((row, bucket)) => match writer.append(bucket, &row) {
                Ok(AppendOutcome::Written) => {
                    processed.fetch_add(1, Ordering::Relaxed);
                }
                Ok(AppendOutcome::Projected) => {
                    processed.fetch_add(1, Ordering::Relaxed);
                    drift_events.fetch_add(1, Ordering::Relaxed);
                }
                Err(err @ TriageError::SchemaDrift { .. }) => {
                    drift_events.fetch_add(1, Ordering::Relaxed);
                    push_skipped(skipped, path, err.to_string());
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "partition append failed");
                    push_skipped(skipped, path, err.to_string());
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, SKIP_MALFORMED_MSG);
                push_skipped(skipped, path, err.to_string());
            }
        }
    }
}

fn push_skipped(skipped: &Mutex<Vec<SkippedRecord>>, path: PathBuf, reason: String) {
    skipped
        .lock()
        .expect("skip list poisoned")
        .push(SkippedRecord { path, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_advisory(dir: &Path, name: &str, severity: &str) {
        let document = json!({
            "id": name,
            "aliases": [],
            "database_specific": {"severity": severity}
        });
        fs::write(dir.join(format!("{name}.json")), document.to_string()).unwrap();
    }

    #[test]
    fn malformed_records_are_isolated_and_surfaced() {
        let temp = tempdir().unwrap();
        let corpus = temp.path().join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        write_advisory(&corpus, "GHSA-good-one", "HIGH");
        write_advisory(&corpus, "GHSA-good-two", "HIGH");
        fs::write(corpus.join("GHSA-broken.json"), "{ nope").unwrap();

        let paths = crate::scanner::CorpusScanner::new(&corpus).scan();
        assert_eq!(paths.len(), 3);

        let config = PipelineConfig::default()
            .with_workers(2)
            .with_output_dir(temp.path().join("out"));
        let index = ExploitedIndex::from_ids(Vec::<String>::new());
        let summary = run_pipeline(paths, &index, &config, &CancelToken::new()).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped_count(), 1);
        assert!(summary.skipped[0].path.ends_with("GHSA-broken.json"));
        assert!(!summary.cancelled);
        assert_eq!(summary.total_rows(), 2);
        assert_eq!(summary.archives.len(), 1);
    }

    #[test]
    fn pre_cancelled_run_writes_nothing_but_still_finalizes() {
        let temp = tempdir().unwrap();
        let corpus = temp.path().join("corpus");
        fs::create_dir_all(&corpus).unwrap();
        write_advisory(&corpus, "GHSA-unseen", "LOW");

        let cancel = CancelToken::new();
        cancel.cancel();
        let config = PipelineConfig::default().with_output_dir(temp.path().join("out"));
        let index = ExploitedIndex::from_ids(Vec::<String>::new());
        let paths = crate::scanner::CorpusScanner::new(&corpus).scan();
        let summary = run_pipeline(paths, &index, &config, &cancel).unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed, 0);
        assert!(summary.partitions.is_empty());
        assert!(summary.archives.is_empty());
        assert_eq!(fs::read_dir(temp.path().join("out")).unwrap().count(), 0);
    }

    #[test]
    fn prepare_output_dir_clears_stale_partitions() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("critical.zip"), "stale").unwrap();

        prepare_output_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }
}
