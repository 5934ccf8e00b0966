use std::path::PathBuf;

use crate::constants::feed::KEV_FEED_URL;
use crate::constants::output::CSV_DIR;
use crate::constants::workers::DEFAULT_WORKERS;
use crate::partition::DriftPolicy;

/// Pipeline configuration: worker pool size, output location, feed
/// source, and schema-drift handling.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Number of concurrent workers draining the shared queue.
    pub workers: usize,
    /// Directory receiving per-severity partitions and archives.
    pub output_dir: PathBuf,
    /// Location of the exploited-vulnerability feed.
    pub feed_url: String,
    /// Policy applied when a row disagrees with its partition header.
    pub drift_policy: DriftPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            output_dir: PathBuf::from(CSV_DIR),
            feed_url: KEV_FEED_URL.to_string(),
            drift_policy: DriftPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Override the worker count (values below one are clamped to one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Override the output directory.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Override the feed location.
    pub fn with_feed_url(mut self, feed_url: impl Into<String>) -> Self {
        self.feed_url = feed_url.into();
        self
    }

    /// Override the schema-drift policy.
    pub fn with_drift_policy(mut self, drift_policy: DriftPolicy) -> Self {
        self.drift_policy = drift_policy;
        self
    }
}
