use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for feed, record, partition, and packaging failures.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("exploited-vulnerability feed unavailable: {reason}")]
    FeedUnavailable { reason: String },
    #[error("malformed advisory record '{}': {reason}", .path.display())]
    MalformedRecord { path: PathBuf, reason: String },
    #[error("schema drift in partition '{bucket}': {details}")]
    SchemaDrift { bucket: String, details: String },
    #[error("no advisory records found under '{}'", .root.display())]
    EmptyCorpus { root: PathBuf },
    #[error("corpus synchronization failed: {reason}")]
    CorpusSync { reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("partition write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("archive packaging failed: {reason}")]
    Archive { reason: String },
}
