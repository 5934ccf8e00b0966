#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Partition archiving (zip packaging of finalized partitions).
pub mod archive;
/// Cooperative cancellation primitives.
pub mod cancel;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across scanner, transformer, and writer.
pub mod constants;
/// Exploited-vulnerability feed index.
pub mod kev;
/// Severity-partitioned CSV output.
pub mod partition;
/// Worker pool coordination and run orchestration.
pub mod pipeline;
/// Advisory record parsing and normalization.
pub mod record;
/// Corpus discovery.
pub mod scanner;
/// Run accounting and operator summary helpers.
pub mod summary;
/// Shared type aliases.
pub mod types;

mod errors;

pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use errors::TriageError;
pub use kev::ExploitedIndex;
pub use partition::{AppendOutcome, DriftPolicy, PartitionSummary, PartitionWriter};
pub use pipeline::{prepare_output_dir, run_pipeline};
pub use record::{NormalizedRow, SeverityBucket, transform_document, transform_record};
pub use scanner::CorpusScanner;
pub use summary::{PartitionShare, RunSummary, SkippedRecord, partition_shares};
pub use types::{CellValue, ColumnName, CveId, SkipReason};
