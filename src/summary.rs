use std::path::PathBuf;

use crate::partition::PartitionSummary;
use crate::types::SkipReason;

/// One record that was discovered but not written, with the reason.
#[derive(Clone, Debug)]
pub struct SkippedRecord {
    /// Path of the offending record file.
    pub path: PathBuf,
    /// Why the record was skipped.
    pub reason: SkipReason,
}

/// Accounting for one pipeline run, surfaced to the operator.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Records transformed and written to a partition.
    pub processed: u64,
    /// Records discovered but skipped, each with a reason.
    pub skipped: Vec<SkippedRecord>,
    /// Rows whose columns disagreed with their partition header.
    pub drift_events: u64,
    /// Whether the run ended through cooperative cancellation.
    pub cancelled: bool,
    /// Finalized partitions in canonical bucket order.
    pub partitions: Vec<PartitionSummary>,
    /// Archives produced from the finalized partitions.
    pub archives: Vec<PathBuf>,
}

impl RunSummary {
    /// Total rows across all partitions.
    pub fn total_rows(&self) -> u64 {
        self.partitions.iter().map(|partition| partition.rows).sum()
    }

    /// Number of skipped records.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Per-bucket share of total output rows.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionShare {
    /// Lowercase bucket label.
    pub bucket: &'static str,
    /// Rows in this bucket.
    pub rows: u64,
    /// Fraction of all rows this bucket received.
    pub share: f64,
}

/// Compute per-bucket output shares, sorted by row count descending
/// (label order breaks ties).
pub fn partition_shares(partitions: &[PartitionSummary]) -> Vec<PartitionShare> {
    let total: u64 = partitions.iter().map(|partition| partition.rows).sum();
    let mut shares: Vec<PartitionShare> = partitions
        .iter()
        .map(|partition| PartitionShare {
            bucket: partition.bucket.label(),
            rows: partition.rows,
            share: if total == 0 {
                0.0
            } else {
                partition.rows as f64 / total as f64
            },
        })
        .collect();
    shares.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.bucket.cmp(b.bucket)));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SeverityBucket;

    fn partition(bucket: SeverityBucket, rows: u64) -> PartitionSummary {
        PartitionSummary {
            bucket,
            path: PathBuf::from(format!("{}.csv", bucket.label())),
            rows,
        }
    }

    #[test]
    fn shares_are_sorted_and_sum_to_one() {
        let partitions = vec![
            partition(SeverityBucket::Low, 1),
            partition(SeverityBucket::High, 6),
            partition(SeverityBucket::Critical, 3),
        ];
        let shares = partition_shares(&partitions);
        assert_eq!(shares[0].bucket, "high");
        assert_eq!(shares[1].bucket, "critical");
        assert_eq!(shares[2].bucket, "low");
        let total: f64 = shares.iter().map(|share| share.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_partitions_yield_no_shares() {
        assert!(partition_shares(&[]).is_empty());
    }

    #[test]
    fn summary_totals_cover_all_partitions() {
        let summary = RunSummary {
            processed: 9,
            partitions: vec![
                partition(SeverityBucket::High, 6),
                partition(SeverityBucket::Low, 3),
            ],
            ..RunSummary::default()
        };
        assert_eq!(summary.total_rows(), 9);
        assert_eq!(summary.skipped_count(), 0);
    }
}
