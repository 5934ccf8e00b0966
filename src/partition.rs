use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::constants::output::CSV_EXTENSION;
use crate::constants::workers::SCHEMA_DRIFT_MSG;
use crate::errors::TriageError;
use crate::record::{NormalizedRow, SeverityBucket};
use crate::types::ColumnName;

/// Policy applied when a row's column set disagrees with the header
/// already committed for its partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriftPolicy {
    /// Project the row onto the committed header: missing columns
    /// become empty cells, extra columns are dropped, and the event is
    /// counted and logged. Keeps the row-count invariant intact.
    #[default]
    Project,
    /// Reject the row; it is surfaced as skipped with a drift reason.
    Reject,
}

/// Outcome of a single append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Row matched the partition schema (or committed it).
    Written,
    /// Row drifted and was written via projection.
    Projected,
}

/// Final accounting for one partition after `finalize`.
#[derive(Clone, Debug)]
pub struct PartitionSummary {
    /// Bucket this partition accumulated.
    pub bucket: SeverityBucket,
    /// Path of the uncompressed partition file.
    pub path: PathBuf,
    /// Rows written, excluding the header.
    pub rows: u64,
}

/// One open partition sink plus its committed schema.
struct Partition {
    bucket: SeverityBucket,
    path: PathBuf,
    writer: csv::Writer<File>,
    header: Vec<ColumnName>,
    rows: u64,
}

/// Severity-partitioned CSV output.
///
/// Sinks are created lazily on the first row targeting a bucket; the
/// first row's column set becomes the bucket's committed header. Each
/// bucket is guarded by its own mutex so writers for different buckets
/// never block each other; a single global lock is deliberately
/// avoided.
pub struct PartitionWriter {
    out_dir: PathBuf,
    policy: DriftPolicy,
    slots: [Mutex<Option<Partition>>; SeverityBucket::ALL.len()],
}

impl PartitionWriter {
    /// Create a writer rooted at `out_dir`, creating the directory if
    /// needed.
    pub fn create(out_dir: impl Into<PathBuf>, policy: DriftPolicy) -> Result<Self, TriageError> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)?;
        Ok(Self {
            out_dir,
            policy,
            slots: std::array::from_fn(|_| Mutex::new(None)),
        })
    }

    /// Directory partitions are written into.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Append one row to its bucket's partition.
    ///
    /// Serializes writers within the bucket only. Drift handling
    /// follows the configured [`DriftPolicy`]; `Reject` surfaces a
    /// `SchemaDrift` error and leaves the sink untouched.
    pub fn append(
        &self,
        bucket: SeverityBucket,
        row: &NormalizedRow,
    ) -> Result<AppendOutcome, TriageError> {
        let mut slot = self.slots[bucket.index()]
            .lock()
            .expect("partition slot poisoned");
        match slot.as_mut() {
            None => {
                let path = self
                    .out_dir
                    .join(format!("{}.{CSV_EXTENSION}", bucket.label()));
                let mut writer = csv::Writer::from_path(&path)?;
                let header = row.column_names();
                writer.write_record(&header)?;
                writer.write_record(row.project(&header))?;
                debug!(
                    bucket = bucket.label(),
                    path = %path.display(),
                    columns = header.len(),
                    "partition created"
                );
                *slot = Some(Partition {
                    bucket,
                    path,
                    writer,
                    header,
                    rows: 1,
                });
                Ok(AppendOutcome::Written)
            }
            Some(partition) => {
                if row.matches_header(&partition.header) {
                    partition.writer.write_record(row.project(&partition.header))?;
                    partition.rows += 1;
                    return Ok(AppendOutcome::Written);
                }
                let (extra, missing) = row.header_diff(&partition.header);
                match self.policy {
                    DriftPolicy::Project => {
                        warn!(
                            bucket = bucket.label(),
                            extra = ?extra,
                            missing = ?missing,
                            SCHEMA_DRIFT_MSG
                        );
                        partition.writer.write_record(row.project(&partition.header))?;
                        partition.rows += 1;
                        Ok(AppendOutcome::Projected)
                    }
                    DriftPolicy::Reject => Err(TriageError::SchemaDrift {
                        bucket: bucket.label().to_string(),
                        details: format!("extra columns {extra:?}, missing columns {missing:?}"),
                    }),
                }
            }
        }
    }

    /// Flush and close every open sink, reporting per-bucket row
    /// counts in canonical bucket order. Buckets that never received a
    /// row produce no summary and no file.
    pub fn finalize(self) -> Result<Vec<PartitionSummary>, TriageError> {
        let mut summaries = Vec::new();
        for slot in self.slots {
            let partition = slot.into_inner().expect("partition slot poisoned");
            let Some(mut partition) = partition else {
                continue;
            };
            partition.writer.flush()?;
            debug!(
                bucket = partition.bucket.label(),
                rows = partition.rows,
                "partition finalized"
            );
            summaries.push(PartitionSummary {
                bucket: partition.bucket,
                path: partition.path,
                rows: partition.rows,
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kev::ExploitedIndex;
    use crate::record::transform_document;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn row_for(id: &str, severity: &str, extra_field: Option<&str>) -> (NormalizedRow, SeverityBucket) {
        let mut document = json!({
            "id": id,
            "aliases": [],
            "database_specific": {"severity": severity}
        });
        if let Some(field) = extra_field {
            document[field] = json!("present");
        }
        transform_document(document, &ExploitedIndex::from_ids(Vec::<String>::new())).unwrap()
    }

    fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let header = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|record| record.unwrap().iter().map(str::to_string).collect())
            .collect();
        (header, rows)
    }

    #[test]
    fn first_row_commits_header_and_later_rows_follow_it() {
        let temp = tempdir().unwrap();
        let writer = PartitionWriter::create(temp.path(), DriftPolicy::Project).unwrap();

        let (first, bucket) = row_for("GHSA-one", "HIGH", None);
        let (second, _) = row_for("GHSA-two", "HIGH", None);
        assert_eq!(writer.append(bucket, &first).unwrap(), AppendOutcome::Written);
        assert_eq!(writer.append(bucket, &second).unwrap(), AppendOutcome::Written);

        let summaries = writer.finalize().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].bucket, SeverityBucket::High);
        assert_eq!(summaries[0].rows, 2);

        let (header, rows) = read_csv(&summaries[0].path);
        assert_eq!(header, first.column_names());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "GHSA-one");
        assert_eq!(rows[1][0], "GHSA-two");
    }

    #[test]
    fn buckets_get_independent_files() {
        let temp = tempdir().unwrap();
        let writer = PartitionWriter::create(temp.path(), DriftPolicy::Project).unwrap();

        let (critical, critical_bucket) = row_for("GHSA-crit", "CRITICAL", None);
        let (low, low_bucket) = row_for("GHSA-low", "LOW", None);
        writer.append(critical_bucket, &critical).unwrap();
        writer.append(low_bucket, &low).unwrap();

        let summaries = writer.finalize().unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].path.ends_with("critical.csv"));
        assert!(summaries[1].path.ends_with("low.csv"));
        assert!(temp.path().join("critical.csv").exists());
        assert!(temp.path().join("low.csv").exists());
        assert!(!temp.path().join("undefined.csv").exists());
    }

    #[test]
    fn drifting_row_is_projected_under_default_policy() {
        let temp = tempdir().unwrap();
        let writer = PartitionWriter::create(temp.path(), DriftPolicy::Project).unwrap();

        let (first, bucket) = row_for("GHSA-base", "MODERATE", None);
        let (drifted, _) = row_for("GHSA-drift", "MODERATE", Some("novel_field"));
        writer.append(bucket, &first).unwrap();
        assert_eq!(
            writer.append(bucket, &drifted).unwrap(),
            AppendOutcome::Projected
        );

        let summaries = writer.finalize().unwrap();
        assert_eq!(summaries[0].rows, 2);
        let (header, rows) = read_csv(&summaries[0].path);
        assert_eq!(header, first.column_names());
        // Every row conforms to the committed header width.
        assert!(rows.iter().all(|row| row.len() == header.len()));
        assert_eq!(rows[1][0], "GHSA-drift");
    }

    #[test]
    fn drifting_row_is_rejected_under_strict_policy() {
        let temp = tempdir().unwrap();
        let writer = PartitionWriter::create(temp.path(), DriftPolicy::Reject).unwrap();

        let (first, bucket) = row_for("GHSA-base", "LOW", None);
        let (drifted, _) = row_for("GHSA-drift", "LOW", Some("novel_field"));
        writer.append(bucket, &first).unwrap();
        let err = writer.append(bucket, &drifted).unwrap_err();
        assert!(matches!(
            err,
            TriageError::SchemaDrift { ref bucket, ref details }
                if bucket == "low" && details.contains("novel_field")
        ));

        let summaries = writer.finalize().unwrap();
        assert_eq!(summaries[0].rows, 1);
        let (_, rows) = read_csv(&summaries[0].path);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn finalize_without_rows_reports_nothing_and_leaves_no_files() {
        let temp = tempdir().unwrap();
        let out_dir = temp.path().join("out");
        let writer = PartitionWriter::create(&out_dir, DriftPolicy::Project).unwrap();
        let summaries = writer.finalize().unwrap();
        assert!(summaries.is_empty());
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }
}
