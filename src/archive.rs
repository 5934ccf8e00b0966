use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::constants::output::ZIP_EXTENSION;
use crate::errors::TriageError;
use crate::partition::PartitionSummary;

/// Package every finalized partition with at least one row into an
/// individual zip archive and remove the uncompressed file.
///
/// Runs exactly once, after the coordinator has stopped dispatching;
/// a cancelled run still yields archives for whatever was written.
/// Zero-row partitions produce no archive and no stray file.
pub fn archive_partitions(
    partitions: &[PartitionSummary],
) -> Result<Vec<PathBuf>, TriageError> {
    let mut archives = Vec::with_capacity(partitions.len());
    for partition in partitions {
        if partition.rows == 0 {
            continue;
        }
        let archive_path = partition.path.with_extension(ZIP_EXTENSION);
        write_archive(&partition.path, &archive_path)?;
        fs::remove_file(&partition.path)?;
        info!(
            bucket = partition.bucket.label(),
            archive = %archive_path.display(),
            rows = partition.rows,
            "partition archived"
        );
        archives.push(archive_path);
    }
    Ok(archives)
}

/// Write one deflate-compressed zip holding the partition file as its
/// single entry, named after the partition file itself.
fn write_archive(csv_path: &Path, archive_path: &Path) -> Result<(), TriageError> {
    let entry_name = csv_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TriageError::Archive {
            reason: format!("invalid partition file name '{}'", csv_path.display()),
        })?;
    let mut writer = ZipWriter::new(File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(entry_name, options)
        .map_err(archive_error)?;
    let mut input = File::open(csv_path)?;
    io::copy(&mut input, &mut writer)?;
    writer.finish().map_err(archive_error)?;
    Ok(())
}

fn archive_error(err: zip::result::ZipError) -> TriageError {
    TriageError::Archive {
        reason: err.to_string(),
    }
}
