use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::constants::corpus::RECORD_EXTENSION;

/// Recursive corpus discovery rooted at a directory.
///
/// Enumerates every advisory record file (by extension) without reading
/// file contents, so tens of thousands of records stay cheap to list.
/// The result is path-sorted: dispatch input is deterministic even
/// though worker completion order is not.
pub struct CorpusScanner {
    root: PathBuf,
    follow_links: bool,
}

impl CorpusScanner {
    /// Create a scanner rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
        }
    }

    /// Control whether symlinks are followed while walking the root.
    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Root directory this scanner walks.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate record files under the root.
    ///
    /// Returns an empty list, not an error, when nothing matches; the
    /// caller decides whether an empty corpus is fatal. Unreadable
    /// directory entries are skipped.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        let mut walker = WalkDir::new(&self.root);
        if self.follow_links {
            walker = walker.follow_links(true);
        }
        for entry in walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path();
            if is_record_file(path) {
                candidates.push(path.to_path_buf());
            }
        }
        candidates.sort();
        debug!(
            root = %self.root.display(),
            count = candidates.len(),
            "corpus scan completed"
        );
        candidates
    }
}

/// True if the path has the advisory record extension (case-insensitive).
pub fn is_record_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_finds_nested_records_and_sorts_them() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("github/2021/05");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("GHSA-bbbb.json"), "{}").unwrap();
        fs::write(temp.path().join("GHSA-aaaa.json"), "{}").unwrap();
        fs::write(temp.path().join("notes.md"), "not a record").unwrap();
        fs::write(temp.path().join("README"), "no extension").unwrap();

        let paths = CorpusScanner::new(temp.path()).scan();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("GHSA-aaaa.json"));
        assert!(paths[1].ends_with("github/2021/05/GHSA-bbbb.json"));

        let again = CorpusScanner::new(temp.path()).scan();
        assert_eq!(paths, again);
    }

    #[test]
    fn scan_of_empty_root_returns_empty_not_error() {
        let temp = tempdir().unwrap();
        assert!(CorpusScanner::new(temp.path()).scan().is_empty());
    }

    #[test]
    fn scan_of_missing_root_returns_empty() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("does_not_exist");
        assert!(CorpusScanner::new(missing).scan().is_empty());
    }

    #[test]
    fn record_extension_is_case_insensitive() {
        assert!(is_record_file(Path::new("GHSA-xxxx.json")));
        assert!(is_record_file(Path::new("GHSA-xxxx.JSON")));
        assert!(!is_record_file(Path::new("GHSA-xxxx.jsonl")));
        assert!(!is_record_file(Path::new("json")));
    }
}
