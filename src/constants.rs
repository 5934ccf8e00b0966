/// Constants used by the exploited-vulnerability feed client.
pub mod feed {
    /// Published location of the CISA Known Exploited Vulnerabilities catalog.
    pub const KEV_FEED_URL: &str =
        "https://www.cisa.gov/sites/default/files/feeds/known_exploited_vulnerabilities.json";
    /// Request timeout applied to the single feed fetch.
    pub const FEED_TIMEOUT_SECS: u64 = 30;
}

/// Constants describing the advisory corpus layout.
pub mod corpus {
    /// Upstream repository mirrored for the full corpus.
    pub const PROJECT_URL: &str = "https://github.com/github/advisory-database";
    /// Local directory holding the mirrored advisory repository.
    pub const PROJECT_DIR: &str = "github_advisory_database";
    /// Subdirectory of the mirror that contains the record tree.
    pub const ADVISORIES_SUBDIR: &str = "advisories";
    /// Bundled sample corpus used by `--sample` runs.
    pub const SAMPLE_DIR: &str = "sample_advisories";
    /// File extension identifying advisory record files (case-insensitive).
    pub const RECORD_EXTENSION: &str = "json";
}

/// Constants describing output partition naming.
pub mod output {
    /// Default directory for per-severity CSV partitions and archives.
    pub const CSV_DIR: &str = "csv";
    /// Output directory used by `--sample` runs so sample output stays separate.
    pub const SAMPLE_CSV_DIR: &str = "csv_sample";
    /// Extension of uncompressed partition files.
    pub const CSV_EXTENSION: &str = "csv";
    /// Extension of finalized partition archives.
    pub const ZIP_EXTENSION: &str = "zip";
}

/// Constants for advisory record fields and synthetic columns.
pub mod row {
    /// Top-level array of alternate identifiers; the first entry is the
    /// primary identifier checked against the exploited index.
    pub const ALIASES_FIELD: &str = "aliases";
    /// Container object that carries the declared severity.
    pub const SEVERITY_CONTAINER_FIELD: &str = "database_specific";
    /// Severity field inside the container.
    pub const SEVERITY_FIELD: &str = "severity";
    /// Synthetic column always present in output rows, empty when the
    /// record carries no withdrawal timestamp.
    pub const WITHDRAWN_COLUMN: &str = "withdrawn";
    /// Synthetic 0/1 column flagging known-exploited advisories.
    pub const KEV_COLUMN: &str = "KEV";
    /// Separator joining nested object keys into flattened column names.
    pub const COLUMN_PATH_SEPARATOR: &str = ".";
}

/// Constants used by the worker coordinator.
pub mod workers {
    /// Default size of the worker pool.
    pub const DEFAULT_WORKERS: usize = 4;
    /// Log message used when malformed records are skipped.
    pub const SKIP_MALFORMED_MSG: &str = "skipping malformed advisory record";
    /// Log message used when a row disagrees with its partition schema.
    pub const SCHEMA_DRIFT_MSG: &str = "row columns disagree with partition header";
}
