use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::row::{
    ALIASES_FIELD, COLUMN_PATH_SEPARATOR, KEV_COLUMN, SEVERITY_CONTAINER_FIELD, SEVERITY_FIELD,
    WITHDRAWN_COLUMN,
};
use crate::errors::TriageError;
use crate::kev::ExploitedIndex;
use crate::types::{CellValue, ColumnName};

/// Output partition a record is routed to, derived from its declared
/// severity. The set is closed: unrecognized labels map to `Undefined`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeverityBucket {
    Critical,
    High,
    Medium,
    Moderate,
    Low,
    Undefined,
}

impl SeverityBucket {
    /// Every bucket, in canonical partition order.
    pub const ALL: [SeverityBucket; 6] = [
        SeverityBucket::Critical,
        SeverityBucket::High,
        SeverityBucket::Medium,
        SeverityBucket::Moderate,
        SeverityBucket::Low,
        SeverityBucket::Undefined,
    ];

    /// Lowercase label used for partition file naming.
    pub fn label(&self) -> &'static str {
        match self {
            SeverityBucket::Critical => "critical",
            SeverityBucket::High => "high",
            SeverityBucket::Medium => "medium",
            SeverityBucket::Moderate => "moderate",
            SeverityBucket::Low => "low",
            SeverityBucket::Undefined => "undefined",
        }
    }

    /// Stable position in [`SeverityBucket::ALL`], used to index
    /// per-bucket state. Declaration order matches `ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Map a declared severity value onto a bucket.
    ///
    /// Absent, null, empty, and unrecognized labels all land in
    /// `Undefined`; matching is case-insensitive.
    pub fn from_severity(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SeverityBucket::Undefined;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => SeverityBucket::Critical,
            "high" => SeverityBucket::High,
            "medium" => SeverityBucket::Medium,
            "moderate" => SeverityBucket::Moderate,
            "low" => SeverityBucket::Low,
            "" => SeverityBucket::Undefined,
            other => {
                debug!(severity = other, "unrecognized severity label");
                SeverityBucket::Undefined
            }
        }
    }
}

/// Flat column-to-cell mapping produced by deterministic flattening of
/// one advisory document, including the synthetic `withdrawn` and
/// `KEV` columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedRow {
    columns: IndexMap<ColumnName, CellValue>,
}

impl NormalizedRow {
    /// Column names in flattening order.
    pub fn column_names(&self) -> Vec<ColumnName> {
        self.columns.keys().cloned().collect()
    }

    /// Cell value for a column, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// Iterate `(column, cell)` pairs in flattening order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(column, cell)| (column.as_str(), cell.as_str()))
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the row carries no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// True when the row's column set and order match `header` exactly.
    pub fn matches_header(&self, header: &[ColumnName]) -> bool {
        self.columns.len() == header.len()
            && self.columns.keys().zip(header).all(|(column, expected)| column == expected)
    }

    /// Cell values projected onto `header` order: missing columns
    /// become empty cells and columns absent from the header are
    /// dropped.
    pub fn project(&self, header: &[ColumnName]) -> Vec<CellValue> {
        header
            .iter()
            .map(|column| self.columns.get(column).cloned().unwrap_or_default())
            .collect()
    }

    /// Columns present in the row but not in `header`, and vice versa.
    pub fn header_diff(&self, header: &[ColumnName]) -> (Vec<ColumnName>, Vec<ColumnName>) {
        let extra = self
            .columns
            .keys()
            .filter(|column| !header.contains(*column))
            .cloned()
            .collect();
        let missing = header
            .iter()
            .filter(|column| !self.columns.contains_key(*column))
            .cloned()
            .collect();
        (extra, missing)
    }
}

/// Read and normalize one advisory record file.
///
/// Produces the flattened row and its severity bucket. Parse failures
/// and violated structural assumptions surface as `MalformedRecord`
/// carrying the offending path.
pub fn transform_record(
    path: &Path,
    index: &ExploitedIndex,
) -> Result<(NormalizedRow, SeverityBucket), TriageError> {
    let raw = fs::read_to_string(path).map_err(|err| TriageError::MalformedRecord {
        path: path.to_path_buf(),
        reason: format!("read failed: {err}"),
    })?;
    let document: Value =
        serde_json::from_str(&raw).map_err(|err| TriageError::MalformedRecord {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    transform_document(document, index).map_err(|reason| TriageError::MalformedRecord {
        path: path.to_path_buf(),
        reason,
    })
}

/// Normalize an already-parsed advisory document.
///
/// Kept separate from the file read so the flattening and flag logic
/// are testable without touching disk.
pub fn transform_document(
    document: Value,
    index: &ExploitedIndex,
) -> Result<(NormalizedRow, SeverityBucket), String> {
    let Value::Object(mut fields) = document else {
        return Err("top-level value is not an object".to_string());
    };

    let severity = match fields.get(SEVERITY_CONTAINER_FIELD) {
        Some(Value::Object(container)) => container
            .get(SEVERITY_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string),
        Some(Value::Null) | None => {
            return Err(format!("'{SEVERITY_CONTAINER_FIELD}' container missing"));
        }
        Some(_) => {
            return Err(format!("'{SEVERITY_CONTAINER_FIELD}' is not an object"));
        }
    };
    let bucket = SeverityBucket::from_severity(severity.as_deref());

    // Membership uses only the first alias; an absent or empty alias
    // list is never flagged.
    let first_alias = fields
        .get(ALIASES_FIELD)
        .and_then(Value::as_array)
        .and_then(|aliases| aliases.first())
        .and_then(Value::as_str);
    let exploited = first_alias.is_some_and(|id| index.contains(id));

    // Inject the synthetic columns before flattening so their position
    // is part of the deterministic column order. `withdrawn` keeps its
    // original position when the record already carries it.
    fields.entry(WITHDRAWN_COLUMN).or_insert(Value::Null);
    fields.insert(
        KEV_COLUMN.to_string(),
        Value::from(if exploited { 1 } else { 0 }),
    );

    let mut columns = IndexMap::new();
    flatten_object(None, &fields, &mut columns);
    Ok((NormalizedRow { columns }, bucket))
}

/// Recursively flatten nested objects into dotted column paths.
/// Arrays and scalars terminate recursion and become cells.
fn flatten_object(
    prefix: Option<&str>,
    fields: &Map<String, Value>,
    out: &mut IndexMap<ColumnName, CellValue>,
) {
    for (key, value) in fields {
        let column = match prefix {
            Some(prefix) => format!("{prefix}{COLUMN_PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_object(Some(&column), nested, out),
            other => {
                out.insert(column, cell_value(other));
            }
        }
    }
}

/// Scalar rendering for cells: null is empty, strings are verbatim,
/// numbers and booleans use their canonical text form, and arrays are
/// kept whole as compact JSON.
fn cell_value(value: &Value) -> CellValue {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}
