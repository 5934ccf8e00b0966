/// CVE identifier as published in advisory aliases and the exploited feed.
/// Example: `CVE-2021-44228`
pub type CveId = String;
/// Flattened column name (dotted path into the advisory document).
/// Example: `database_specific.severity`
pub type ColumnName = String;
/// Stringified cell value written to CSV output.
/// Examples: `CVE-2021-44228`, `1`, `["CVE-2020-8203"]`
pub type CellValue = String;
/// Reason text attached to skipped records and drift events.
/// Example: `expected value at line 1 column 2`
pub type SkipReason = String;
