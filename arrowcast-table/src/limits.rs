//! Per-run resource caps shared by every front-end driver.

/// Hard limits applied during ingestion.
///
/// Built once per conversion and frozen for the lifetime of the run; there
/// is no global configuration state. The defaults are unbounded except for
/// the error-snippet cap; each CLI overrides fields per its own defaults
/// (the Excel tools cap rows and columns at the sheet grid size).
#[derive(Debug, Clone)]
pub struct Limits {
    /// Rows at or past this index are parsed but not stored.
    pub max_rows: usize,
    /// Columns at or past this count are skipped with a warning.
    pub max_columns: usize,
    /// Per-cell truncation cap, in bytes.
    pub max_bytes_per_value: usize,
    /// Per-column-name truncation cap, in bytes.
    pub max_bytes_per_column_name: usize,
    /// Truncation cap for snippets embedded in warnings.
    pub max_bytes_per_error_value: usize,
    /// Cumulative useful-byte ceiling; on breach, ingestion stops.
    pub max_bytes_total: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rows: usize::MAX,
            max_columns: usize::MAX,
            max_bytes_per_value: usize::MAX,
            max_bytes_per_column_name: usize::MAX,
            max_bytes_per_error_value: 100,
            max_bytes_total: u64::MAX,
        }
    }
}

/// Default row cap for spreadsheet drivers (the XLSX grid height).
pub const EXCEL_MAX_ROWS: usize = 1_048_576;
/// Default column cap for spreadsheet drivers (the XLSX grid width).
pub const EXCEL_MAX_COLUMNS: usize = 16_384;
/// Default per-cell cap for spreadsheet drivers: 32,767 UTF-16 units of
/// cell text at up to four UTF-8 bytes each.
pub const EXCEL_MAX_BYTES_PER_VALUE: usize = 32_767 * 4;
