//! Counted, first-occurrence-located diagnostics shared by every driver.
//!
//! Ingestion is write-mostly: callers bump a kind through its dedicated
//! method and never read fields back. A terminal [`Warnings::render`]
//! produces the human-readable report, one line per non-zero kind; the
//! exact phrasing is part of the contract and covered by tests.

use std::fmt::Write as _;

use crate::limits::Limits;
use crate::string_buffer::StringBuffer;

/// How many distinct names we bother distinguishing for kinds that cannot
/// be counted without unbounded memory: zero, one, or "more than one".
const MORE_THAN_ONE: u8 = 2;

#[derive(Debug, Default, Clone)]
pub struct Warnings {
    // Things that can go wrong with the entire file.
    json_parse_error: Option<(u64, String)>,
    xls_error: Option<String>,
    xlsx_error: Option<String>,
    bad_root: Option<String>,

    // Things that can go wrong with rows.
    n_rows_skipped: u32,
    stopped_out_of_memory: bool,
    n_rows_invalid: u32,
    first_row_invalid_index: usize,
    first_row_invalid: String,

    // Things that can go wrong with column names. Skipped and invalid
    // columns cannot be counted (we refuse to remember every name an
    // adversarial file throws at us), so those kinds only distinguish
    // zero / one / more than one.
    n_columns_skipped: u8,
    first_column_skipped: String,
    n_columns_null: u32,
    first_column_null: String,
    n_column_names_truncated: u32,
    first_column_name_truncated: String,
    n_column_names_invalid: u8,
    first_column_name_invalid: String,
    n_column_names_duplicated: u8,
    first_column_name_duplicated_row: usize,
    first_column_name_duplicated: String,

    // Things that can go wrong with values.
    n_values_truncated: u32,
    first_value_truncated_row: usize,
    first_value_truncated_column: String,
    n_values_lossy_int_to_float: u32,
    first_value_lossy_int_to_float_row: usize,
    first_value_lossy_int_to_float_column: String,
    n_values_overflow_float: u32,
    first_value_overflow_float_row: usize,
    first_value_overflow_float_column: String,
    n_values_overflow_timestamp: u32,
    first_value_overflow_timestamp_row: usize,
    first_value_overflow_timestamp_column: String,
    n_values_number_to_text: u32,
    first_value_number_to_text_row: usize,
    first_value_number_to_text_column: String,
    n_values_timestamp_to_text: u32,
    first_value_timestamp_to_text_row: usize,
    first_value_timestamp_to_text_column: String,
    n_values_repaired: u32,
    first_value_repaired_row: usize,
    first_value_repaired_column: String,
    eof_in_quoted_value: bool,
}

impl Warnings {
    pub fn warn_json_parse_error(&mut self, pos: u64, message: &str) {
        self.json_parse_error = Some((pos, message.to_string()));
    }

    pub fn warn_xls_parse_error(&mut self, message: &str) {
        self.xls_error = Some(message.to_string());
    }

    pub fn warn_xlsx_parse_error(&mut self, message: &str) {
        self.xlsx_error = Some(message.to_string());
    }

    pub fn warn_bad_root(&mut self, snippet: &str) {
        self.bad_root = Some(snippet.to_string());
    }

    pub fn warn_rows_skipped(&mut self, n: usize) {
        self.n_rows_skipped = self
            .n_rows_skipped
            .saturating_add(u32::try_from(n).unwrap_or(u32::MAX));
    }

    pub fn warn_stopped_out_of_memory(&mut self) {
        self.stopped_out_of_memory = true;
    }

    pub fn warn_row_invalid(&mut self, row: usize, snippet: &str) {
        if self.n_rows_invalid == 0 {
            self.first_row_invalid_index = row;
            self.first_row_invalid = snippet.to_string();
        }
        self.n_rows_invalid = self.n_rows_invalid.saturating_add(1);
    }

    pub fn warn_column_skipped(&mut self, name: &str) {
        if self.n_columns_skipped == 0 {
            self.n_columns_skipped = 1;
            self.first_column_skipped = name.to_string();
        } else if self.n_columns_skipped == 1 && name != self.first_column_skipped {
            self.n_columns_skipped = MORE_THAN_ONE;
        }
    }

    /// Called once per column name per file.
    pub fn warn_column_null(&mut self, name: &str) {
        if self.n_columns_null == 0 {
            self.first_column_null = name.to_string();
        }
        self.n_columns_null = self.n_columns_null.saturating_add(1);
    }

    /// Called once per column name per file.
    pub fn warn_column_name_truncated(&mut self, name: &str) {
        if self.n_column_names_truncated == 0 {
            self.first_column_name_truncated = name.to_string();
        }
        self.n_column_names_truncated = self.n_column_names_truncated.saturating_add(1);
    }

    /// May be called many times with the same name; invalid names are not
    /// remembered individually.
    pub fn warn_column_name_invalid(&mut self, _row: usize, name: &str) {
        if self.n_column_names_invalid == 0 {
            self.n_column_names_invalid = 1;
            self.first_column_name_invalid = name.to_string();
        } else if self.n_column_names_invalid == 1 && name != self.first_column_name_invalid {
            self.n_column_names_invalid = MORE_THAN_ONE;
        }
    }

    /// May be called many times with the same name, and even the same
    /// name and row.
    pub fn warn_column_name_duplicated(&mut self, row: usize, name: &str) {
        if self.n_column_names_duplicated == 0 {
            self.n_column_names_duplicated = 1;
            self.first_column_name_duplicated_row = row;
            self.first_column_name_duplicated = name.to_string();
        } else if self.n_column_names_duplicated == 1 && name != self.first_column_name_duplicated {
            self.n_column_names_duplicated = MORE_THAN_ONE;
        }
    }

    pub fn warn_value_truncated(&mut self, row: usize, column: &str) {
        if self.n_values_truncated == 0 {
            self.first_value_truncated_row = row;
            self.first_value_truncated_column = column.to_string();
        }
        self.n_values_truncated = self.n_values_truncated.saturating_add(1);
    }

    pub fn warn_values_lossy_int_to_float(&mut self, n: u32, row: usize, column: &str) {
        if self.n_values_lossy_int_to_float == 0 {
            self.first_value_lossy_int_to_float_row = row;
            self.first_value_lossy_int_to_float_column = column.to_string();
        }
        self.n_values_lossy_int_to_float = self.n_values_lossy_int_to_float.saturating_add(n);
    }

    pub fn warn_values_overflow_float(&mut self, n: u32, row: usize, column: &str) {
        if self.n_values_overflow_float == 0 {
            self.first_value_overflow_float_row = row;
            self.first_value_overflow_float_column = column.to_string();
        }
        self.n_values_overflow_float = self.n_values_overflow_float.saturating_add(n);
    }

    pub fn warn_values_overflow_timestamp(&mut self, n: u32, row: usize, column: &str) {
        if self.n_values_overflow_timestamp == 0 {
            self.first_value_overflow_timestamp_row = row;
            self.first_value_overflow_timestamp_column = column.to_string();
        }
        self.n_values_overflow_timestamp = self.n_values_overflow_timestamp.saturating_add(n);
    }

    pub fn warn_values_number_to_text(&mut self, n: u32, row: usize, column: &str) {
        if self.n_values_number_to_text == 0 {
            self.first_value_number_to_text_row = row;
            self.first_value_number_to_text_column = column.to_string();
        }
        self.n_values_number_to_text = self.n_values_number_to_text.saturating_add(n);
    }

    pub fn warn_values_timestamp_to_text(&mut self, n: u32, row: usize, column: &str) {
        if self.n_values_timestamp_to_text == 0 {
            self.first_value_timestamp_to_text_row = row;
            self.first_value_timestamp_to_text_column = column.to_string();
        }
        self.n_values_timestamp_to_text = self.n_values_timestamp_to_text.saturating_add(n);
    }

    pub fn warn_value_repaired(&mut self, row: usize, column: &str) {
        if self.n_values_repaired == 0 {
            self.first_value_repaired_row = row;
            self.first_value_repaired_column = column.to_string();
        }
        self.n_values_repaired = self.n_values_repaired.saturating_add(1);
    }

    pub fn warn_eof_in_quoted_value(&mut self) {
        self.eof_in_quoted_value = true;
    }

    /// Render the terminal report: one line per non-zero kind, in a fixed
    /// order, using the run's limits for context. Empty when nothing went
    /// wrong.
    pub fn render(&self, limits: &Limits) -> String {
        let mut out = String::new();

        if let Some((pos, message)) = &self.json_parse_error {
            let _ = writeln!(out, "JSON parse error at byte {pos}: {message}");
        }
        if let Some(snippet) = &self.bad_root {
            let _ = writeln!(
                out,
                "JSON is not an Array or Object containing an Array; got: {snippet}"
            );
        }
        if let Some(message) = &self.xls_error {
            let _ = writeln!(out, "Invalid XLS file: {message}");
        }
        if let Some(message) = &self.xlsx_error {
            let _ = writeln!(out, "Invalid XLSX file: {message}");
        }

        if self.n_rows_skipped > 0 {
            let _ = writeln!(
                out,
                "skipped {} rows (after row limit of {})",
                self.n_rows_skipped, limits.max_rows
            );
        }
        if self.stopped_out_of_memory {
            let _ = writeln!(
                out,
                "stopped at limit of {} bytes of data",
                limits.max_bytes_total
            );
        }
        if self.n_rows_invalid > 0 {
            let _ = writeln!(
                out,
                "skipped {} non-Object records; example Array item {}: {}",
                self.n_rows_invalid, self.first_row_invalid_index, self.first_row_invalid
            );
        }

        if self.n_columns_skipped > 0 {
            let _ = writeln!(
                out,
                "skipped column {}{} (after column limit of {})",
                self.first_column_skipped,
                and_more(self.n_columns_skipped > 1),
                limits.max_columns
            );
        }
        if self.n_columns_null > 0 {
            let _ = writeln!(
                out,
                "chose string type for null column {}{}",
                self.first_column_null,
                and_more(self.n_columns_null > 1)
            );
        }
        if self.n_column_names_truncated > 0 {
            let _ = writeln!(
                out,
                "truncated {} column names; example {}",
                self.n_column_names_truncated, self.first_column_name_truncated
            );
        }
        if self.n_column_names_invalid > 0 {
            let _ = writeln!(
                out,
                "ignored invalid column {}{}",
                json_quoted(&self.first_column_name_invalid),
                and_more(self.n_column_names_invalid > 1)
            );
        }
        if self.n_column_names_duplicated > 0 {
            let _ = writeln!(
                out,
                "ignored duplicate column {}{} starting at row {}",
                self.first_column_name_duplicated,
                and_more(self.n_column_names_duplicated > 1),
                self.first_column_name_duplicated_row
            );
        }

        if self.n_values_truncated > 0 {
            let _ = writeln!(
                out,
                "truncated {} values (value byte limit is {}; see row {} column {})",
                self.n_values_truncated,
                limits.max_bytes_per_value,
                self.first_value_truncated_row,
                self.first_value_truncated_column
            );
        }
        if self.n_values_lossy_int_to_float > 0 {
            let _ = writeln!(
                out,
                "lost precision converting {} int64 Numbers to float64; see row {} column {}",
                self.n_values_lossy_int_to_float,
                self.first_value_lossy_int_to_float_row,
                self.first_value_lossy_int_to_float_column
            );
        }
        if self.n_values_overflow_float > 0 {
            let _ = writeln!(
                out,
                "replaced infinity with null for {} Numbers; see row {} column {}",
                self.n_values_overflow_float,
                self.first_value_overflow_float_row,
                self.first_value_overflow_float_column
            );
        }
        if self.n_values_overflow_timestamp > 0 {
            let _ = writeln!(
                out,
                "replaced out-of-range with null for {} Timestamps; see row {} column {}",
                self.n_values_overflow_timestamp,
                self.first_value_overflow_timestamp_row,
                self.first_value_overflow_timestamp_column
            );
        }
        if self.n_values_number_to_text > 0 {
            let _ = writeln!(
                out,
                "interpreted {} Numbers as String; see row {} column {}",
                self.n_values_number_to_text,
                self.first_value_number_to_text_row,
                self.first_value_number_to_text_column
            );
        }
        if self.n_values_timestamp_to_text > 0 {
            let _ = writeln!(
                out,
                "interpreted {} Timestamps as String; see row {} column {}",
                self.n_values_timestamp_to_text,
                self.first_value_timestamp_to_text_row,
                self.first_value_timestamp_to_text_column
            );
        }
        if self.n_values_repaired > 0 {
            let _ = writeln!(
                out,
                "repaired {} values (misplaced quotation marks; see row {} column {})",
                self.n_values_repaired,
                self.first_value_repaired_row,
                self.first_value_repaired_column
            );
        }
        if self.eof_in_quoted_value {
            let _ = writeln!(out, "repaired last value (missing quotation mark)");
        }

        out
    }
}

fn and_more(more: bool) -> &'static str {
    if more { " and more" } else { "" }
}

/// Invalid column names contain control bytes by definition; JSON-quote
/// them so the report stays printable.
fn json_quoted(name: &str) -> String {
    let mut buf = StringBuffer::new(name.len() * 6 + 2);
    buf.append_json_quoted(name.as_bytes());
    buf.valid_utf8_view().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_limits() -> Limits {
        Limits {
            max_rows: 10,
            max_columns: 4,
            max_bytes_per_value: 16,
            max_bytes_total: 1024,
            ..Limits::default()
        }
    }

    #[test]
    fn empty_ledger_renders_nothing() {
        assert_eq!(Warnings::default().render(&small_limits()), "");
    }

    #[test]
    fn rows_and_columns_lines() {
        let mut w = Warnings::default();
        w.warn_rows_skipped(2);
        w.warn_column_skipped("z");
        assert_eq!(
            w.render(&small_limits()),
            "skipped 2 rows (after row limit of 10)\n\
             skipped column z (after column limit of 4)\n"
        );
    }

    #[test]
    fn skipped_columns_distinguish_one_from_many() {
        let mut w = Warnings::default();
        w.warn_column_skipped("z");
        w.warn_column_skipped("z");
        assert!(w.render(&small_limits()).contains("skipped column z (after"));
        w.warn_column_skipped("q");
        assert!(
            w.render(&small_limits())
                .contains("skipped column z and more (after")
        );
    }

    #[test]
    fn value_warnings_remember_first_location() {
        let mut w = Warnings::default();
        w.warn_values_number_to_text(2, 0, "x");
        w.warn_values_number_to_text(3, 7, "y");
        assert_eq!(
            w.render(&small_limits()),
            "interpreted 5 Numbers as String; see row 0 column x\n"
        );
    }

    #[test]
    fn invalid_column_name_is_json_quoted() {
        let mut w = Warnings::default();
        w.warn_column_name_invalid(0, "\n");
        w.warn_column_name_invalid(1, "\t");
        assert_eq!(
            w.render(&small_limits()),
            "ignored invalid column \"\\n\" and more\n"
        );
    }

    #[test]
    fn counts_saturate() {
        let mut w = Warnings::default();
        w.warn_values_lossy_int_to_float(u32::MAX, 0, "x");
        w.warn_values_lossy_int_to_float(5, 1, "x");
        assert!(
            w.render(&small_limits())
                .contains(&format!("converting {} int64", u32::MAX))
        );
    }
}
