//! CSV front-end: a byte-level state machine that feeds every cell to the
//! table core as a string.
//!
//! The machine tolerates real-world damage instead of rejecting it: a
//! stray quote after a quoted field is repaired (and warned about), EOF
//! inside a quoted field closes the field, `\r\n` collapses to one line
//! break, and empty lines disappear. Columns are named `"0"`, `"1"`, … in
//! grid order.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use tracing::debug;

use arrowcast_result::Result;
use arrowcast_table::{Limits, StringBuffer, TableBuilder, Warnings};

/// Per-run CSV options, frozen at construction.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    pub delimiter: u8,
    pub limits: Limits,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            limits: Limits::default(),
        }
    }
}

pub struct CsvReadResult {
    pub warnings: Warnings,
    pub batch: RecordBatch,
}

pub fn read_csv_file(path: &Path, options: &CsvReadOptions) -> Result<CsvReadResult> {
    let file = File::open(path)?;
    read_csv(BufReader::new(file), options)
}

/*
 * State machine:
 *
 * VALUE_BEGIN: start of a value (and the initial state)
 * IN_UNQUOTED_VALUE: reading a value without quotation marks
 * IN_QUOTED_VALUE: reading a value inside quotation marks
 * AFTER_QUOTE: either at end of a quoted value, or escaping '"'
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ValueBegin,
    InUnquotedValue,
    InQuotedValue,
    AfterQuote,
}

struct CsvReader {
    state: State,
    row: usize,
    column: usize,
    value: StringBuffer,
    table: TableBuilder,
    warnings: Warnings,
    limits: Limits,
    delimiter: u8,
    n_bytes_total: u64,
    stopped: bool,
    current_row_written: bool,
}

pub fn read_csv<R: BufRead>(mut input: R, options: &CsvReadOptions) -> Result<CsvReadResult> {
    let limits = options.limits.clone();
    let mut r = CsvReader {
        state: State::ValueBegin,
        row: 0,
        column: 0,
        value: StringBuffer::new(limits.max_bytes_per_value),
        table: TableBuilder::new(limits.max_columns),
        warnings: Warnings::default(),
        limits,
        delimiter: options.delimiter,
        n_bytes_total: 0,
        stopped: false,
        current_row_written: false,
    };

    'ingest: loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let n = buf.len();
        for &c in buf {
            r.step(c);
            if r.stopped {
                break 'ingest;
            }
        }
        input.consume(n);
    }
    if !r.stopped {
        r.finish_eof();
    }

    let n_rows = (r.row + usize::from(r.current_row_written)).min(r.limits.max_rows);
    debug!(rows = n_rows, columns = r.table.n_columns(), "CSV ingest complete");
    let batch = r.table.finish(n_rows, &mut r.warnings)?;
    Ok(CsvReadResult {
        warnings: r.warnings,
        batch,
    })
}

impl CsvReader {
    fn step(&mut self, c: u8) {
        match self.state {
            State::ValueBegin => {
                if c == self.delimiter {
                    self.emit_value();
                    self.advance_column();
                } else if c == b'\r' || c == b'\n' {
                    // Empty lines vanish; "\r\n" is one line break.
                    if self.column > 0 {
                        self.emit_value();
                        self.advance_row();
                    }
                } else if c == b'"' {
                    self.state = State::InQuotedValue;
                } else {
                    self.value.append_byte(c);
                    self.state = State::InUnquotedValue;
                }
            }
            State::InUnquotedValue => {
                if c == self.delimiter {
                    self.emit_value();
                    self.clear_value();
                    self.advance_column();
                    self.state = State::ValueBegin;
                } else if c == b'\r' || c == b'\n' {
                    self.emit_value();
                    self.clear_value();
                    self.advance_row();
                    self.state = State::ValueBegin;
                } else {
                    self.value.append_byte(c);
                }
            }
            State::InQuotedValue => {
                if c == b'"' {
                    self.state = State::AfterQuote;
                } else {
                    self.value.append_byte(c);
                }
            }
            State::AfterQuote => {
                if c == self.delimiter {
                    self.emit_value();
                    self.clear_value();
                    self.advance_column();
                    self.state = State::ValueBegin;
                } else if c == b'"' {
                    // "" inside a quoted field is a literal quote.
                    self.value.append_byte(b'"');
                    self.state = State::InQuotedValue;
                } else if c == b'\r' || c == b'\n' {
                    self.emit_value();
                    self.clear_value();
                    self.advance_row();
                    self.state = State::ValueBegin;
                } else {
                    // Data after a closing quote: keep it and warn.
                    self.warnings
                        .warn_value_repaired(self.row, &self.column.to_string());
                    self.value.append_byte(c);
                    self.state = State::InUnquotedValue;
                }
            }
        }
    }

    fn finish_eof(&mut self) {
        match self.state {
            State::ValueBegin => {
                if self.column > 0 {
                    self.emit_value();
                }
            }
            State::InUnquotedValue | State::AfterQuote => self.emit_value(),
            State::InQuotedValue => {
                self.warnings.warn_eof_in_quoted_value();
                self.emit_value();
            }
        }
    }

    fn emit_value(&mut self) {
        if self.row >= self.limits.max_rows {
            // Keep reading so the skipped-row count is right; count each
            // row once, at its first cell.
            if self.column == 0 {
                self.warnings.warn_rows_skipped(1);
            }
            return;
        }
        if self.column >= self.limits.max_columns {
            self.warnings.warn_column_skipped(&self.column.to_string());
            return;
        }
        if self.value.has_overflow() {
            self.warnings
                .warn_value_truncated(self.row, &self.column.to_string());
        }

        let text = self.value.valid_utf8_view();
        let next_total = self.n_bytes_total + text.len() as u64;
        if next_total > self.limits.max_bytes_total {
            self.warnings.warn_stopped_out_of_memory();
            self.stopped = true;
            return;
        }
        self.n_bytes_total = next_total;

        if let Some(column) = self.table.column_at(self.column, &mut self.warnings) {
            column.write_string(self.row, text);
            self.current_row_written = true;
        }
    }

    fn clear_value(&mut self) {
        self.value.reset();
    }

    fn advance_column(&mut self) {
        self.column += 1;
    }

    fn advance_row(&mut self) {
        self.row += 1;
        self.column = 0;
        self.current_row_written = false;
    }
}
