//! JSON front-end: an event-driven walk over the document that turns the
//! first array of objects it finds into rows.
//!
//! The root may be the record array itself, or an object whose first array
//! child becomes the record array. Only objects directly inside that array
//! become rows; anything else in the array is reported as an invalid row.
//! Scalar record values flow into the table core as strings or raw number
//! literals; nested objects and arrays are re-serialized to JSON through
//! the bounded value buffer and stored as (possibly truncated) text.

#![forbid(unsafe_code)]

pub mod lexer;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use tracing::debug;

use arrowcast_result::Result;
use arrowcast_table::{Limits, StringBuffer, TableBuilder, Warnings};

use crate::lexer::{JsonEvent, JsonLexer, LexError};

#[derive(Debug, Clone, Default)]
pub struct JsonReadOptions {
    pub limits: Limits,
}

pub struct JsonReadResult {
    pub warnings: Warnings,
    pub batch: RecordBatch,
}

pub fn read_json_file(path: &Path, options: &JsonReadOptions) -> Result<JsonReadResult> {
    let file = File::open(path)?;
    read_json(BufReader::new(file), options)
}

pub fn read_json<R: BufRead>(input: R, options: &JsonReadOptions) -> Result<JsonReadResult> {
    let limits = options.limits.clone();
    let mut lexer = JsonLexer::new(input);
    let mut assembler = RecordAssembler::new(limits);

    loop {
        match lexer.next_event() {
            Ok(Some(event)) => assembler.handle(event),
            Ok(None) => break,
            Err(LexError::Io(err)) => return Err(err.into()),
            Err(LexError::Syntax { pos, message }) => {
                // Keep whatever parsed cleanly before the error.
                assembler.warnings.warn_json_parse_error(pos, message);
                break;
            }
        }
    }

    assembler.finish()
}

/// Where we are relative to the record array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// Searching the root object for its first array child.
    InRootObject,
    InRecordArray,
    InRecord,
    /// Ignore the rest of the stream (bad root, or a limit was hit). The
    /// lexer still surfaces syntax errors.
    Done,
}

/// Which bounded buffer a serialization helper should write to.
#[derive(Debug, Clone, Copy)]
enum Buf {
    Value,
    Error,
}

struct RecordAssembler {
    state: State,
    row: usize,
    is_row_partially_written: bool,
    n_bytes_total: u64,
    key_buf: StringBuffer,
    value_buf: StringBuffer,
    error_buf: StringBuffer,
    table: TableBuilder,
    warnings: Warnings,
    limits: Limits,
    /// Index of the column awaiting this record's next value. `None` while
    /// not inside a record, and also when the value must be discarded
    /// (duplicate key, invalid name, over the column or row budget).
    column: Option<usize>,
    /// Open `{`/`[` between us and the structural level we care about.
    nest_level: usize,
    /// While serializing a nested value: whether the next element needs a
    /// comma first.
    nest_want_comma: bool,
}

impl RecordAssembler {
    fn new(limits: Limits) -> Self {
        Self {
            state: State::Start,
            row: 0,
            is_row_partially_written: false,
            n_bytes_total: 0,
            key_buf: StringBuffer::new(limits.max_bytes_per_column_name),
            value_buf: StringBuffer::new(limits.max_bytes_per_value),
            error_buf: StringBuffer::new(limits.max_bytes_per_error_value),
            table: TableBuilder::new(limits.max_columns),
            warnings: Warnings::default(),
            limits,
            column: None,
            nest_level: 0,
            nest_want_comma: false,
        }
    }

    fn finish(mut self) -> Result<JsonReadResult> {
        let mut n_rows = self.row;
        if n_rows > self.limits.max_rows {
            self.warnings.warn_rows_skipped(n_rows - self.limits.max_rows);
            n_rows = self.limits.max_rows;
        }
        let n_rows = n_rows + usize::from(self.is_row_partially_written);
        debug!(
            rows = n_rows,
            columns = self.table.n_columns(),
            "JSON ingest complete"
        );
        let batch = self.table.finish(n_rows, &mut self.warnings)?;
        Ok(JsonReadResult {
            warnings: self.warnings,
            batch,
        })
    }

    fn handle(&mut self, event: JsonEvent<'_>) {
        match event {
            JsonEvent::Null => self.on_null(),
            JsonEvent::Bool(b) => self.on_bool(b),
            JsonEvent::Number(literal) => self.on_number(literal),
            JsonEvent::String(s) => self.on_string(s),
            JsonEvent::Key(k) => self.on_key(k),
            JsonEvent::StartObject => self.on_start_object(),
            JsonEvent::EndObject => self.on_end_object(),
            JsonEvent::StartArray => self.on_start_array(),
            JsonEvent::EndArray => self.on_end_array(),
        }
    }

    fn on_null(&mut self) {
        match self.state {
            State::Start => {
                self.error_buf.append(b"null");
                self.flush_bad_root();
            }
            State::InRootObject | State::Done => {}
            State::InRecordArray => {
                self.append_comma_and_expect_future_comma_if_serializing(Buf::Error);
                self.error_buf.append(b"null");
                if self.nest_level == 0 {
                    self.flush_row_invalid();
                }
            }
            State::InRecord => {
                if self.column.is_some() {
                    if self.nest_level > 0 {
                        self.append_comma_and_expect_future_comma_if_serializing(Buf::Value);
                        self.value_buf.append(b"null");
                    } else {
                        self.finish_column_with_null();
                    }
                }
            }
        }
    }

    fn on_bool(&mut self, value: bool) {
        let text: &[u8] = if value { b"true" } else { b"false" };
        match self.state {
            State::Start => {
                self.error_buf.append(text);
                self.flush_bad_root();
            }
            State::InRootObject | State::Done => {}
            State::InRecordArray => {
                self.append_comma_and_expect_future_comma_if_serializing(Buf::Error);
                self.error_buf.append(text);
                if self.nest_level == 0 {
                    self.flush_row_invalid();
                }
            }
            State::InRecord => {
                if self.column.is_some() {
                    if self.nest_level == 0 {
                        self.value_buf.append(text);
                        self.finish_column_with_string();
                    } else {
                        self.append_comma_and_expect_future_comma_if_serializing(Buf::Value);
                        self.value_buf.append(text);
                    }
                }
            }
        }
    }

    fn on_number(&mut self, literal: &str) {
        match self.state {
            State::Start => {
                self.error_buf.append(literal.as_bytes());
                self.flush_bad_root();
            }
            State::InRootObject | State::Done => {}
            State::InRecordArray => {
                self.append_comma_and_expect_future_comma_if_serializing(Buf::Error);
                self.error_buf.append(literal.as_bytes());
                if self.nest_level == 0 {
                    self.flush_row_invalid();
                }
            }
            State::InRecord => {
                if self.column.is_some() {
                    self.append_comma_and_expect_future_comma_if_serializing(Buf::Value);
                    self.value_buf.append(literal.as_bytes());
                    if self.nest_level == 0 {
                        self.finish_column_with_number();
                    }
                }
            }
        }
    }

    fn on_string(&mut self, s: &str) {
        match self.state {
            State::Start => {
                self.error_buf.append_json_quoted(s.as_bytes());
                self.flush_bad_root();
            }
            State::InRootObject | State::Done => {}
            State::InRecordArray => {
                self.append_comma_and_expect_future_comma_if_serializing(Buf::Error);
                self.error_buf.append_json_quoted(s.as_bytes());
                if self.nest_level == 0 {
                    self.flush_row_invalid();
                }
            }
            State::InRecord => {
                if self.column.is_some() {
                    if self.nest_level > 0 {
                        self.append_comma_and_expect_future_comma_if_serializing(Buf::Value);
                        self.value_buf.append_json_quoted(s.as_bytes());
                    } else {
                        // The value buffer doubles as the truncator.
                        self.value_buf.append(s.as_bytes());
                        if self.value_buf.has_overflow() {
                            self.warn_current_value_truncated();
                        }
                        self.finish_column_with_string();
                    }
                }
            }
        }
    }

    fn on_key(&mut self, key: &str) {
        match self.state {
            State::Start | State::Done | State::InRootObject => {}
            State::InRecordArray => {
                // A key inside some nested structure we are serializing for
                // a row-invalid warning, e.g. the file [[{"x": "y"}]].
                if self.nest_want_comma {
                    self.error_buf.append_byte(b',');
                }
                self.error_buf.append_json_quoted(key.as_bytes());
                self.error_buf.append_byte(b':');
                self.nest_want_comma = false;
            }
            State::InRecord => {
                if self.nest_level == 0 {
                    if self.row < self.limits.max_rows {
                        self.enter_column(key);
                    }
                    // Past the row limit we keep parsing to count skipped
                    // rows, but store nothing: column stays None.
                } else if self.column.is_some() {
                    if self.nest_want_comma {
                        self.value_buf.append_byte(b',');
                    }
                    self.value_buf.append_json_quoted(key.as_bytes());
                    self.value_buf.append_byte(b':');
                    self.nest_want_comma = false;
                }
            }
        }
    }

    fn enter_column(&mut self, key: &str) {
        self.key_buf.append(key.as_bytes());
        let name = self.key_buf.valid_utf8_view();
        if let Some(found) = self
            .table
            .find_or_create_column(self.row, name, &mut self.warnings)
        {
            if self.table.column_mut(found.index).len() > self.row {
                // This row already has a value for this column.
                self.warnings
                    .warn_column_name_duplicated(self.row, self.key_buf.valid_utf8_view());
            } else {
                self.column = Some(found.index);
                if found.is_new && self.key_buf.has_overflow() {
                    let truncated = self.table.column_mut(found.index).name();
                    self.warnings.warn_column_name_truncated(truncated);
                }
            }
        }
        self.key_buf.reset();
    }

    fn on_start_object(&mut self) {
        match self.state {
            State::Start => self.state = State::InRootObject,
            State::Done => {}
            State::InRootObject => self.nest_level += 1,
            State::InRecordArray => {
                if self.nest_level > 0 {
                    self.error_buf.append_byte(b'{');
                    self.nest_level += 1;
                    self.nest_want_comma = false;
                } else {
                    self.state = State::InRecord;
                }
            }
            State::InRecord => {
                if self.column.is_some() {
                    if self.nest_want_comma {
                        self.value_buf.append_byte(b',');
                    }
                    self.value_buf.append_byte(b'{');
                }
                self.nest_level += 1;
                self.nest_want_comma = false;
            }
        }
    }

    fn on_end_object(&mut self) {
        match self.state {
            State::Start | State::Done => {}
            State::InRootObject => {
                if self.nest_level == 0 {
                    // Root object closed without an array child.
                    self.state = State::Done;
                } else {
                    self.nest_level -= 1;
                }
            }
            State::InRecordArray => {
                self.error_buf.append_byte(b'}');
                self.nest_level = self.nest_level.saturating_sub(1);
                self.nest_want_comma = true;
            }
            State::InRecord => {
                if self.nest_level == 0 {
                    // End of record.
                    self.row += 1;
                    self.is_row_partially_written = false;
                    self.state = State::InRecordArray;
                } else {
                    self.nest_level -= 1;
                    if self.column.is_some() {
                        self.value_buf.append_byte(b'}');
                        self.nest_want_comma = self.nest_level > 0;
                        if self.nest_level == 0 {
                            self.finish_column_with_string();
                        }
                    }
                }
            }
        }
    }

    fn on_start_array(&mut self) {
        match self.state {
            State::Start => self.state = State::InRecordArray,
            State::Done => {}
            State::InRootObject => {
                if self.nest_level == 0 {
                    // First array child of the root object: our records.
                    self.state = State::InRecordArray;
                } else {
                    self.nest_level += 1;
                }
            }
            State::InRecordArray => {
                self.error_buf.append_byte(b'[');
                self.nest_level += 1;
                self.nest_want_comma = false;
            }
            State::InRecord => {
                if self.column.is_some() {
                    if self.nest_want_comma {
                        self.value_buf.append_byte(b',');
                    }
                    self.value_buf.append_byte(b'[');
                    self.nest_want_comma = false;
                }
                self.nest_level += 1;
            }
        }
    }

    fn on_end_array(&mut self) {
        match self.state {
            State::Start | State::Done => {}
            State::InRootObject => {
                self.nest_level = self.nest_level.saturating_sub(1);
            }
            State::InRecordArray => {
                if self.nest_level > 0 {
                    // The "record" is an array; keep serializing it, and
                    // warn once it closes.
                    self.error_buf.append_byte(b']');
                    self.nest_level -= 1;
                    self.nest_want_comma = self.nest_level > 0;
                    if self.nest_level == 0 {
                        self.flush_row_invalid();
                    }
                } else {
                    self.state = State::Done;
                }
            }
            State::InRecord => {
                self.nest_level = self.nest_level.saturating_sub(1);
                if self.column.is_some() {
                    self.value_buf.append_byte(b']');
                    self.nest_want_comma = self.nest_level > 0;
                    if self.nest_level == 0 {
                        if self.value_buf.has_overflow() {
                            self.warn_current_value_truncated();
                        }
                        self.finish_column_with_string();
                    }
                }
            }
        }
    }

    fn append_comma_and_expect_future_comma_if_serializing(&mut self, buf: Buf) {
        if self.nest_level > 0 {
            if self.nest_want_comma {
                self.buf_mut(buf).append_byte(b',');
            }
            // The caller is serializing a value; the one after it will
            // need a comma.
            self.nest_want_comma = true;
        }
    }

    fn buf_mut(&mut self, buf: Buf) -> &mut StringBuffer {
        match buf {
            Buf::Value => &mut self.value_buf,
            Buf::Error => &mut self.error_buf,
        }
    }

    fn flush_bad_root(&mut self) {
        self.warnings.warn_bad_root(self.error_buf.valid_utf8_view());
        self.error_buf.reset();
        self.state = State::Done;
    }

    fn flush_row_invalid(&mut self) {
        self.warnings
            .warn_row_invalid(self.row, self.error_buf.valid_utf8_view());
        self.error_buf.reset();
    }

    fn warn_current_value_truncated(&mut self) {
        if let Some(index) = self.column {
            self.warnings
                .warn_value_truncated(self.row, self.table.column_mut(index).name());
        }
    }

    fn finish_column_with_string(&mut self) {
        let Some(index) = self.column.take() else {
            return;
        };
        let text = self.value_buf.valid_utf8_view();
        let next_total = self.n_bytes_total + text.len() as u64;
        if next_total > self.limits.max_bytes_total {
            self.warnings.warn_stopped_out_of_memory();
            self.state = State::Done;
        } else {
            self.n_bytes_total = next_total;
            self.table.column_mut(index).write_string(self.row, text);
            self.is_row_partially_written = true;
        }
        self.value_buf.reset();
    }

    fn finish_column_with_number(&mut self) {
        let Some(index) = self.column.take() else {
            return;
        };
        // Number literals are ASCII, so the UTF-8 view is the raw bytes.
        let literal = self.value_buf.valid_utf8_view();
        let next_total = self.n_bytes_total + literal.len() as u64;
        if next_total > self.limits.max_bytes_total {
            self.warnings.warn_stopped_out_of_memory();
            self.state = State::Done;
        } else {
            self.n_bytes_total = next_total;
            self.table
                .column_mut(index)
                .write_number_literal(self.row, literal);
            self.is_row_partially_written = true;
        }
        self.value_buf.reset();
    }

    fn finish_column_with_null(&mut self) {
        let Some(index) = self.column.take() else {
            return;
        };
        // No data to write, but the cell counts as occupied so a duplicate
        // key in the same record is detectable.
        self.table.column_mut(index).grow_to_length(self.row + 1);
        self.is_row_partially_written = true;
    }
}
