//! Per-column accumulator that infers a single output type from
//! mixed-type input.
//!
//! The rules of accumulation:
//!
//! * A column is born untyped; the first typed datum decides its type. A
//!   number literal with a decimal point or exponent is float64, otherwise
//!   int64.
//! * An int64 column that meets a float converts its history to float64,
//!   warning about every int whose round-trip through f64 is not identity.
//! * Every non-null write also lands in a text shadow. A string arriving at
//!   a typed column swaps the whole column to the shadow, losslessly.
//!
//! Full type transition diagram:
//!
//! ```text
//!                / INT -------+
//!               /    |         \
//!              /     v          \
//!     UNTYPED +--- FLOAT ----+   \
//!             |\              \   \
//!             | \ TIMESTAMP -+ \   \
//!              \              \ \   \
//!               \              v v   v
//!                +------------- STRING
//! ```
//!
//! `STRING` is the sink: once reached, a column never leaves it. Null never
//! moves the state. Timestamps mix with nothing; any number or string
//! demotes a timestamp column to `STRING`, and vice versa.

use std::sync::Arc;

use arrow::array::{
    ArrayBuilder, ArrayRef, Float64Builder, Int64Builder, StringBuilder,
    TimestampNanosecondBuilder,
};

use crate::warnings::Warnings;

/// Column inference state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Untyped,
    Int,
    Float,
    Timestamp,
    String,
}

/// `true` iff `name` cannot be used as a column name: empty, or any byte
/// below 0x20.
pub fn is_column_name_invalid(name: &str) -> bool {
    name.is_empty() || name.bytes().any(|b| b < 0x20)
}

/// Accumulates values for one column.
///
/// The text shadow (`text`) receives the literal bytes of every non-null
/// write, whatever the state; exactly one typed primary is live at a time.
/// Rows arrive in non-decreasing order per column and gaps are null-padded
/// on write.
pub struct ColumnBuilder {
    name: String,
    text: StringBuilder,
    ints: Option<Int64Builder>,
    floats: Option<Float64Builder>,
    timestamps: Option<TimestampNanosecondBuilder>,
    dtype: Dtype,

    n_numbers: u32,
    first_number_row: usize,
    n_timestamps: u32,
    first_timestamp_row: usize,
    n_lossy_numbers: u32,
    first_lossy_number_row: usize,
    n_overflow_numbers: u32,
    first_overflow_number_row: usize,
    n_overflow_timestamps: u32,
    first_overflow_timestamp_row: usize,
}

impl ColumnBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text: StringBuilder::new(),
            ints: None,
            floats: None,
            timestamps: None,
            dtype: Dtype::Untyped,
            n_numbers: 0,
            first_number_row: 0,
            n_timestamps: 0,
            first_timestamp_row: 0,
            n_lossy_numbers: 0,
            first_lossy_number_row: 0,
            n_overflow_numbers: 0,
            first_overflow_number_row: 0,
            n_overflow_timestamps: 0,
            first_overflow_timestamp_row: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Logical length: the text shadow holds every row written so far.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_string(&mut self, row: usize, value: &str) {
        self.store_text(row, value);
        match self.dtype {
            Dtype::Untyped => self.dtype = Dtype::String,
            Dtype::String => {}
            Dtype::Int => {
                self.ints = None;
                self.dtype = Dtype::String;
            }
            Dtype::Float => {
                self.floats = None;
                self.dtype = Dtype::String;
            }
            Dtype::Timestamp => {
                self.timestamps = None;
                self.dtype = Dtype::String;
            }
        }
    }

    /// Write a JSON-format number literal; the column decides int vs float.
    pub fn write_number_literal(&mut self, row: usize, literal: &str) {
        self.store_text(row, literal);
        self.note_number(row);

        if literal_fits_i64(literal) {
            match literal.parse::<i64>() {
                Ok(value) => self.write_int(row, value),
                Err(_) => self.write_overflow_number(row),
            }
        } else {
            match literal.parse::<f64>() {
                Ok(value) if value.is_finite() => self.write_float(row, value),
                _ => self.write_overflow_number(row),
            }
        }
    }

    /// Write a number a front-end already parsed (e.g. an Excel cell,
    /// which is always a double). `literal` is its display string.
    pub fn write_parsed_number(&mut self, row: usize, value: f64, literal: &str) {
        self.store_text(row, literal);
        self.note_number(row);
        if value.is_finite() {
            self.write_float(row, value);
        } else {
            self.write_overflow_number(row);
        }
    }

    /// Write a timestamp as nanoseconds since the Unix epoch. When the
    /// front-end's conversion overflowed `is_overflow` is set and the cell
    /// becomes null.
    pub fn write_parsed_timestamp(
        &mut self,
        row: usize,
        ns_since_epoch: i64,
        is_overflow: bool,
        literal: &str,
    ) {
        self.store_text(row, literal);
        self.note_timestamp(row);
        if is_overflow {
            if self.n_overflow_timestamps == 0 {
                self.first_overflow_timestamp_row = row;
            }
            self.n_overflow_timestamps = self.n_overflow_timestamps.saturating_add(1);
            self.write_timestamp(row, None);
        } else {
            self.write_timestamp(row, Some(ns_since_epoch));
        }
    }

    /// Null-pad the text shadow and the live typed primary to `n_rows`.
    pub fn grow_to_length(&mut self, n_rows: usize) {
        while self.text.len() < n_rows {
            self.text.append_null();
        }
        match self.dtype {
            Dtype::Int => {
                if let Some(ints) = &mut self.ints
                    && ints.len() < n_rows
                {
                    ints.append_nulls(n_rows - ints.len());
                }
            }
            Dtype::Float => {
                if let Some(floats) = &mut self.floats
                    && floats.len() < n_rows
                {
                    floats.append_nulls(n_rows - floats.len());
                }
            }
            Dtype::Timestamp => {
                if let Some(timestamps) = &mut self.timestamps
                    && timestamps.len() < n_rows
                {
                    timestamps.append_nulls(n_rows - timestamps.len());
                }
            }
            Dtype::Untyped | Dtype::String => {}
        }
    }

    /// Materialize the terminal array and reset to `UNTYPED`.
    ///
    /// `STRING` and `UNTYPED` emit the text shadow; typed states emit the
    /// typed primary and drop the shadow.
    pub fn finish(&mut self, n_rows: usize) -> ArrayRef {
        self.grow_to_length(n_rows);

        let array: ArrayRef = match self.dtype {
            Dtype::Untyped | Dtype::String => Arc::new(self.text.finish()),
            Dtype::Int => {
                let _ = self.text.finish();
                Arc::new(self.ints.take().unwrap_or_default().finish())
            }
            Dtype::Float => {
                let _ = self.text.finish();
                Arc::new(self.floats.take().unwrap_or_default().finish())
            }
            Dtype::Timestamp => {
                let _ = self.text.finish();
                Arc::new(self.timestamps.take().unwrap_or_default().finish())
            }
        };

        self.dtype = Dtype::Untyped;
        self.n_numbers = 0;
        self.n_timestamps = 0;
        self.n_lossy_numbers = 0;
        self.n_overflow_numbers = 0;
        self.n_overflow_timestamps = 0;
        array
    }

    /// Emit the warnings the terminal state implies: demotions to text for
    /// a `STRING` column that saw numbers or timestamps, and the lossy /
    /// overflow tallies for columns that stayed typed.
    pub fn warn_on_finish(&self, warnings: &mut Warnings) {
        match self.dtype {
            Dtype::String => {
                if self.n_numbers > 0 {
                    warnings.warn_values_number_to_text(
                        self.n_numbers,
                        self.first_number_row,
                        &self.name,
                    );
                }
                if self.n_timestamps > 0 {
                    warnings.warn_values_timestamp_to_text(
                        self.n_timestamps,
                        self.first_timestamp_row,
                        &self.name,
                    );
                }
            }
            Dtype::Float => {
                if self.n_lossy_numbers > 0 {
                    warnings.warn_values_lossy_int_to_float(
                        self.n_lossy_numbers,
                        self.first_lossy_number_row,
                        &self.name,
                    );
                }
                if self.n_overflow_numbers > 0 {
                    warnings.warn_values_overflow_float(
                        self.n_overflow_numbers,
                        self.first_overflow_number_row,
                        &self.name,
                    );
                }
            }
            Dtype::Timestamp => {
                if self.n_overflow_timestamps > 0 {
                    warnings.warn_values_overflow_timestamp(
                        self.n_overflow_timestamps,
                        self.first_overflow_timestamp_row,
                        &self.name,
                    );
                }
            }
            Dtype::Untyped | Dtype::Int => {}
        }
    }

    fn store_text(&mut self, row: usize, value: &str) {
        debug_assert!(
            self.text.len() <= row,
            "rows must be written in non-decreasing order"
        );
        while self.text.len() < row {
            self.text.append_null();
        }
        self.text.append_value(value);
    }

    fn note_number(&mut self, row: usize) {
        if self.n_numbers == 0 {
            self.first_number_row = row;
        }
        self.n_numbers = self.n_numbers.saturating_add(1);
    }

    fn note_timestamp(&mut self, row: usize) {
        if self.n_timestamps == 0 {
            self.first_timestamp_row = row;
        }
        self.n_timestamps = self.n_timestamps.saturating_add(1);
    }

    fn write_int(&mut self, row: usize, value: i64) {
        match self.dtype {
            Dtype::Untyped => {
                let mut ints = Int64Builder::new();
                if row > 0 {
                    ints.append_nulls(row);
                }
                ints.append_value(value);
                self.ints = Some(ints);
                self.dtype = Dtype::Int;
            }
            Dtype::Int => {
                if let Some(ints) = &mut self.ints {
                    if ints.len() < row {
                        ints.append_nulls(row - ints.len());
                    }
                    ints.append_value(value);
                }
            }
            Dtype::Float => {
                let converted = self.convert_int_and_note_lossy(row, value);
                self.append_float(row, Some(converted));
            }
            Dtype::Timestamp => {
                // A number arriving at a timestamp column demotes to text;
                // the shadow already holds the literal.
                self.timestamps = None;
                self.dtype = Dtype::String;
            }
            Dtype::String => {}
        }
    }

    fn write_float(&mut self, row: usize, value: f64) {
        match self.dtype {
            Dtype::Untyped => {
                self.floats = Some(Float64Builder::new());
                self.dtype = Dtype::Float;
                self.append_float(row, Some(value));
            }
            Dtype::Float => self.append_float(row, Some(value)),
            Dtype::Int => {
                self.convert_ints_to_floats();
                self.append_float(row, Some(value));
            }
            Dtype::Timestamp => {
                self.timestamps = None;
                self.dtype = Dtype::String;
            }
            Dtype::String => {}
        }
    }

    /// A non-finite number: the column becomes (or stays) float and the
    /// cell is null.
    fn write_overflow_number(&mut self, row: usize) {
        if self.n_overflow_numbers == 0 {
            self.first_overflow_number_row = row;
        }
        self.n_overflow_numbers = self.n_overflow_numbers.saturating_add(1);

        match self.dtype {
            Dtype::Untyped => {
                self.floats = Some(Float64Builder::new());
                self.dtype = Dtype::Float;
                self.append_float(row, None);
            }
            Dtype::Int => {
                self.convert_ints_to_floats();
                self.append_float(row, None);
            }
            Dtype::Float => self.append_float(row, None),
            Dtype::Timestamp => {
                self.timestamps = None;
                self.dtype = Dtype::String;
            }
            Dtype::String => {}
        }
    }

    fn write_timestamp(&mut self, row: usize, value: Option<i64>) {
        match self.dtype {
            Dtype::Untyped => {
                let mut timestamps = TimestampNanosecondBuilder::new();
                if row > 0 {
                    timestamps.append_nulls(row);
                }
                timestamps.append_option(value);
                self.timestamps = Some(timestamps);
                self.dtype = Dtype::Timestamp;
            }
            Dtype::Timestamp => {
                if let Some(timestamps) = &mut self.timestamps {
                    if timestamps.len() < row {
                        timestamps.append_nulls(row - timestamps.len());
                    }
                    timestamps.append_option(value);
                }
            }
            Dtype::Int => {
                self.ints = None;
                self.dtype = Dtype::String;
            }
            Dtype::Float => {
                self.floats = None;
                self.dtype = Dtype::String;
            }
            Dtype::String => {}
        }
    }

    fn append_float(&mut self, row: usize, value: Option<f64>) {
        if let Some(floats) = &mut self.floats {
            if floats.len() < row {
                floats.append_nulls(row - floats.len());
            }
            floats.append_option(value);
        }
    }

    fn convert_int_and_note_lossy(&mut self, row: usize, value: i64) -> f64 {
        let converted = value as f64;
        if is_lossy_int(value) {
            if self.n_lossy_numbers == 0 {
                self.first_lossy_number_row = row;
            }
            self.n_lossy_numbers = self.n_lossy_numbers.saturating_add(1);
        }
        converted
    }

    /// Replay the int history into a float builder, tallying every value
    /// whose round-trip differs.
    fn convert_ints_to_floats(&mut self) {
        let ints = self.ints.take().unwrap_or_default().finish();
        let mut floats = Float64Builder::with_capacity(ints.len());
        for (i, value) in ints.iter().enumerate() {
            match value {
                None => floats.append_null(),
                Some(value) => floats.append_value(self.convert_int_and_note_lossy(i, value)),
            }
        }
        self.floats = Some(floats);
        self.dtype = Dtype::Float;
    }
}

/// `true` iff the i64 does not survive a round-trip through f64.
///
/// `i64::MAX` needs special casing: it rounds up to 2^63, which the
/// saturating cast folds back onto `i64::MAX`.
fn is_lossy_int(value: i64) -> bool {
    ((value as f64) as i64) != value || value == i64::MAX
}

/// `true` iff a JSON number literal is an in-range int64.
///
/// JSON's number grammar has no leading `+`, zeros, or whitespace, so the
/// magnitude check is a length-then-lexicographic compare against the
/// fixed i64 extremes. Anything with a decimal point or exponent is float.
fn literal_fits_i64(literal: &str) -> bool {
    const MIN: &str = "-9223372036854775808";
    const MAX: &str = "9223372036854775807";

    if literal.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        return false;
    }
    if literal.starts_with('-') {
        literal.len() < MIN.len() || (literal.len() == MIN.len() && literal <= MIN)
    } else {
        literal.len() < MAX.len() || (literal.len() == MAX.len() && literal <= MAX)
    }
}

/// Text-only companion builder for spreadsheet header rows.
pub struct StringColumnBuilder {
    builder: StringBuilder,
}

impl Default for StringColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StringColumnBuilder {
    pub fn new() -> Self {
        Self {
            builder: StringBuilder::new(),
        }
    }

    pub fn write_value(&mut self, row: usize, value: &str) {
        while self.builder.len() < row {
            self.builder.append_null();
        }
        self.builder.append_value(value);
    }

    pub fn grow_to_length(&mut self, n_rows: usize) {
        while self.builder.len() < n_rows {
            self.builder.append_null();
        }
    }

    pub fn finish(&mut self) -> ArrayRef {
        Arc::new(self.builder.finish())
    }
}
