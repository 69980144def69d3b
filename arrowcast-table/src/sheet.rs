//! Index-addressed table assembly for spreadsheet drivers.
//!
//! Spreadsheets address cells by grid position, so columns are created on
//! first touch and named by their Excel-style reference. Each data column
//! carries a text-only companion that accumulates the header row when the
//! driver is configured with one.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use arrowcast_result::Result;

use crate::column::{ColumnBuilder, Dtype, StringColumnBuilder};
use crate::warnings::Warnings;

/// What a driver should do after feeding one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Continue,
    /// Ignore the rest of the file.
    Stop,
}

/// Base-26 Excel column reference: `A`..`Z`, `AA`..`ZZ`, `AAA`..
pub fn column_reference(index: usize) -> String {
    let mut n = index as i64;
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (n % 26) as u8);
        n = n / 26 - 1;
        if n < 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// One spreadsheet column: inferred data plus its header cell(s).
pub struct SheetColumn {
    pub data: ColumnBuilder,
    pub header: StringColumnBuilder,
}

/// Owns spreadsheet columns by grid index.
pub struct SheetTableBuilder {
    columns: Vec<SheetColumn>,
    max_columns: usize,
    has_header_row: bool,
    /// Highest row index any cell addressed, header shift applied
    /// (the cell may have been ignored).
    pub max_row_seen: Option<usize>,
    /// Highest row index stored in the output table.
    pub max_row_handled: Option<usize>,
}

impl SheetTableBuilder {
    pub fn new(max_columns: usize, has_header_row: bool) -> Self {
        Self {
            columns: Vec::new(),
            max_columns,
            has_header_row,
            max_row_seen: None,
            max_row_handled: None,
        }
    }

    pub fn has_header_row(&self) -> bool {
        self.has_header_row
    }

    /// Fetch column `index`, creating it and any gap columns before it.
    /// `None` means the column is over budget and its cells are discarded.
    pub fn column(&mut self, index: usize, warnings: &mut Warnings) -> Option<&mut SheetColumn> {
        if index >= self.max_columns {
            warnings.warn_column_skipped(&column_reference(index));
            return None;
        }
        while self.columns.len() <= index {
            let name = column_reference(self.columns.len());
            self.columns.push(SheetColumn {
                data: ColumnBuilder::new(&name),
                header: StringColumnBuilder::new(),
            });
        }
        Some(&mut self.columns[index])
    }

    /// Destructively build `(data_table, header_table)`.
    ///
    /// Both tables share column names. The header table is empty unless a
    /// header row was configured.
    pub fn finish(&mut self, warnings: &mut Warnings) -> Result<(RecordBatch, RecordBatch)> {
        let n_rows = self.max_row_handled.map_or(0, |r| r + 1);
        let n_header_rows = usize::from(self.has_header_row);

        let mut fields = Vec::with_capacity(self.columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());
        let mut header_fields = Vec::with_capacity(self.columns.len());
        let mut header_arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len());

        for column in &mut self.columns {
            let data = &mut column.data;
            data.grow_to_length(n_rows);
            data.warn_on_finish(warnings);
            if data.dtype() == Dtype::Untyped {
                warnings.warn_column_null(data.name());
            }
            let name = data.name().to_string();
            let array = data.finish(n_rows);
            fields.push(Field::new(name.as_str(), array.data_type().clone(), true));
            arrays.push(array);

            column.header.grow_to_length(n_header_rows);
            header_fields.push(Field::new(name.as_str(), DataType::Utf8, true));
            header_arrays.push(column.header.finish());
        }

        self.columns.clear();
        self.max_row_seen = None;
        self.max_row_handled = None;

        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(n_rows)),
        )?;
        let header_batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(header_fields)),
            header_arrays,
            &RecordBatchOptions::new().with_row_count(Some(n_header_rows)),
        )?;
        Ok((batch, header_batch))
    }
}
