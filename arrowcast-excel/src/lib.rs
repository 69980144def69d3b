//! XLS and XLSX front-ends.
//!
//! Both drivers walk the first worksheet's cells in row-major order,
//! classify each cell (blank, number, date, text-like), and feed the sheet
//! table builder. Dates convert to nanoseconds since the Unix epoch with
//! base-date (1900/1904) awareness; out-of-range dates become null with a
//! warning. A corrupt workbook is a warning, not an error: whatever parsed
//! cleanly is still emitted.

#![forbid(unsafe_code)]

pub mod cli;
pub mod display;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use calamine::{Data, Range, Reader, Xls, Xlsx};
use tracing::debug;

use arrowcast_result::Result;
use arrowcast_table::{
    Limits, NextAction, SheetTableBuilder, StringBuffer, Warnings, column_reference,
    limits::{EXCEL_MAX_BYTES_PER_VALUE, EXCEL_MAX_COLUMNS, EXCEL_MAX_ROWS},
};

/// Which rows of the sheet are column headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderRows {
    #[default]
    None,
    /// Row 0 is a header row; data starts at row 1.
    FirstRow,
}

/// Parse the `--header-rows` flag: `""` means none, `"0-1"` means the
/// first row.
pub fn parse_header_rows(s: &str) -> Result<HeaderRows> {
    match s {
        "" => Ok(HeaderRows::None),
        "0-1" => Ok(HeaderRows::FirstRow),
        other => Err(arrowcast_result::Error::InvalidArgumentError(format!(
            "unsupported --header-rows range '{other}' (expected '' or '0-1')"
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct ExcelReadOptions {
    pub limits: Limits,
    pub header_rows: HeaderRows,
}

impl Default for ExcelReadOptions {
    fn default() -> Self {
        Self {
            limits: Limits {
                max_rows: EXCEL_MAX_ROWS,
                max_columns: EXCEL_MAX_COLUMNS,
                max_bytes_per_value: EXCEL_MAX_BYTES_PER_VALUE,
                ..Limits::default()
            },
            header_rows: HeaderRows::None,
        }
    }
}

pub struct ExcelReadResult {
    pub warnings: Warnings,
    pub batch: RecordBatch,
    /// One text row per column when a header row was configured, else
    /// zero rows. Shares column names with `batch`.
    pub header_batch: RecordBatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Xls,
    Xlsx,
}

pub fn read_xls_file(path: &Path, options: &ExcelReadOptions) -> Result<ExcelReadResult> {
    let file = BufReader::new(File::open(path)?);
    let mut ingestor = SheetIngestor::new(options);
    match Xls::new(file) {
        Ok(mut workbook) => ingestor.ingest_workbook(&mut workbook, SheetKind::Xls),
        Err(err) => ingestor.warn_file_error(SheetKind::Xls, &err.to_string()),
    }
    ingestor.finish()
}

pub fn read_xlsx_file(path: &Path, options: &ExcelReadOptions) -> Result<ExcelReadResult> {
    let file = BufReader::new(File::open(path)?);
    let mut ingestor = SheetIngestor::new(options);
    match Xlsx::new(file) {
        Ok(mut workbook) => ingestor.ingest_workbook(&mut workbook, SheetKind::Xlsx),
        Err(err) => ingestor.warn_file_error(SheetKind::Xlsx, &err.to_string()),
    }
    ingestor.finish()
}

/// Ingest an already-loaded cell range. Exposed for callers that obtain
/// ranges some other way; the file-based readers funnel through here.
pub fn read_range(range: &Range<Data>, options: &ExcelReadOptions) -> Result<ExcelReadResult> {
    let mut ingestor = SheetIngestor::new(options);
    ingestor.ingest_range(range);
    ingestor.finish()
}

struct SheetIngestor {
    sheet: SheetTableBuilder,
    warnings: Warnings,
    limits: Limits,
    has_header_row: bool,
    n_bytes_total: u64,
    truncator: StringBuffer,
}

impl SheetIngestor {
    fn new(options: &ExcelReadOptions) -> Self {
        let has_header_row = options.header_rows == HeaderRows::FirstRow;
        Self {
            sheet: SheetTableBuilder::new(options.limits.max_columns, has_header_row),
            warnings: Warnings::default(),
            limits: options.limits.clone(),
            has_header_row,
            n_bytes_total: 0,
            truncator: StringBuffer::new(options.limits.max_bytes_per_value),
        }
    }

    fn warn_file_error(&mut self, kind: SheetKind, message: &str) {
        match kind {
            SheetKind::Xls => self.warnings.warn_xls_parse_error(message),
            SheetKind::Xlsx => self.warnings.warn_xlsx_parse_error(message),
        }
    }

    fn ingest_workbook<RS, R>(&mut self, workbook: &mut R, kind: SheetKind)
    where
        RS: Read + Seek,
        R: Reader<RS>,
        R::Error: std::fmt::Display,
    {
        let sheet_names = workbook.sheet_names();
        let Some(first) = sheet_names.first() else {
            self.warn_file_error(kind, "there are no worksheets");
            return;
        };
        match workbook.worksheet_range(first) {
            Ok(range) => self.ingest_range(&range),
            Err(err) => self.warn_file_error(kind, &err.to_string()),
        }
    }

    fn ingest_range(&mut self, range: &Range<Data>) {
        let Some((start_row, start_col)) = range.start() else {
            return;
        };
        for (r, c, cell) in range.cells() {
            let row = start_row as usize + r;
            let col = start_col as usize + c;
            if self.add_cell(row, col, cell) == NextAction::Stop {
                return;
            }
        }
    }

    fn add_cell(&mut self, row: usize, col: usize, cell: &Data) -> NextAction {
        // Creating the column up front also applies the column budget.
        if self.sheet.column(col, &mut self.warnings).is_none() {
            return NextAction::Continue;
        }

        let mut display = display::cell_display(cell);
        if display.len() > self.limits.max_bytes_per_value {
            self.truncator.append(display.as_bytes());
            display = self.truncator.valid_utf8_view().to_string();
            self.truncator.reset();
            self.warnings
                .warn_value_truncated(row, &column_reference(col));
        }

        let mut row = row;
        if self.has_header_row {
            if row == 0 {
                if !matches!(cell, Data::Empty)
                    && let Some(column) = self.sheet.column(col, &mut self.warnings)
                {
                    column.header.write_value(0, &display);
                }
                return NextAction::Continue;
            }
            // Second sheet row is the first row of the output table.
            row -= 1;
        }

        self.sheet.max_row_seen = Some(self.sheet.max_row_seen.map_or(row, |seen| seen.max(row)));

        if row >= self.limits.max_rows {
            // Ignore the cell but keep reading, so the skipped-row count
            // comes out right.
            return NextAction::Continue;
        }

        let next_total = self.n_bytes_total + display.len() as u64;
        if next_total > self.limits.max_bytes_total {
            self.warnings.warn_stopped_out_of_memory();
            return NextAction::Stop;
        }

        let Some(column) = self.sheet.column(col, &mut self.warnings) else {
            return NextAction::Continue;
        };
        match cell {
            // An empty cell is null; storing nothing means null.
            Data::Empty => {}
            Data::Float(v) => column.data.write_parsed_number(row, *v, &display),
            Data::Int(v) => column.data.write_parsed_number(row, *v as f64, &display),
            Data::DateTime(dt) => {
                let (ns, is_overflow) = display::datetime_to_ns(dt);
                column
                    .data
                    .write_parsed_timestamp(row, ns, is_overflow, &display);
            }
            Data::String(_)
            | Data::DateTimeIso(_)
            | Data::DurationIso(_)
            | Data::Bool(_)
            | Data::Error(_) => column.data.write_string(row, &display),
        }

        self.n_bytes_total = next_total;
        self.sheet.max_row_handled = Some(row);
        NextAction::Continue
    }

    fn finish(mut self) -> Result<ExcelReadResult> {
        let n_rows_seen = self.sheet.max_row_seen.map_or(0, |r| r + 1);
        if n_rows_seen > self.limits.max_rows {
            self.warnings
                .warn_rows_skipped(n_rows_seen - self.limits.max_rows);
        }
        let (batch, header_batch) = self.sheet.finish(&mut self.warnings)?;
        debug!(
            rows = batch.num_rows(),
            columns = batch.num_columns(),
            "sheet ingest complete"
        );
        Ok(ExcelReadResult {
            warnings: self.warnings,
            batch,
            header_batch,
        })
    }
}
