//! Shared command-line front for `xls2arrow` and `xlsx2arrow`.

use std::path::{Path, PathBuf};

use clap::Parser;

use arrowcast_result::Result;
use arrowcast_table::{
    Limits, ipc::write_ipc_file,
    limits::{EXCEL_MAX_BYTES_PER_VALUE, EXCEL_MAX_COLUMNS, EXCEL_MAX_ROWS},
};

use crate::{ExcelReadOptions, SheetKind, parse_header_rows, read_xls_file, read_xlsx_file};

/// Convert a spreadsheet's first worksheet to an Arrow IPC file.
#[derive(Parser)]
pub struct ExcelCli {
    /// Spreadsheet file to read.
    input: PathBuf,
    /// Arrow IPC file to write.
    output: PathBuf,
    /// Skip rows after parsing this many.
    #[arg(long, default_value_t = EXCEL_MAX_ROWS)]
    max_rows: usize,
    /// Skip columns after parsing this many.
    #[arg(long, default_value_t = EXCEL_MAX_COLUMNS)]
    max_columns: usize,
    /// Truncate each value to at most this size.
    #[arg(long, default_value_t = EXCEL_MAX_BYTES_PER_VALUE)]
    max_bytes_per_value: usize,
    /// Stop ingesting when the stored bytes surpass this total.
    #[arg(long, default_value_t = u64::MAX)]
    max_bytes_total: u64,
    /// Rows to treat as column headers instead of values: '' for none,
    /// '0-1' for the first row.
    #[arg(long, default_value = "")]
    header_rows: String,
    /// Where to write the header-row table, when there is one.
    #[arg(long, default_value = "")]
    header_rows_file: String,
}

pub fn run(kind: SheetKind) -> Result<()> {
    let cli = ExcelCli::parse();
    let options = ExcelReadOptions {
        limits: Limits {
            max_rows: cli.max_rows,
            max_columns: cli.max_columns,
            max_bytes_per_value: cli.max_bytes_per_value,
            max_bytes_total: cli.max_bytes_total,
            ..Limits::default()
        },
        header_rows: parse_header_rows(&cli.header_rows)?,
    };

    let result = match kind {
        SheetKind::Xls => read_xls_file(&cli.input, &options)?,
        SheetKind::Xlsx => read_xlsx_file(&cli.input, &options)?,
    };

    print!("{}", result.warnings.render(&options.limits));
    write_ipc_file(&result.batch, &cli.output)?;
    if !cli.header_rows_file.is_empty() {
        write_ipc_file(&result.header_batch, Path::new(&cli.header_rows_file))?;
    }
    Ok(())
}
