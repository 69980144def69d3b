use std::path::PathBuf;
use std::process;

use clap::Parser;

use arrowcast_csv::{CsvReadOptions, read_csv_file};
use arrowcast_result::{Error, Result};
use arrowcast_table::{Limits, ipc::write_ipc_file};

/// Convert a CSV file to an Arrow IPC file.
///
/// Recoverable data problems are printed to stdout as warnings and the
/// partial table is still written; only I/O and usage errors are fatal.
#[derive(Parser)]
#[command(name = "csv2arrow")]
struct Cli {
    /// CSV file to read.
    input: PathBuf,
    /// Arrow IPC file to write.
    output: PathBuf,
    /// Skip rows after parsing this many.
    #[arg(long, default_value_t = usize::MAX)]
    max_rows: usize,
    /// Skip columns after parsing this many.
    #[arg(long, default_value_t = usize::MAX)]
    max_columns: usize,
    /// Truncate each value to at most this size.
    #[arg(long, default_value_t = u32::MAX as usize)]
    max_bytes_per_value: usize,
    /// Stop ingesting when the stored bytes surpass this total.
    #[arg(long, default_value_t = u64::MAX)]
    max_bytes_total: u64,
    /// Byte separating values on a record.
    #[arg(long, default_value = ",")]
    delimiter: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let delimiter = parse_delimiter(&cli.delimiter)?;
    let options = CsvReadOptions {
        delimiter,
        limits: Limits {
            max_rows: cli.max_rows,
            max_columns: cli.max_columns,
            max_bytes_per_value: cli.max_bytes_per_value,
            max_bytes_total: cli.max_bytes_total,
            ..Limits::default()
        },
    };

    let result = read_csv_file(&cli.input, &options)?;
    print!("{}", result.warnings.render(&options.limits));
    write_ipc_file(&result.batch, &cli.output)
}

fn parse_delimiter(s: &str) -> Result<u8> {
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(Error::InvalidArgumentError(
            "--delimiter must be exactly 1 byte".into(),
        )),
    }
}
