use std::path::PathBuf;
use std::process;

use clap::Parser;

use arrowcast_json::{JsonReadOptions, read_json_file};
use arrowcast_result::Result;
use arrowcast_table::{Limits, ipc::write_ipc_file};

/// Convert a JSON file (an array of objects, or an object containing one)
/// to an Arrow IPC file.
#[derive(Parser)]
#[command(name = "json2arrow")]
struct Cli {
    /// JSON file to read.
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
    #[arg(long, default_value_t = 1024 * 32)]
    max_bytes_per_value: usize,
    /// Truncate each error-message snippet to at most this size.
    #[arg(long, default_value_t = 100)]
    max_bytes_per_error_value: usize,
    /// Truncate each column name to at most this size.
    #[arg(long, default_value_t = 1024)]
    max_bytes_per_column_name: usize,
    /// Stop ingesting when the stored bytes surpass this total.
    #[arg(long, default_value_t = u64::MAX)]
    max_bytes_total: u64,
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
    let options = JsonReadOptions {
        limits: Limits {
            max_rows: cli.max_rows,
            max_columns: cli.max_columns,
            max_bytes_per_value: cli.max_bytes_per_value,
            max_bytes_per_error_value: cli.max_bytes_per_error_value,
            max_bytes_per_column_name: cli.max_bytes_per_column_name,
            max_bytes_total: cli.max_bytes_total,
        },
    };

    let result = read_json_file(&cli.input, &options)?;
    print!("{}", result.warnings.render(&options.limits));
    write_ipc_file(&result.batch, &cli.output)
}
