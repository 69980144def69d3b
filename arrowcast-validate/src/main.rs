use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};

use arrowcast_validate::{Checks, validate_file};

/// Check an Arrow IPC file for integrity problems.
///
/// Exits 0 when every enabled check passes; prints the first failure to
/// stdout and exits 1 otherwise.
#[derive(Parser)]
#[command(name = "arrowcheck")]
struct Cli {
    /// Arrow IPC file to scan.
    input: PathBuf,
    /// Ensure offsets stay within data buffers, utf8 payloads are valid,
    /// and the rest of Arrow's built-in structural checks hold.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    check_safe: bool,
    /// Ensure float32 and float64 values are finite (no NaN or Infinity).
    #[arg(long)]
    check_floats_all_finite: bool,
    /// Ensure there are no spurious dictionary values.
    #[arg(long)]
    check_dictionary_values_all_used: bool,
    /// Ensure there are no null dictionary values.
    #[arg(long)]
    check_dictionary_values_not_null: bool,
    /// Ensure there are no duplicate dictionary values.
    #[arg(long)]
    check_dictionary_values_unique: bool,
    /// Ensure no column name includes ASCII control characters.
    #[arg(long)]
    check_column_name_control_characters: bool,
    /// Enforce a maximum column-name length in bytes; 0 disables.
    #[arg(long, default_value_t = 0)]
    check_column_name_max_bytes: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let checks = Checks {
        safe: cli.check_safe,
        floats_all_finite: cli.check_floats_all_finite,
        dictionary_values_all_used: cli.check_dictionary_values_all_used,
        dictionary_values_not_null: cli.check_dictionary_values_not_null,
        dictionary_values_unique: cli.check_dictionary_values_unique,
        column_name_control_characters: cli.check_column_name_control_characters,
        column_name_max_bytes: cli.check_column_name_max_bytes,
    };

    match validate_file(&cli.input, &checks) {
        Ok(None) => {}
        Ok(Some(failure)) => {
            println!("{failure}");
            process::exit(1);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
