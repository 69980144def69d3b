use std::process;

use arrowcast_excel::{SheetKind, cli};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = cli::run(SheetKind::Xlsx) {
        eprintln!("{err}");
        process::exit(1);
    }
}
