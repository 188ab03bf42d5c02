//! `localca` binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use localca_cli::{Cli, normalize_args, run};

fn main() -> ExitCode {
    match dotenvy::dotenv() {
        Err(e) if !e.not_found() => {
            eprintln!("Error: failed to load .env: {e}");
            return ExitCode::FAILURE;
        }
        _ => {}
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    let mut stdout = io::stdout().lock();

    match run(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
