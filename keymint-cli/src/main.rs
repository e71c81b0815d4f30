//! keymint license issuance tool
//!
//! Runs on the vendor's machine to:
//! 1. Generate the vendor keypair and print the public key for embedding
//! 2. Issue device-bound or transferable licenses
//! 3. Check an artifact the way the application will
//!
//! Usage:
//!   keymint generate-keys
//!   keymint generate --email user@example.com --days 365 --max-exports 20
//!   keymint verify licenses/license_usr_0123456789abcdef_20261016.json

use std::io;
use std::process::ExitCode;

use clap::Parser;
use keymint_cli::{Cli, run};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    match run(&cli, io::stdin().lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
