//! Operator tooling for keymint licenses.
//!
//! The `keymint` binary is a thin wrapper around [`run`], which takes its
//! input and output streams as arguments so every command can be driven
//! from tests.

mod commands;
mod console;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use console::Console;

/// Environment variable for the key directory.
pub const KEYS_DIR_ENV: &str = "KEYMINT_KEYS_DIR";
/// Environment variable for the artifact output directory.
pub const OUT_DIR_ENV: &str = "KEYMINT_OUT_DIR";

#[derive(Parser, Debug)]
#[command(name = "keymint")]
#[command(about = "Issue and check offline keymint licenses")]
#[command(version)]
pub struct Cli {
    /// Directory holding the vendor keypair
    #[arg(long, global = true, env = KEYS_DIR_ENV, default_value = "keys")]
    pub keys_dir: PathBuf,

    /// Directory issued licenses are written to
    #[arg(long, global = true, env = OUT_DIR_ENV, default_value = "licenses")]
    pub out_dir: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the vendor keypair and print the public key for embedding
    GenerateKeys,

    /// Issue a transferable license from arguments
    Generate(GenerateArgs),

    /// Issue a device-bound license interactively
    Device,

    /// Issue a transferable (mobile) license interactively
    Mobile,

    /// Validate a license artifact
    Verify(VerifyArgs),

    /// Print this machine's device fingerprint and host details
    Fingerprint,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Licensee email
    #[arg(long)]
    pub email: String,

    /// Licensee company
    #[arg(long)]
    pub company: Option<String>,

    /// Days until the license expires (omit for a perpetual license)
    #[arg(long)]
    pub days: Option<i64>,

    /// Daily export quota, -1 for unlimited
    #[arg(long, allow_negative_numbers = true)]
    pub max_exports: Option<i64>,

    /// User id to embed (generated when omitted)
    #[arg(long)]
    pub user_id: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// License artifact to check
    pub file: PathBuf,

    /// Public key JSON to verify against (defaults to the embedded key)
    #[arg(long)]
    pub public_key: Option<PathBuf>,

    /// Device fingerprint to check against (defaults to this machine)
    #[arg(long)]
    pub fingerprint: Option<String>,
}

/// Runs one command, prompting on `input` and reporting on `output`.
///
/// # Errors
///
/// Returns an error if the command fails, including when `verify` finds a
/// license that is not active.
pub fn run<R: BufRead, W: Write>(cli: &Cli, input: R, output: W) -> Result<()> {
    let mut console = Console::new(input, output);
    match &cli.command {
        Command::GenerateKeys => commands::generate_keys(cli, &mut console),
        Command::Generate(args) => commands::generate(cli, args, &mut console),
        Command::Device => commands::interactive(cli, true, &mut console),
        Command::Mobile => commands::interactive(cli, false, &mut console),
        Command::Verify(args) => commands::verify(args, &mut console),
        Command::Fingerprint => commands::fingerprint(&mut console),
    }
}
