//! fshash CLI — hash file sets and maintain change-detection sidecars.
//!
//! Provides `fshash hash` for one-off bulk hashing of a file list and
//! `fshash check` for validating (and optionally rewriting) a sidecar cache.

#![warn(missing_docs)]

mod check;
pub mod config;
mod hash;
mod init;
mod show;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// fshash — deterministic content hashing and change detection for file trees.
#[derive(Parser, Debug)]
#[command(name = "fshash", version, about = "Content-addressed change detection")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to an `fshash.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hash a list of files and print digests.
    Hash(HashArgs),
    /// Validate a sidecar cache against a file list.
    Check(CheckArgs),
    /// Print a summary of a sidecar cache.
    Show(ShowArgs),
    /// Write a starter `fshash.toml` configuration.
    Init(InitArgs),
}

/// Arguments for the `fshash hash` subcommand.
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Files to hash, in order. Order changes the aggregate digest.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Output layout.
    #[arg(short, long, value_enum, default_value_t = Mode::Digest)]
    pub mode: Mode,

    /// Worker thread count; 0 selects the hardware default.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Low 32 bits of the aggregate seed.
    #[arg(long)]
    pub seed_low: Option<u32>,

    /// High 32 bits of the aggregate seed.
    #[arg(long)]
    pub seed_high: Option<u32>,
}

/// Arguments for the `fshash check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Sidecar cache file.
    #[arg(short, long)]
    pub sidecar: String,

    /// Files to validate, in order. Omit to revalidate the sidecar's
    /// stored file list.
    pub files: Vec<String>,

    /// Persist the validation result back to the sidecar.
    #[arg(short, long)]
    pub write: bool,

    /// Gzip level for the sidecar's compressed payload section (1-9).
    #[arg(long, default_value_t = 1)]
    pub gzip_level: u32,
}

/// Arguments for the `fshash show` subcommand.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Sidecar cache file.
    #[arg(short, long)]
    pub sidecar: String,
}

/// Arguments for the `fshash init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Caller version to record in the configuration.
    #[arg(long, default_value_t = 1)]
    pub version: u32,

    /// Fingerprint key to record in the configuration.
    #[arg(long)]
    pub fingerprint: Option<String>,
}

/// Output layout for `fshash hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// The aggregate digest only.
    Digest,
    /// One digest per file.
    Files,
    /// Aggregate digest followed by per-file digests.
    All,
}

/// Global settings derived from CLI flags and the optional config file.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose information.
    pub verbose: bool,
    /// Loaded configuration defaults.
    pub config: config::CliConfig,
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let status = fshash_common::backend::init();
    if cli.verbose && !cli.quiet {
        eprintln!("hash backend: {status:?}");
    }

    let config = config::load(cli.config.as_deref())?;
    let globals = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config,
    };

    match cli.command {
        Command::Hash(args) => hash::run(&globals, &args),
        Command::Check(args) => check::run(&globals, &args),
        Command::Show(args) => show::run(&globals, &args),
        Command::Init(args) => init::run(&globals, &args),
    }
}
