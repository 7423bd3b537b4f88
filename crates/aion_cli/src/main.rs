//! `aion-pack`: batch driver for Series-7 I/O netlist legalization.
//!
//! Provides `aion-pack legalize` to legalize a JSON netlist against a JSON
//! chip database, and `aion-pack device` to generate a synthetic I/O column
//! database for experiments and regression fixtures.

#![warn(missing_docs)]

mod device;
mod legalize;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Aion netlist legalizer for Series-7 I/O.
#[derive(Parser, Debug)]
#[command(name = "aion-pack", version, about = "Aion Series-7 I/O legalizer")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Legalize a netlist for a device.
    Legalize(LegalizeArgs),
    /// Write a synthetic I/O column device as JSON.
    Device(DeviceArgs),
}

/// Arguments for the `aion-pack legalize` subcommand.
#[derive(Parser, Debug)]
pub struct LegalizeArgs {
    /// Chip database (JSON).
    #[arg(short, long)]
    pub device: PathBuf,

    /// Netlist to legalize (JSON).
    #[arg(short, long)]
    pub netlist: PathBuf,

    /// Path to a `pack.toml` options file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the legalized netlist. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `aion-pack device` subcommand.
#[derive(Parser, Debug)]
pub struct DeviceArgs {
    /// Part name recorded in the database.
    #[arg(long, default_value = "xc7-synthetic")]
    pub name: String,

    /// A bank as `NUMBER:KIND:SITES`, where KIND is `hr` or `hp`
    /// (e.g. `--bank 14:hr:8`). Sites are numbered across banks.
    #[arg(short, long = "bank", required = true)]
    pub banks: Vec<String>,

    /// Where to write the database. Defaults to stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Terminal color selection.
#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    /// Detect automatically based on terminal capabilities.
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Diagnostic output format.
#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per diagnostic.
    Json,
}

/// Options shared by every subcommand after parsing.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Suppress non-error output.
    pub quiet: bool,
    /// Whether the terminal renderer may use ANSI colors.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
    };

    let result = match cli.command {
        Command::Legalize(ref args) => legalize::run(args, &global),
        Command::Device(ref args) => device::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rough terminal detection: checks the TERM env var.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}
