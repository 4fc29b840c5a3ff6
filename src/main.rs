//! walkv - WAL-backed key-value store
//!
//! One-shot commands over a write-ahead log and a snapshot file.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use walkv_core::{Config, CrashPoint};

#[derive(Parser)]
#[command(name = "walkv")]
#[command(about = "Key-value store with write-ahead log durability and crash recovery")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "WALKV_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the WAL and snapshot files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a write with fsync, apply it and persist the snapshot
    Write {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Same as write, without forcing anything to disk
    WriteNosync {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Log a write with fsync, then stop before applying it
    CrashAfterWal {
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Last record written before the crash
        #[arg(long, default_value_t = CrashPoint::AfterCommit)]
        at: CrashPoint,
    },

    /// Replay committed transactions from the WAL into the snapshot
    Recover,

    /// Print the WAL and the snapshot
    Display,

    /// Scan the WAL without modifying anything and report what replay would do
    Verify,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Logs go to stderr; stdout is command output only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    match commands::execute(&config, cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::FAILURE
        }
    }
}
