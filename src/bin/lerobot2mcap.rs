// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # lerobot2mcap CLI
//!
//! Download LeRobot datasets and convert them to MCAP.
//!
//! ## Usage
//!
//! ```sh
//! # Download two episodes into ./data/lerobot/pusht
//! lerobot2mcap download lerobot/pusht -e 0 1
//!
//! # Convert a downloaded dataset (by id or by directory)
//! lerobot2mcap convert lerobot/pusht -o out
//!
//! # Show what a container holds
//! lerobot2mcap inspect info out/lerobot_pusht.mcap
//! ```

mod cmd;
mod common;

use std::process;

use clap::{Parser, Subcommand};
use cmd::{ConvertCmd, DownloadCmd, InspectCmd};
use common::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// lerobot2mcap - LeRobot datasets to MCAP
///
/// Converts episodic robot datasets into chunked, indexed MCAP containers
/// for timeline playback.
#[derive(Parser, Clone)]
#[command(name = "lerobot2mcap")]
#[command(about = "Convert LeRobot datasets to MCAP", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Download a dataset from the Hugging Face Hub
    Download(DownloadCmd),

    /// Convert a dataset to MCAP
    Convert(ConvertCmd),

    /// Show the contents of an MCAP container
    #[command(subcommand)]
    Inspect(InspectCmd),
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Download(cmd) => cmd.run(),
        Commands::Convert(cmd) => cmd.run(),
        Commands::Inspect(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(convert_error) = e.downcast_ref::<lerobot2mcap::ConvertError>() {
            for (key, value) in convert_error.log_fields() {
                eprintln!("  {key}: {value}");
            }
            if convert_error.is_source_error() {
                eprintln!("Hint: fetch missing dataset files with `lerobot2mcap download <dataset-id>`");
            }
        }
        process::exit(1);
    }
}
