//! # beampair
//!
//! CLI harness for exercising beampair pairing sessions.
//!
//! ## Commands
//!
//! - `simulate`: Pair two simulated devices over an in-memory network
//! - `convention`: Convert between beacons and peer identifiers
//!
//! ## Example
//!
//! ```bash
//! # Two devices 30 cm apart, default profiles
//! beampair simulate
//!
//! # Custom profiles, print final snapshots as JSON
//! beampair simulate --config-a alpha.toml --config-b bravo.toml --json
//!
//! # Peer identifier for beacon 1.1, and back
//! beampair convention --major 1 --minor 1
//! beampair convention --parse 0000000000000001-0000000000000001
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{convention, simulate};

/// CLI harness for beampair proximity pairing.
#[derive(Parser, Debug)]
#[command(name = "beampair")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pair two simulated devices and print what each received
    Simulate {
        /// Config file for the first device (default: "Alpha", role one)
        #[arg(long)]
        config_a: Option<PathBuf>,

        /// Config file for the second device (default: "Bravo", role two)
        #[arg(long)]
        config_b: Option<PathBuf>,

        /// Distance between the two devices in metres
        #[arg(long, default_value = "0.3")]
        distance_m: f64,

        /// Print final session snapshots as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the peer identifier for a beacon, or parse one back
    Convention {
        /// Beacon major
        #[arg(long, requires = "minor", conflicts_with = "parse")]
        major: Option<u16>,

        /// Beacon minor
        #[arg(long, requires = "major", conflicts_with = "parse")]
        minor: Option<u16>,

        /// Peer identifier to parse
        #[arg(long)]
        parse: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config_a,
            config_b,
            distance_m,
            json,
        } => {
            let options = simulate::Options {
                config_a,
                config_b,
                distance_m,
                json,
            };
            simulate::run(&options).await?;
        }
        Commands::Convention {
            major,
            minor,
            parse,
        } => match (major, minor, parse) {
            (Some(major), Some(minor), None) => {
                println!("{}", convention::identifier_for(major, minor));
            }
            (None, None, Some(name)) => {
                println!("{}", convention::beacon_for(&name)?);
            }
            _ => anyhow::bail!("Must specify either --major and --minor, or --parse"),
        },
    }

    Ok(())
}
