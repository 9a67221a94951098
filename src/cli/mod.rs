//! CLI interface for marketpulse
//!
//! Provides subcommands for:
//! - `run`: Start the signal loop with paper trading
//! - `strategies`: List registered strategy variants
//! - `config`: Show the effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "marketpulse")]
#[command(about = "Signal-generation and paper-trading engine for speculative up/down markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the signal loop with paper trading
    Run(RunArgs),
    /// List registered strategy variants
    Strategies,
    /// Show the effective configuration
    Config,
}
