//! CLI argument parsing and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Moderation and automation core for group-chat communities
#[derive(Parser)]
#[command(
    name = "chat-warden",
    version,
    about = "Moderation and automation core for group-chat communities",
    long_about = "Reads gateway events as newline-delimited JSON, runs commands, content \
                  filters and antispam rules against them, and writes the resulting \
                  platform actions as JSON lines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Process gateway events from stdin (alias: replay)
    #[command(alias = "replay")]
    Run {
        /// Handle each event fully before reading the next one
        #[arg(long, short = 's')]
        sequential: bool,
    },
    /// Generate default configuration file
    Init {
        /// Path where to create the configuration file
        #[arg(long, short = 'p')]
        path: Option<PathBuf>,
    },
    /// Validate configuration file
    Check,
    /// Display version information
    Version,
}
