//! chat-warden: moderation and automation core for group-chat communities
//!
//! Replays gateway events from stdin through checks, commands, content filters
//! and antispam rules, writing the resulting platform actions to stdout.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use chat_warden::cli::{Cli, Commands};
use chat_warden::config::{self, ConfigService};
use chat_warden::domain;
use chat_warden::service::{BotService, Mode};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = ConfigService::load(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Run { sequential } => {
            domain::logger::init(&config, cli.debug || config.debug)?;

            let mode = if sequential {
                Mode::Sequential
            } else {
                Mode::Concurrent
            };
            let service = BotService::new(config, mode)?;
            let report = service.run().await?;

            info!(
                events = report.events,
                rejected = report.rejected,
                outstanding = report.outstanding.len(),
                silenced = report.silenced.len(),
                "Shut down"
            );
            if !cli.quiet && !report.outstanding.is_empty() {
                eprintln!(
                    "{} scheduled action(s) were still pending at shutdown.",
                    report.outstanding.len()
                );
            }
        }
        Commands::Init { path } => {
            let config_path = if let Some(p) = path {
                ConfigService::generate_at(&p)?;
                p
            } else {
                ConfigService::generate_default()?;
                ConfigService::default_path()
            };
            if !cli.quiet {
                eprintln!("Configuration file created at: {}", config_path.display());
            }
        }
        Commands::Check => {
            config::validate(&config)?;
            if !cli.quiet {
                eprintln!("Configuration is valid.");
            }
        }
        Commands::Version => {
            println!("chat-warden {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
