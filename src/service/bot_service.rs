//! Event loop for `chat-warden run`.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::moderation::PendingAction;
use crate::domain::types::ChannelId;
use crate::service::adapter;
use crate::service::bot::Bot;
use crate::service::dispatcher::{apply_state, handle_event, route_event};
use crate::service::memory::{MemoryGuildCache, MemoryMessageHistory};
use crate::service::recording::RecordingPlatform;

/// How message events are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// One task per message event.
    #[default]
    Concurrent,
    /// Each event is fully handled before the next line is read.
    Sequential,
}

/// What was left behind when the loop stopped.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub events: usize,
    pub rejected: usize,
    /// Scheduled actions that will never run.
    pub outstanding: Vec<PendingAction>,
    pub silenced: Vec<ChannelId>,
}

/// Drives a [`Bot`] from a newline-delimited JSON event stream.
pub struct BotService {
    bot: Arc<Bot>,
    mode: Mode,
}

impl BotService {
    /// Build a bot that records its actions to stdout.
    pub fn new(config: Config, mode: Mode) -> Result<Self> {
        let cache = Arc::new(MemoryGuildCache::new());
        let platform = Arc::new(RecordingPlatform::new().with_writer(Box::new(std::io::stdout())));
        let history = Arc::new(
            MemoryMessageHistory::new(config.antispam.max_window())
                .with_channel_capacity(config.message_cache_size),
        );

        let bot = Bot::new(config, cache, platform.clone(), history, platform)?;
        Ok(Self::with_bot(Arc::new(bot), mode))
    }

    pub fn with_bot(bot: Arc<Bot>, mode: Mode) -> Self {
        Self { bot, mode }
    }

    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }

    /// Process events from stdin until EOF, then shut down.
    pub async fn run(&self) -> Result<ShutdownReport> {
        self.run_from(BufReader::new(tokio::io::stdin())).await
    }

    /// Process events from `reader` until EOF, then shut down.
    ///
    /// State updates from every event are applied in order as lines are
    /// read. In concurrent mode message handlers then run on their own task.
    /// Malformed lines are reported on stderr and skipped.
    pub async fn run_from<R>(&self, reader: R) -> Result<ShutdownReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut tasks = JoinSet::new();
        let mut line_number = 0;
        let mut events = 0;
        let mut rejected = 0;

        while let Some(line) = lines.next_line().await? {
            line_number += 1;

            let event = match adapter::parse_event(&line) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(line = line_number, error = %e, "Skipping malformed event");
                    eprintln!("{}", adapter::format_error(line_number, &e.to_string()));
                    rejected += 1;
                    continue;
                }
            };
            events += 1;

            if self.mode == Mode::Sequential || event.message().is_none() {
                handle_event(&self.bot, &event).await;
            } else {
                apply_state(&self.bot, &event).await;
                let bot = Arc::clone(&self.bot);
                tasks.spawn(async move { route_event(&bot, &event).await });
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Event task failed");
            }
        }

        info!(events, rejected, "Event stream closed");

        let mut report = self.shutdown().await;
        report.events = events;
        report.rejected = rejected;
        Ok(report)
    }

    /// Stop handlers, drop pending scheduled actions and report what was
    /// left to the alerts channel.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.bot.shutdown_token().cancel();

        let outstanding = self.bot.scheduler().shutdown().await;
        let silenced = self.bot.silences().silenced();

        let mut lines = Vec::new();
        if !outstanding.is_empty() {
            let actions: Vec<String> = outstanding.iter().map(|a| a.to_string()).collect();
            lines.push(format!(
                "Shutting down with {} scheduled action(s) that will not run: {}",
                outstanding.len(),
                actions.join(", ")
            ));
        }
        if !silenced.is_empty() {
            let channels: Vec<String> = silenced.iter().map(|c| c.mention()).collect();
            lines.push(format!("Channels still silenced: {}", channels.join(", ")));
        }

        if !lines.is_empty() {
            warn!(
                outstanding = outstanding.len(),
                silenced = silenced.len(),
                "Shutting down with unfinished moderation state"
            );
            if let Err(e) = self.bot.notifier().send_alert(&lines.join("\n"), false).await {
                error!(error = %e, "Failed to report shutdown state");
            }
        }

        ShutdownReport {
            events: 0,
            rejected: 0,
            outstanding,
            silenced,
        }
    }
}
