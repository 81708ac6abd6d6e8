//! The bot context shared by every handler.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::domain::antispam::Antispam;
use crate::domain::commands::{CommandRouter, EventRouter};
use crate::domain::moderation::ActionScheduler;
use crate::domain::notify::Notifier;
use crate::domain::platform::{InfractionSink, MessageHistory, Platform};
use crate::domain::types::UserId;
use crate::domain::{Directory, FilterChain};
use crate::service::extensions::{self, Punishments, Silences};
use crate::service::memory::MemoryGuildCache;

/// Everything a command or event handler can reach.
///
/// One instance serves one guild. Nothing here is global, so tests build as
/// many independent bots as they need.
pub struct Bot {
    config: Arc<Config>,
    cache: Arc<MemoryGuildCache>,
    directory: Directory,
    platform: Arc<dyn Platform>,
    history: Arc<dyn MessageHistory>,
    infractions: Arc<dyn InfractionSink>,
    scheduler: Arc<ActionScheduler>,
    notifier: Notifier,
    filters: FilterChain,
    antispam: Antispam,
    commands: CommandRouter<Bot>,
    events: EventRouter<Bot>,
    author_locks: DashMap<UserId, Arc<Mutex<()>>>,
    silences: Silences,
    punishments: Punishments,
    shutdown: CancellationToken,
    self_id: OnceLock<UserId>,
}

impl Bot {
    /// Build the bot and register every extension.
    pub fn new(
        config: Config,
        cache: Arc<MemoryGuildCache>,
        platform: Arc<dyn Platform>,
        history: Arc<dyn MessageHistory>,
        infractions: Arc<dyn InfractionSink>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let directory = Directory::new(Arc::clone(&config), cache.clone());
        let scheduler = Arc::new(ActionScheduler::new());
        let notifier = Notifier::new(
            Arc::clone(&platform),
            directory.clone(),
            Arc::clone(&scheduler),
            config.filters.notification_delay(),
        );

        let filters = FilterChain::new(&config.filters).context("Failed to build filter chain")?;
        let antispam = Antispam::new(&config.antispam).context("Failed to build antispam rules")?;

        let mut commands = CommandRouter::new(config.prefix.clone());
        let mut events = EventRouter::new();
        extensions::register_all(&config, &mut commands, &mut events);

        info!(
            commands = commands.commands().len(),
            handlers = ?events.names(),
            filters = ?filters.names(),
            rules = ?antispam.rule_names(),
            "Bot ready to dispatch"
        );

        Ok(Self {
            config,
            cache,
            directory,
            platform,
            history,
            infractions,
            scheduler,
            notifier,
            filters,
            antispam,
            commands,
            events,
            author_locks: DashMap::new(),
            silences: Silences::default(),
            punishments: Punishments::default(),
            shutdown: CancellationToken::new(),
            self_id: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<MemoryGuildCache> {
        &self.cache
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn history(&self) -> &Arc<dyn MessageHistory> {
        &self.history
    }

    pub fn infractions(&self) -> &Arc<dyn InfractionSink> {
        &self.infractions
    }

    pub fn scheduler(&self) -> &Arc<ActionScheduler> {
        &self.scheduler
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn antispam(&self) -> &Antispam {
        &self.antispam
    }

    pub fn commands(&self) -> &CommandRouter<Bot> {
        &self.commands
    }

    pub fn events(&self) -> &EventRouter<Bot> {
        &self.events
    }

    pub fn silences(&self) -> &Silences {
        &self.silences
    }

    pub fn punishments(&self) -> &Punishments {
        &self.punishments
    }

    /// Cancelled once shutdown starts; handlers check it between stages.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// The bot's own user id, known after the ready event.
    pub fn self_id(&self) -> Option<UserId> {
        self.self_id.get().copied()
    }

    /// Record the session's user id. Later calls are ignored.
    pub fn set_self_id(&self, id: UserId) {
        if self.self_id.set(id).is_ok() {
            info!(user = %id, "Session ready");
        }
    }

    /// Lock serializing antispam handling for one author.
    pub fn author_lock(&self, author: UserId) -> Arc<Mutex<()>> {
        self.author_locks.entry(author).or_default().clone()
    }
}
