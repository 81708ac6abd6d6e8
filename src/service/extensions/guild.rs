//! Reports configured roles and channels the guild doesn't have.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::commands::{EventHandler, EventRouter};
use crate::domain::directory::{ConfiguredChannel, ConfiguredRole};
use crate::domain::types::{Event, EventKind};
use crate::service::bot::Bot;

const ROLES: [ConfiguredRole; 5] = [
    ConfiguredRole::Admin,
    ConfiguredRole::Moderator,
    ConfiguredRole::Helper,
    ConfiguredRole::Developer,
    ConfiguredRole::Muted,
];

const CHANNELS: [ConfiguredChannel; 4] = [
    ConfiguredChannel::Alerts,
    ConfiguredChannel::ModeratorLog,
    ConfiguredChannel::BotCommands,
    ConfiguredChannel::Verification,
];

pub(super) fn register(events: &mut EventRouter<Bot>) {
    events.register("guild-audit", &[EventKind::GuildCreate], Vec::new(), GuildAudit);
}

struct GuildAudit;

#[async_trait]
impl EventHandler<Bot> for GuildAudit {
    async fn handle(&self, bot: &Bot, event: &Event) -> anyhow::Result<()> {
        let Event::GuildCreate(guild) = event else {
            return Ok(());
        };
        let directory = bot.directory();
        if guild.id != directory.guild_id() {
            return Ok(());
        }

        info!(guild = %guild.id, name = %guild.name, "Guild available");

        let mut missing = 0;
        for role in ROLES {
            if let Err(e) = directory.role(role) {
                warn!(role = %role, error = %e, "Configured role not found");
                missing += 1;
            }
        }
        for channel in CHANNELS {
            if let Err(e) = directory.channel(channel) {
                warn!(channel = %channel, error = %e, "Configured channel not found");
                missing += 1;
            }
        }

        if missing > 0 {
            warn!(missing, "Commands and handlers that need these will fail");
        }
        Ok(())
    }
}
