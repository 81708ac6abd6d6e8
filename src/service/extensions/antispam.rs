//! Applies the antispam rules to new messages and mutes offenders.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{default_check, moderation};
use crate::domain::antispam::{self, Violation};
use crate::domain::checks::check_fn;
use crate::domain::commands::{EventHandler, EventRouter};
use crate::domain::directory::ConfiguredRole;
use crate::domain::types::{ChannelId, Event, EventKind, Message, MessageId, UserId};
use crate::service::bot::Bot;

pub(super) fn register(events: &mut EventRouter<Bot>) {
    let not_moderator = check_fn("not moderator", |ctx| {
        ctx.message()
            .is_some_and(|m| !ctx.directory.has_role(m.author.id, ConfiguredRole::Moderator))
    });

    events.register(
        "antispam",
        &[EventKind::MessageCreate],
        vec![default_check(), not_moderator],
        AntispamHandler,
    );
}

struct AntispamHandler;

#[async_trait]
impl EventHandler<Bot> for AntispamHandler {
    async fn handle(&self, bot: &Bot, event: &Event) -> anyhow::Result<()> {
        let Some(message) = event.message() else {
            return Ok(());
        };
        let author = message.author.id;

        // Messages from one author are evaluated one at a time, so a burst
        // produces a single mute.
        let lock = bot.author_lock(author);
        let _guard = lock.lock().await;

        if bot.directory().has_role(author, ConfiguredRole::Muted) {
            debug!(user = %author, "Already muted, skipping antispam");
            return Ok(());
        }
        if bot.shutdown_token().is_cancelled() {
            return Ok(());
        }

        let Some(violation) = bot
            .antispam()
            .evaluate(bot.history().as_ref(), author, message.timestamp)
            .await
        else {
            return Ok(());
        };

        punish(bot, message, violation).await
    }
}

async fn punish(bot: &Bot, message: &Message, violation: Violation) -> anyhow::Result<()> {
    let author = message.author.id;

    let mut by_channel: BTreeMap<ChannelId, Vec<MessageId>> = BTreeMap::new();
    for m in &violation.messages {
        by_channel.entry(m.channel_id).or_default().push(m.id);
    }
    for (channel, ids) in &by_channel {
        if let Err(e) = bot.platform().bulk_delete(*channel, ids).await {
            warn!(channel = %channel, error = %e, "Failed to remove spam");
        }
    }

    let actor = bot.self_id().unwrap_or(UserId(0));
    let reason = format!("Antispam: {}", violation.description);
    moderation::mute(
        bot,
        actor,
        author,
        bot.config().antispam.mute_duration(),
        &reason,
    )
    .await?;

    bot.platform()
        .send_message(
            message.channel_id,
            &antispam::warning(&message.author.mention(), &violation.description),
        )
        .await?;

    warn!(
        user = %author,
        rule = violation.rule,
        removed = violation.messages.len(),
        "Antispam violation"
    );
    Ok(())
}
