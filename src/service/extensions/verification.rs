//! New member verification.
//!
//! Unverified members may only send `verify` in the verification channel.
//! Anything else they post there is removed, with a reminder that removes
//! itself shortly after.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{default_check, top_role_below};
use crate::domain::checks::{Check, CheckOperation, ChannelCheck, RoleCheck};
use crate::domain::commands::{
    Command, CommandHandler, CommandRouter, EventHandler, EventRouter, Invocation,
};
use crate::domain::directory::{ConfiguredChannel, ConfiguredRole};
use crate::domain::types::{Event, EventKind, Message};
use crate::service::bot::Bot;

const NAME: &str = "verify";
const ALIASES: [&str; 3] = ["accept", "verified", "accepted"];

/// Wait before the second attempt at removing a message.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// In the verification channel, not yet a developer and below admin.
fn unverified_checks() -> Vec<Arc<dyn Check>> {
    vec![
        default_check(),
        Arc::new(ChannelCheck::configured(
            ConfiguredChannel::Verification,
            CheckOperation::Equal,
        )),
        Arc::new(RoleCheck::configured(
            ConfiguredRole::Developer,
            CheckOperation::NotContains,
        )),
        top_role_below(ConfiguredRole::Admin),
    ]
}

pub(super) fn register(commands: &mut CommandRouter<Bot>, events: &mut EventRouter<Bot>) {
    let mut command = Command::new(NAME, VerifyCommand)
        .checks(unverified_checks())
        .help("Verify yourself to gain access to the rest of the server.")
        .hidden();
    for alias in ALIASES {
        command = command.alias(alias);
    }
    commands.register(command);

    events.register(
        "verification",
        &[EventKind::MessageCreate],
        unverified_checks(),
        VerificationGuard,
    );
}

struct VerifyCommand;

#[async_trait]
impl CommandHandler<Bot> for VerifyCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let author = &inv.message.author;
        let guild = bot.directory().require_guild()?;
        let role = bot.directory().role(ConfiguredRole::Developer)?;

        bot.notifier().delete_ignoring_not_found(inv.message).await?;

        bot.platform()
            .add_role(guild, author.id, role.id, "Verified")
            .await?;
        bot.cache().grant_role(guild, author.id, role.id);

        bot.notifier()
            .send_log(&format!(
                "**Verified:** {} (`{}`, `{}`)",
                author.mention(),
                author.name,
                author.id
            ))
            .await?;

        info!(user = %author.id, "User verified");
        Ok(())
    }
}

/// Removes everything else unverified members post in the channel.
struct VerificationGuard;

impl VerificationGuard {
    fn is_verify_attempt(prefix: &str, content: &str) -> bool {
        let content = content.to_lowercase();
        std::iter::once(NAME)
            .chain(ALIASES)
            .any(|name| content.starts_with(&format!("{}{}", prefix, name)))
    }

    async fn remove(bot: &Bot, message: &Message) {
        if let Err(e) = bot.notifier().delete_ignoring_not_found(message).await {
            warn!(error = %e, "Failed to delete message, retrying");
            tokio::time::sleep(RETRY_DELAY).await;

            if let Err(e) = bot.notifier().delete_ignoring_not_found(message).await {
                warn!(error = %e, "Failed to delete message on the second attempt");
            }
        }
    }
}

#[async_trait]
impl EventHandler<Bot> for VerificationGuard {
    async fn handle(&self, bot: &Bot, event: &Event) -> anyhow::Result<()> {
        let Some(message) = event.message() else {
            return Ok(());
        };
        let prefix = bot.commands().prefix();
        if Self::is_verify_attempt(prefix, &message.content) {
            return Ok(());
        }

        bot.notifier()
            .post_temporary(
                message.channel_id,
                &format!(
                    "{} Please send `{}{}` to gain access to the rest of the server.",
                    message.author.mention(),
                    prefix,
                    NAME
                ),
            )
            .await?;

        Self::remove(bot, message).await;
        Ok(())
    }
}
