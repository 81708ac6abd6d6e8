//! Ban, mute and unmute, with timed reversal through the scheduler.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{default_check, has_role};
use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::domain::directory::ConfiguredRole;
use crate::domain::error::{PlatformError, WardenError};
use crate::domain::moderation::{Infraction, InfractionKind, PendingAction};
use crate::domain::notify::Notifier;
use crate::domain::parser::{format_duration, parse_duration, parse_user};
use crate::domain::types::{Message, UserId};
use crate::service::bot::Bot;
use crate::service::memory::MemoryGuildCache;

const NO_REASON: &str = "No reason provided.";

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new("ban", BanCommand)
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .signature("<user> [duration] [reason...]")
            .help("Ban a user, optionally for a limited time."),
    );
    commands.register(
        Command::new("mute", MuteCommand)
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .signature("<user> [duration] [reason...]")
            .help("Give a user the muted role, optionally for a limited time."),
    );
    commands.register(
        Command::new("unmute", UnmuteCommand)
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .signature("<user>")
            .help("Remove the muted role from a user."),
    );
}

/// Scheduled reversals of timed bans and mutes, keyed by user.
#[derive(Default)]
pub struct Punishments {
    mutes: Arc<DashMap<UserId, Uuid>>,
    bans: Arc<DashMap<UserId, Uuid>>,
}

impl Punishments {
    pub fn pending_unmute(&self, user: UserId) -> Option<Uuid> {
        self.mutes.get(&user).map(|id| *id)
    }

    pub fn pending_unban(&self, user: UserId) -> Option<Uuid> {
        self.bans.get(&user).map(|id| *id)
    }
}

/// `<user> [duration] [reason...]`.
#[derive(Debug, PartialEq)]
struct TargetArgs {
    user: UserId,
    duration: Option<Duration>,
    reason: String,
}

impl TargetArgs {
    /// `Ok(None)` when the user is missing or unparseable. A second token that
    /// isn't a duration is the first word of the reason, but a duration that
    /// is too long is an error.
    fn parse(args: &[String]) -> Result<Option<Self>, WardenError> {
        let Some(user) = args.first().and_then(|arg| parse_user(arg)) else {
            return Ok(None);
        };
        let mut rest = &args[1..];

        let duration = match rest.first().map(|token| parse_duration(token)) {
            Some(Ok(duration)) => {
                rest = &rest[1..];
                Some(duration)
            }
            Some(Err(e @ WardenError::DurationTooLong { .. })) => return Err(e),
            _ => None,
        };

        let reason = if rest.is_empty() {
            NO_REASON.to_string()
        } else {
            rest.join(" ")
        };

        Ok(Some(Self {
            user,
            duration,
            reason,
        }))
    }
}

fn describe(duration: Option<Duration>) -> String {
    duration.map_or_else(|| "permanent".to_string(), format_duration)
}

async fn reply_usage(bot: &Bot, message: &Message, usage: &str) -> anyhow::Result<()> {
    bot.platform()
        .send_message(message.channel_id, &format!(":x: Usage: `{}`", usage))
        .await?;
    Ok(())
}

/// Parse `<user> [duration] [reason...]`, replying on the way out if it can't be.
async fn target_args(
    bot: &Bot,
    message: &Message,
    args: &[String],
    usage: &str,
) -> anyhow::Result<Option<TargetArgs>> {
    match TargetArgs::parse(args) {
        Ok(Some(args)) => return Ok(Some(args)),
        Ok(None) => reply_usage(bot, message, usage).await?,
        Err(e) => {
            bot.platform()
                .send_message(message.channel_id, &format!(":x: {}", e))
                .await?;
        }
    }
    Ok(None)
}

/// Mute `target`, record the infraction and schedule the unmute.
///
/// Any timed unmute already pending for the user is replaced.
pub(crate) async fn mute(
    bot: &Bot,
    actor: UserId,
    target: UserId,
    duration: Option<Duration>,
    reason: &str,
) -> anyhow::Result<Infraction> {
    let directory = bot.directory();
    let guild = directory.require_guild()?;
    let role = directory.role(ConfiguredRole::Muted)?;

    let infraction = Infraction::new(InfractionKind::Mute, actor, target, reason, duration);
    debug!(?infraction, "New infraction");
    bot.infractions()
        .upsert(&infraction)
        .await
        .context("Failed to record infraction")?;

    bot.platform().add_role(guild, target, role.id, reason).await?;
    bot.cache().grant_role(guild, target, role.id);

    if let Some((_, previous)) = bot.punishments().mutes.remove(&target) {
        bot.scheduler().cancel(previous).await;
    }

    if let Some(duration) = duration {
        let notifier = bot.notifier().clone();
        let cache = Arc::clone(bot.cache());
        let mutes = Arc::clone(&bot.punishments().mutes);

        let id = bot
            .scheduler()
            .schedule(
                duration,
                PendingAction::Unmute { user: target },
                move |action| expire_mute(notifier, cache, mutes, action),
            )
            .await;
        bot.punishments().mutes.insert(target, id);
    }

    bot.notifier()
        .send_log(&format!(
            "**Muted:** {} by {} ({}): {}",
            target.mention(),
            actor.mention(),
            describe(duration),
            reason
        ))
        .await?;

    info!(user = %target, actor = %actor, "User muted");
    Ok(infraction)
}

async fn lift_mute(
    notifier: &Notifier,
    cache: &MemoryGuildCache,
    user: UserId,
    reason: &str,
) -> anyhow::Result<()> {
    let directory = notifier.directory();
    let guild = directory.guild_id();
    let role = directory.role_id(ConfiguredRole::Muted);

    notifier
        .platform()
        .remove_role(guild, user, role, reason)
        .await?;
    cache.revoke_role(guild, user, role);
    notifier
        .send_log(&format!("**Unmuted:** {} ({})", user.mention(), reason))
        .await?;

    info!(user = %user, reason, "User unmuted");
    Ok(())
}

async fn expire_ban(
    notifier: Notifier,
    bans: Arc<DashMap<UserId, Uuid>>,
    action: PendingAction,
) -> anyhow::Result<()> {
    let PendingAction::Unban { user } = action else {
        return Ok(());
    };
    bans.remove(&user);

    let guild = notifier.directory().guild_id();
    match notifier.platform().unban(guild, user).await {
        Ok(()) | Err(PlatformError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }
    notifier
        .send_log(&format!("**Unbanned:** {} (Ban expired)", user.mention()))
        .await?;
    Ok(())
}

async fn expire_mute(
    notifier: Notifier,
    cache: Arc<MemoryGuildCache>,
    mutes: Arc<DashMap<UserId, Uuid>>,
    action: PendingAction,
) -> anyhow::Result<()> {
    let PendingAction::Unmute { user } = action else {
        return Ok(());
    };
    mutes.remove(&user);
    lift_mute(&notifier, &cache, user, "Mute expired").await
}

struct BanCommand;

#[async_trait]
impl CommandHandler<Bot> for BanCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let usage = "ban <user> [duration] [reason...]";
        let Some(args) = target_args(bot, inv.message, inv.args, usage).await? else {
            return Ok(());
        };

        let actor = inv.message.author.id;
        let guild = bot.directory().require_guild()?;

        let infraction =
            Infraction::new(InfractionKind::Ban, actor, args.user, &args.reason, args.duration);
        debug!(?infraction, "New infraction");
        bot.infractions()
            .upsert(&infraction)
            .await
            .context("Failed to record infraction")?;

        bot.platform().ban(guild, args.user, &args.reason).await?;

        if let Some((_, previous)) = bot.punishments().bans.remove(&args.user) {
            bot.scheduler().cancel(previous).await;
        }

        if let Some(duration) = args.duration {
            let notifier = bot.notifier().clone();
            let bans = Arc::clone(&bot.punishments().bans);

            let id = bot
                .scheduler()
                .schedule(
                    duration,
                    PendingAction::Unban { user: args.user },
                    move |action| expire_ban(notifier, bans, action),
                )
                .await;
            bot.punishments().bans.insert(args.user, id);
        }

        bot.notifier()
            .send_log(&format!(
                "**Banned:** {} by {} ({}): {}",
                args.user.mention(),
                actor.mention(),
                describe(args.duration),
                args.reason
            ))
            .await?;

        info!(user = %args.user, actor = %actor, "User banned");
        Ok(())
    }
}

struct MuteCommand;

#[async_trait]
impl CommandHandler<Bot> for MuteCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let usage = "mute <user> [duration] [reason...]";
        let Some(args) = target_args(bot, inv.message, inv.args, usage).await? else {
            return Ok(());
        };

        mute(bot, inv.message.author.id, args.user, args.duration, &args.reason).await?;
        bot.platform()
            .send_message(
                inv.message.channel_id,
                &format!(
                    ":mute: Muted {} ({}).",
                    args.user.mention(),
                    describe(args.duration)
                ),
            )
            .await?;
        Ok(())
    }
}

struct UnmuteCommand;

#[async_trait]
impl CommandHandler<Bot> for UnmuteCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let Some(user) = inv.args.first().and_then(|arg| parse_user(arg)) else {
            return reply_usage(bot, inv.message, "unmute <user>").await;
        };

        let pending = bot.punishments().mutes.remove(&user).map(|(_, id)| id);
        let finished = match pending {
            // The scheduled reversal does the work, exactly as on expiry
            Some(id) => bot.scheduler().finish_now(id).await,
            None => false,
        };

        if !finished {
            if !bot.directory().has_role(user, ConfiguredRole::Muted) {
                bot.platform()
                    .send_message(
                        inv.message.channel_id,
                        &format!(":x: {} is not muted.", user.mention()),
                    )
                    .await?;
                return Ok(());
            }

            let reason = format!("Unmuted by {}", inv.message.author.id.mention());
            lift_mute(bot.notifier(), bot.cache(), user, &reason).await?;
        }

        bot.platform()
            .send_message(
                inv.message.channel_id,
                &format!(":speaker: Unmuted {}.", user.mention()),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_target_args_with_duration() {
        let parsed = TargetArgs::parse(&args(&["<@42>", "1h30m", "being", "rude"]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.user, UserId(42));
        assert_eq!(parsed.duration, Some(Duration::from_secs(5400)));
        assert_eq!(parsed.reason, "being rude");
    }

    #[test]
    fn test_non_duration_token_joins_reason() {
        let parsed = TargetArgs::parse(&args(&["42", "spamming", "links"])).unwrap().unwrap();
        assert_eq!(parsed.duration, None);
        assert_eq!(parsed.reason, "spamming links");
    }

    #[test]
    fn test_missing_reason_uses_placeholder() {
        let parsed = TargetArgs::parse(&args(&["<@!42>", "2d"])).unwrap().unwrap();
        assert_eq!(parsed.duration, Some(Duration::from_secs(2 * 24 * 3600)));
        assert_eq!(parsed.reason, NO_REASON);
    }

    #[test]
    fn test_invalid_user() {
        assert_eq!(TargetArgs::parse(&args(&[])).unwrap(), None);
        assert_eq!(TargetArgs::parse(&args(&["someone"])).unwrap(), None);
    }

    #[test]
    fn test_overlong_duration_is_rejected() {
        assert!(matches!(
            TargetArgs::parse(&args(&["<@42>", "100000000w", "spam"])),
            Err(WardenError::DurationTooLong { .. })
        ));
    }
}
