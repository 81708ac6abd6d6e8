//! Channel silencing for moderators.
//!
//! Silencing denies the developer role permission to send messages in the
//! invoking channel. A timed silence schedules its own reversal; lifting it
//! early finishes that task so both paths produce the same messages.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::{default_check, has_role};
use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::domain::directory::ConfiguredRole;
use crate::domain::error::WardenError;
use crate::domain::moderation::{expiry_after, PendingAction};
use crate::domain::notify::Notifier;
use crate::domain::parser::{format_duration, parse_duration};
use crate::domain::types::{ChannelId, UserId};
use crate::service::bot::Bot;

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new("silence", SilenceCommand)
            .alias("hush")
            .alias("shh")
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .signature("[duration]")
            .help("Silence the channel for a specific time or until unsilenced.")
            .hidden(),
    );
    commands.register(
        Command::new("unsilence", UnsilenceCommand)
            .alias("unhush")
            .alias("unshh")
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .help("Unsilence the channel when it is silenced."),
    );
}

#[derive(Debug, Clone, Copy)]
struct Silence {
    moderator: UserId,
    /// The scheduled unsilence, for timed silences.
    task: Option<Uuid>,
}

/// Currently silenced channels.
#[derive(Default)]
pub struct Silences {
    channels: Arc<DashMap<ChannelId, Silence>>,
}

impl Silences {
    pub fn is_silenced(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Silenced channels, ordered by id.
    pub fn silenced(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.channels.iter().map(|e| *e.key()).collect();
        channels.sort();
        channels
    }
}

/// Restore sending in `channel`. Returns `false` if it wasn't silenced.
///
/// The log names `moderator` if given, otherwise whoever silenced the channel.
async fn lift(
    notifier: &Notifier,
    channels: &DashMap<ChannelId, Silence>,
    channel: ChannelId,
    moderator: Option<UserId>,
) -> Result<bool> {
    let Some((_, silence)) = channels.remove(&channel) else {
        return Ok(false);
    };

    let role = notifier.directory().role_id(ConfiguredRole::Developer);
    let platform = notifier.platform();
    platform.set_send_permission(channel, role, Some(true)).await?;
    platform
        .send_message(channel, ":unlock: Channel unsilenced successfully.")
        .await?;

    let moderator = moderator.unwrap_or(silence.moderator);
    notifier
        .send_log(&format!(
            "**Channel unsilenced:** {} by {}",
            channel.mention(),
            moderator.mention()
        ))
        .await?;

    info!(channel = %channel, moderator = %moderator, "Channel unsilenced");
    Ok(true)
}

async fn expire_silence(
    notifier: Notifier,
    channels: Arc<DashMap<ChannelId, Silence>>,
    action: PendingAction,
) -> Result<()> {
    let PendingAction::Unsilence { channel } = action else {
        return Ok(());
    };
    lift(&notifier, &channels, channel, None).await?;
    Ok(())
}

struct SilenceCommand;

#[async_trait]
impl CommandHandler<Bot> for SilenceCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> Result<()> {
        let bot = inv.ctx;
        let channel = inv.message.channel_id;
        let moderator = inv.message.author.id;
        let platform = bot.platform();

        let duration = if inv.args.is_empty() {
            None
        } else {
            match parse_duration(&inv.args.concat()) {
                Ok(duration) => Some(duration),
                Err(e @ (WardenError::InvalidDuration { .. } | WardenError::DurationTooLong { .. })) => {
                    platform.send_message(channel, &format!(":x: {}", e)).await?;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        };
        let expected = match duration {
            Some(duration) => expiry_after(OffsetDateTime::now_utc(), duration)
                .map(|at| at.format(&Rfc3339))
                .transpose()?,
            None => None,
        };

        let role = bot.directory().role(ConfiguredRole::Developer)?;
        let channels = &bot.silences().channels;

        let claimed = match channels.entry(channel) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Silence {
                    moderator,
                    task: None,
                });
                true
            }
        };
        if !claimed {
            platform
                .send_message(channel, ":x: Channel is already silenced.")
                .await?;
            return Ok(());
        }

        if let Err(e) = platform.set_send_permission(channel, role.id, Some(false)).await {
            channels.remove(&channel);
            return Err(e.into());
        }

        match duration {
            Some(duration) => {
                let notifier = bot.notifier().clone();
                let shared = Arc::clone(channels);
                let id = bot
                    .scheduler()
                    .schedule(
                        duration,
                        PendingAction::Unsilence { channel },
                        move |action| expire_silence(notifier, shared, action),
                    )
                    .await;
                if let Some(mut silence) = channels.get_mut(&channel) {
                    silence.task = Some(id);
                }

                let formatted = format_duration(duration);
                let expected = expected.as_deref().unwrap_or("unknown");
                platform
                    .send_message(
                        channel,
                        &format!(
                            ":lock: :hourglass: Successfully silenced channel for {}.",
                            formatted
                        ),
                    )
                    .await?;
                bot.notifier()
                    .send_log(&format!(
                        "**Channel silenced:** {} by {} for {} (expected unsilence: {})",
                        channel.mention(),
                        moderator.mention(),
                        formatted,
                        expected
                    ))
                    .await?;
            }
            None => {
                platform
                    .send_message(channel, ":lock: Successfully silenced channel for undefined time.")
                    .await?;
                bot.notifier()
                    .send_log(&format!(
                        "**Channel silenced:** {} by {} for Forever",
                        channel.mention(),
                        moderator.mention()
                    ))
                    .await?;
            }
        }

        info!(channel = %channel, moderator = %moderator, ?duration, "Channel silenced");
        Ok(())
    }
}

struct UnsilenceCommand;

#[async_trait]
impl CommandHandler<Bot> for UnsilenceCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> Result<()> {
        let bot = inv.ctx;
        let channel = inv.message.channel_id;
        let channels = &bot.silences().channels;

        let task = channels.get(&channel).map(|silence| silence.task);
        let Some(task) = task else {
            bot.platform()
                .send_message(channel, ":x: Channel is not silenced. Can't unsilence.")
                .await?;
            return Ok(());
        };

        if let Some(id) = task {
            if bot.scheduler().finish_now(id).await {
                return Ok(());
            }
        }

        lift(bot.notifier(), channels, channel, Some(inv.message.author.id)).await?;
        Ok(())
    }
}
