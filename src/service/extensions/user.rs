//! `user` command: look up a member's id and roles.

use async_trait::async_trait;
use tracing::debug;

use super::default_check;
use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::domain::directory::{ConfiguredChannel, ConfiguredRole};
use crate::domain::parser::parse_user;
use crate::domain::types::{Message, UserId};
use crate::domain::Directory;
use crate::service::bot::Bot;

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new("user", UserCommand)
            .alias("u")
            .check(default_check())
            .signature("[user]")
            .help(
                "Show your user id and roles. Staff may look up other members by \
                 mention or id.",
            ),
    );
}

/// Whether the user's top role ranks at least as high as `role`.
fn ranks_at_least(directory: &Directory, user: UserId, role: ConfiguredRole) -> bool {
    let Ok(reference) = directory.role(role) else {
        return false;
    };
    directory
        .member_roles(user)
        .and_then(|roles| roles.into_iter().max())
        .is_some_and(|top| top >= reference)
}

/// Keep bot chatter in the bot commands channel. Helpers and above may use
/// commands anywhere.
///
/// Elsewhere, the invocation is removed and the author gets a short-lived
/// pointer to the right channel. Returns whether the command may go ahead.
async fn require_bot_channel(bot: &Bot, message: &Message) -> anyhow::Result<bool> {
    let directory = bot.directory();
    let channel = directory.channel_id(ConfiguredChannel::BotCommands);

    if message.channel_id == channel
        || ranks_at_least(directory, message.author.id, ConfiguredRole::Helper)
    {
        return Ok(true);
    }

    debug!(user = %message.author.id, "Command used outside the bot commands channel");
    bot.notifier()
        .post_temporary(
            message.channel_id,
            &format!(
                "{} Please use {} for this command.",
                message.author.mention(),
                channel.mention()
            ),
        )
        .await?;
    bot.notifier().delete_ignoring_not_found(message).await?;
    Ok(false)
}

struct UserCommand;

#[async_trait]
impl CommandHandler<Bot> for UserCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        if !require_bot_channel(bot, inv.message).await? {
            return Ok(());
        }

        let directory = bot.directory();
        let reply_to = inv.message.channel_id;
        let author = inv.message.author.id;

        let target = match inv.args.first() {
            Some(arg) => match parse_user(arg) {
                Some(id) => id,
                None => {
                    bot.platform()
                        .send_message(reply_to, &format!(":x: Unknown user `{}`.", arg))
                        .await?;
                    return Ok(());
                }
            },
            None => author,
        };

        if target != author && !ranks_at_least(directory, author, ConfiguredRole::Moderator) {
            bot.platform()
                .send_message(
                    reply_to,
                    ":x: Only staff members may request information about other users.",
                )
                .await?;
            return Ok(());
        }

        let Some(member) = directory.cache().member(directory.guild_id(), target) else {
            bot.platform()
                .send_message(reply_to, ":x: That user doesn't appear to be on the server.")
                .await?;
            return Ok(());
        };

        let mut roles = directory.member_roles(target).unwrap_or_default();
        roles.sort_by(|a, b| b.cmp(a));
        let roles = if roles.is_empty() {
            "None".to_string()
        } else {
            roles
                .iter()
                .map(|r| r.id.mention())
                .collect::<Vec<_>>()
                .join(", ")
        };

        bot.platform()
            .send_message(
                reply_to,
                &format!(
                    "**User info:** {}\n**ID:** `{}`\n**Roles:** {}",
                    member.user.name, member.user.id, roles
                ),
            )
            .await?;
        Ok(())
    }
}
