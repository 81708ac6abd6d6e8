//! `clean` command: bulk removal of recent messages.
//!
//! Options are `key=value` tokens (`key:value` also works):
//!
//! - `user`: authors, by mention, id or name. Quote to pass several.
//! - `regex`: content must fully match. May be given more than once.
//! - `in`: channels to clean, defaulting to the current one.
//! - `since`: the oldest message to remove; cleans that message's channel.
//! - `botonly`: only messages from bots.
//! - `count`: only the newest N matching messages.
//! - `force`: allow more than [`MAX_DELETION_SIZE`] messages (admins only).
//!
//! Messages are taken from the recent message cache, so only what the bot
//! has seen can be removed.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::{default_check, has_role};
use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::domain::directory::ConfiguredRole;
use crate::domain::parser::{parse_channel, parse_user};
use crate::domain::types::{ChannelId, Message, MessageId, UserId};
use crate::service::bot::Bot;

/// Most messages removed per channel without `force`.
pub const MAX_DELETION_SIZE: usize = 50;

/// Most messages one bulk delete call accepts.
const BULK_DELETE_LIMIT: usize = 100;

/// `since` reaches this far before the given message's timestamp.
const SINCE_OFFSET: Duration = Duration::from_millis(100);

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new("clean", CleanCommand)
            .alias("clear")
            .alias("c")
            .checks([default_check(), has_role(ConfiguredRole::Moderator)])
            .signature("[user=...] [regex=...] [in=...] [since=...] [botonly=...] [count=...] [force=...]")
            .help(
                "Delete messages in bulk. Filter by `user`, `regex`, `botonly` and \
                 `count`, pick channels with `in` or start from a message with \
                 `since`. Admins may `force` deleting more than 50 messages.",
            )
            .hidden(),
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Author {
    Id(UserId),
    /// Lower-cased user name.
    Name(String),
}

impl Author {
    fn parse(text: &str) -> Self {
        parse_user(text).map_or_else(|| Self::Name(text.to_lowercase()), Self::Id)
    }

    fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Id(id) => message.author.id == *id,
            Self::Name(name) => message.author.name.to_lowercase() == *name,
        }
    }
}

#[derive(Debug, Default)]
struct CleanArgs {
    users: Vec<Author>,
    regexes: Vec<Regex>,
    channels: Vec<ChannelId>,
    since: Option<MessageId>,
    bot_only: bool,
    count: Option<usize>,
    force: bool,
}

impl CleanArgs {
    /// Parse option tokens. The error is the reply for the user.
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Self::default();

        for arg in args {
            let Some((key, value)) = arg.split_once(|c: char| c == '=' || c == ':') else {
                return Err(format!("Expected `option=value`, got `{}`", arg));
            };
            let invalid = || format!("Invalid value for `{}`: `{}`", key, value);

            match key.to_lowercase().as_str() {
                "user" => parsed.users.extend(list(value).map(Author::parse)),
                "regex" => {
                    let regex = Regex::new(&format!("^(?:{})$", value)).map_err(|_| invalid())?;
                    parsed.regexes.push(regex);
                }
                "in" => {
                    for channel in list(value) {
                        parsed.channels.push(parse_channel(channel).ok_or_else(invalid)?);
                    }
                }
                "since" => {
                    let id = value.parse::<u64>().map_err(|_| invalid())?;
                    parsed.since = Some(MessageId(id));
                }
                "botonly" => parsed.bot_only = flag(value).ok_or_else(invalid)?,
                "count" => match value.parse::<usize>() {
                    Ok(count) if count > 0 => parsed.count = Some(count),
                    _ => return Err(invalid()),
                },
                "force" => parsed.force = flag(value).ok_or_else(invalid)?,
                _ => return Err(format!("Unknown option `{}`", key)),
            }
        }

        Ok(parsed)
    }

    fn matches(&self, message: &Message, since: Option<OffsetDateTime>) -> bool {
        (self.users.is_empty() || self.users.iter().any(|u| u.matches(message)))
            && (!self.bot_only || message.author.bot)
            && self.regexes.iter().all(|r| r.is_match(&message.content))
            && since.map_or(true, |since| message.timestamp > since)
    }

    /// Pick the messages to remove from a channel's cached messages, oldest
    /// first.
    fn select(&self, messages: Vec<Message>, since: Option<OffsetDateTime>) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = messages
            .iter()
            .filter(|m| self.matches(m, since))
            .map(|m| m.id)
            .collect();
        if let Some(count) = self.count {
            ids.drain(..ids.len().saturating_sub(count));
        }
        ids
    }
}

/// Values separated by whitespace or commas.
fn list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

fn flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

struct CleanCommand;

#[async_trait]
impl CommandHandler<Bot> for CleanCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let reply_to = inv.message.channel_id;
        let platform = bot.platform();

        let args = match CleanArgs::parse(inv.args) {
            Ok(args) => args,
            Err(reply) => {
                platform.send_message(reply_to, &format!(":x: {}", reply)).await?;
                return Ok(());
            }
        };

        let (channels, since) = match args.since {
            Some(_) if !args.channels.is_empty() => {
                platform
                    .send_message(reply_to, ":x: Cannot use the `in` and `since` options together.")
                    .await?;
                return Ok(());
            }
            Some(id) => match bot.history().find(id).await {
                Some(message) => (vec![message.channel_id], Some(message.timestamp - SINCE_OFFSET)),
                None => {
                    platform
                        .send_message(reply_to, &format!(":x: Unknown message `{}`.", id))
                        .await?;
                    return Ok(());
                }
            },
            None if args.channels.is_empty() => (vec![reply_to], None),
            None => (args.channels.clone(), None),
        };

        let moderator = inv.message.author.id;
        let is_admin = bot.directory().has_role(moderator, ConfiguredRole::Admin);
        debug!(?args, ?channels, "Cleaning");

        let mut cleaned = Vec::new();
        let mut total = 0;
        for channel in channels {
            if bot.directory().cache().channel(channel).is_none() {
                warn!(channel = %channel, "Unknown channel, not cleaning");
                continue;
            }

            let ids = args.select(bot.history().in_channel(channel).await, since);
            if ids.len() > MAX_DELETION_SIZE && !(is_admin && args.force) {
                let reply = if is_admin {
                    format!(
                        ":x: Cannot delete more than {}, run this command with the \
                         `force=true` flag to force it.",
                        MAX_DELETION_SIZE
                    )
                } else {
                    format!(
                        ":x: Cannot delete more than {}, please ask an admin to run this \
                         command with the `force=true` flag.",
                        MAX_DELETION_SIZE
                    )
                };
                platform.send_message(reply_to, &reply).await?;
                return Ok(());
            }

            for chunk in ids.chunks(BULK_DELETE_LIMIT) {
                platform.bulk_delete(channel, chunk).await?;
            }
            for id in &ids {
                bot.history().remove(channel, *id).await;
            }

            total += ids.len();
            cleaned.push(channel.mention());
        }

        bot.notifier()
            .send_log(&format!(
                "**Cleaned:** {} message(s) in {} by {}",
                total,
                cleaned.join(", "),
                moderator.mention()
            ))
            .await?;

        info!(total, moderator = %moderator, "Messages cleaned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::User;
    use crate::test_support;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn by(id: u64, name: &str, bot: bool, content: &str, secs: i64) -> Message {
        let mut message = test_support::message_at(id, UserId(id * 10), content, secs);
        message.author = User {
            id: UserId(id * 10),
            name: name.to_string(),
            bot,
        };
        message
    }

    #[test]
    fn test_parse_options() {
        let parsed = CleanArgs::parse(&args(&[
            "user=alice <@42>",
            "in=<#104>,105",
            "botonly:true",
            "count=5",
            "regex=spam.*",
        ]))
        .unwrap();

        assert_eq!(
            parsed.users,
            vec![Author::Name("alice".to_string()), Author::Id(UserId(42))]
        );
        assert_eq!(parsed.channels, vec![ChannelId(104), ChannelId(105)]);
        assert!(parsed.bot_only);
        assert!(!parsed.force);
        assert_eq!(parsed.count, Some(5));
        assert_eq!(parsed.regexes.len(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            CleanArgs::parse(&args(&["count=0"])).unwrap_err(),
            "Invalid value for `count`: `0`"
        );
        assert_eq!(
            CleanArgs::parse(&args(&["colour=red"])).unwrap_err(),
            "Unknown option `colour`"
        );
        assert_eq!(
            CleanArgs::parse(&args(&["alice"])).unwrap_err(),
            "Expected `option=value`, got `alice`"
        );
        assert!(CleanArgs::parse(&args(&["regex=(open"])).is_err());
        assert!(CleanArgs::parse(&args(&["force=maybe"])).is_err());
    }

    #[test]
    fn test_select_filters_and_counts() {
        let messages = vec![
            by(1, "alice", false, "spam one", 0),
            by(2, "bob", false, "spam two", 1),
            by(3, "alice", false, "hello", 2),
            by(4, "alice", false, "spam three", 3),
            by(5, "bot", true, "spam four", 4),
        ];

        let parsed = CleanArgs::parse(&args(&["user=alice bob", "regex=spam.*"])).unwrap();
        let ids = parsed.select(messages.clone(), None);
        assert_eq!(ids, vec![MessageId(1), MessageId(2), MessageId(4)]);

        let parsed = CleanArgs::parse(&args(&["count=2"])).unwrap();
        assert_eq!(parsed.select(messages.clone(), None), vec![MessageId(4), MessageId(5)]);

        let parsed = CleanArgs::parse(&args(&["botonly=yes"])).unwrap();
        assert_eq!(parsed.select(messages.clone(), None), vec![MessageId(5)]);

        let since = Some(test_support::at(3) - SINCE_OFFSET);
        let parsed = CleanArgs::default();
        assert_eq!(parsed.select(messages, since), vec![MessageId(4), MessageId(5)]);
    }

    #[test]
    fn test_regex_must_match_whole_content() {
        let parsed = CleanArgs::parse(&args(&["regex=spam"])).unwrap();
        let messages = vec![by(1, "a", false, "spam", 0), by(2, "a", false, "spam!", 0)];
        assert_eq!(parsed.select(messages, None), vec![MessageId(1)]);
    }
}
