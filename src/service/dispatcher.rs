//! Routes one inbound event through the bot.

use tracing::debug;

use crate::domain::commands::Dispatch;
use crate::domain::types::Event;
use crate::service::bot::Bot;

/// Handle a single event: [`apply_state`], then [`route_event`].
pub async fn handle_event(bot: &Bot, event: &Event) {
    apply_state(bot, event).await;
    route_event(bot, event).await;
}

/// Update guild state and message history from `event`.
///
/// Runs in event order, before any handler sees the event.
pub async fn apply_state(bot: &Bot, event: &Event) {
    bot.cache().apply(event);

    match event {
        Event::Ready { self_id } => bot.set_self_id(*self_id),
        Event::MessageCreate(message) => bot.history().record(message).await,
        Event::MessageUpdate(message) => bot.history().update(message).await,
        Event::MessageDelete {
            channel_id,
            message_id,
        } => bot.history().remove(*channel_id, *message_id).await,
        Event::GuildCreate(_)
        | Event::RoleCreate { .. }
        | Event::RoleUpdate { .. }
        | Event::RoleDelete { .. }
        | Event::ChannelCreate(_)
        | Event::MemberUpdate(_) => {}
    }
}

/// Offer `event` to the command router and event handlers.
///
/// Only newly created messages can invoke commands; anything that isn't a
/// known command falls through to the event handlers (filters, antispam).
/// Edits and all other events go straight to the event handlers.
pub async fn route_event(bot: &Bot, event: &Event) {
    if bot.shutdown_token().is_cancelled() {
        debug!(event = %event, "Shutting down, event dropped");
        return;
    }

    if let Event::MessageCreate(_) = event {
        let outcome = bot
            .commands()
            .dispatch(bot, event, bot.directory(), bot.self_id())
            .await;

        match outcome {
            Dispatch::NotCommand | Dispatch::Unknown(_) => {}
            outcome => {
                debug!(event = %event, ?outcome, "Handled as command");
                return;
            }
        }
    }

    let handled = bot
        .events()
        .dispatch(bot, event, bot.directory(), bot.self_id())
        .await;
    debug!(event = %event, handled, "Event dispatched");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::domain::directory::ConfiguredRole;
    use crate::domain::moderation::InfractionKind;
    use crate::domain::types::{ChannelId, MessageId, UserId};
    use crate::service::memory::MemoryMessageHistory;
    use crate::service::recording::{Action, RecordingPlatform};
    use crate::test_support::{
        self, ADMIN, BOT_COMMANDS, GENERAL, MEMBER, MODERATOR, MODERATOR_LOG, VERIFICATION,
    };

    struct Harness {
        bot: Bot,
        platform: Arc<RecordingPlatform>,
    }

    impl Harness {
        async fn new() -> Self {
            let config = test_support::config();
            let platform = Arc::new(RecordingPlatform::new());
            let history = Arc::new(MemoryMessageHistory::new(config.antispam.max_window()));
            let bot = Bot::new(
                config,
                test_support::cache(),
                platform.clone(),
                history,
                platform.clone(),
            )
            .unwrap();

            handle_event(
                &bot,
                &Event::Ready {
                    self_id: test_support::SELF,
                },
            )
            .await;
            Self { bot, platform }
        }

        async fn say(&self, id: u64, author: UserId, content: &str) {
            self.say_at(id, author, content, 0).await;
        }

        async fn say_at(&self, id: u64, author: UserId, content: &str, secs: i64) {
            let message = test_support::message_at(id, author, content, secs);
            handle_event(&self.bot, &Event::MessageCreate(message)).await;
        }

        async fn say_in(&self, id: u64, author: UserId, channel: ChannelId, content: &str) {
            let mut message = test_support::message(id, author, content);
            message.channel_id = channel;
            handle_event(&self.bot, &Event::MessageCreate(message)).await;
        }

        async fn sent_to(&self, channel: ChannelId) -> Vec<String> {
            self.platform
                .actions()
                .await
                .into_iter()
                .filter_map(|action| match action {
                    Action::SendMessage {
                        channel_id,
                        content,
                        ..
                    } if channel_id == channel => Some(content),
                    _ => None,
                })
                .collect()
        }

        async fn replies(&self) -> Vec<String> {
            self.sent_to(GENERAL).await
        }

        async fn logs(&self) -> Vec<String> {
            self.sent_to(MODERATOR_LOG).await
        }

        fn is_muted(&self, user: UserId) -> bool {
            self.bot.directory().has_role(user, ConfiguredRole::Muted)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_mute_expires() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!mute <@1000> 10m being rude").await;

        assert!(harness.is_muted(MEMBER));
        assert_eq!(harness.replies().await, vec![":mute: Muted <@1000> (0:10:00)."]);
        assert_eq!(
            harness.logs().await,
            vec!["**Muted:** <@1000> by <@1001> (0:10:00): being rude"]
        );

        let actions = harness.platform.actions().await;
        assert!(matches!(
            &actions[0],
            Action::Infraction(infraction)
                if infraction.kind == InfractionKind::Mute && infraction.target == MEMBER
        ));
        assert!(harness.bot.punishments().pending_unmute(MEMBER).is_some());

        tokio::time::sleep(Duration::from_secs(601)).await;

        assert!(!harness.is_muted(MEMBER));
        assert!(harness.bot.punishments().pending_unmute(MEMBER).is_none());
        assert_eq!(
            harness.logs().await.last().map(String::as_str),
            Some("**Unmuted:** <@1000> (Mute expired)")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmute_finishes_the_pending_reversal() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!mute <@1000> 1h").await;
        harness.say(2, MODERATOR, "!unmute <@1000>").await;

        assert!(!harness.is_muted(MEMBER));
        assert_eq!(harness.bot.scheduler().pending().await, 0);
        assert_eq!(
            harness.replies().await.last().map(String::as_str),
            Some(":speaker: Unmuted <@1000>.")
        );

        let removals = harness
            .platform
            .actions()
            .await
            .into_iter()
            .filter(|a| matches!(a, Action::RemoveRole { .. }))
            .count();
        assert_eq!(removals, 1);

        harness.say(3, MODERATOR, "!unmute <@1000>").await;
        assert_eq!(
            harness.replies().await.last().map(String::as_str),
            Some(":x: <@1000> is not muted.")
        );
    }

    #[tokio::test]
    async fn test_commands_require_their_role() {
        let harness = Harness::new().await;
        harness.say(1, MEMBER, "!ban <@1001> 1d").await;
        harness.say(2, MODERATOR, "!toggle ban").await;

        assert!(harness.platform.actions().await.is_empty());
        assert!(harness.bot.commands().resolve("ban").unwrap().is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_ban_is_lifted() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!ban <@1000> 1d spamming").await;

        assert!(harness.platform.actions().await.contains(&Action::Ban {
            guild_id: test_support::GUILD,
            user_id: MEMBER,
            reason: "spamming".to_string(),
        }));
        assert!(harness.bot.punishments().pending_unban(MEMBER).is_some());

        tokio::time::sleep(Duration::from_secs(24 * 3600 + 1)).await;

        assert!(harness.platform.actions().await.contains(&Action::Unban {
            guild_id: test_support::GUILD,
            user_id: MEMBER,
        }));
        assert_eq!(
            harness.logs().await,
            vec![
                "**Banned:** <@1000> by <@1001> (24:00:00): spamming",
                "**Unbanned:** <@1000> (Ban expired)",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_and_unsilence() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!silence 5 m").await;
        harness.say(2, MODERATOR, "!shh").await;

        assert!(harness.bot.silences().is_silenced(GENERAL));
        assert_eq!(
            harness.replies().await,
            vec![
                ":lock: :hourglass: Successfully silenced channel for 0:05:00.",
                ":x: Channel is already silenced.",
            ]
        );

        harness.say(3, MODERATOR, "!unsilence").await;
        harness.say(4, MODERATOR, "!unhush").await;

        assert!(!harness.bot.silences().is_silenced(GENERAL));
        assert_eq!(harness.bot.scheduler().pending().await, 0);

        let permissions: Vec<Option<bool>> = harness
            .platform
            .actions()
            .await
            .into_iter()
            .filter_map(|a| match a {
                Action::SetSendPermission {
                    channel_id,
                    role_id,
                    allow,
                } if channel_id == GENERAL && role_id == test_support::DEVELOPER_ROLE => Some(allow),
                _ => None,
            })
            .collect();
        assert_eq!(permissions, vec![Some(false), Some(true)]);

        let replies = harness.replies().await;
        assert_eq!(
            &replies[2..],
            &[
                ":unlock: Channel unsilenced successfully.".to_string(),
                ":x: Channel is not silenced. Can't unsilence.".to_string(),
            ]
        );
        assert_eq!(
            harness.logs().await.last().map(String::as_str),
            Some("**Channel unsilenced:** <#104> by <@1001>")
        );
    }

    #[tokio::test]
    async fn test_silence_rejects_unknown_units() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!silence 5x").await;

        assert_eq!(harness.replies().await, vec![":x: Invalid time unit `x`"]);
        assert!(!harness.bot.silences().is_silenced(GENERAL));
    }

    #[tokio::test]
    async fn test_untimed_silence_is_reported_at_shutdown() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!silence").await;

        assert_eq!(
            harness.replies().await,
            vec![":lock: Successfully silenced channel for undefined time."]
        );
        assert_eq!(harness.bot.silences().silenced(), vec![GENERAL]);
        assert_eq!(
            harness.logs().await,
            vec!["**Channel silenced:** <#104> by <@1001> for Forever"]
        );
    }

    #[tokio::test]
    async fn test_antispam_mutes_and_cleans_up() {
        let harness = Harness::new().await;
        for i in 0..4 {
            harness.say_at(i + 1, MEMBER, "buy now", i as i64).await;
        }

        assert!(harness.is_muted(MEMBER));
        let actions = harness.platform.actions().await;
        assert_eq!(
            actions[0],
            Action::BulkDelete {
                channel_id: GENERAL,
                message_ids: (1..=4).map(MessageId).collect(),
            }
        );
        assert!(matches!(
            &actions[1],
            Action::Infraction(infraction)
                if infraction.actor == test_support::SELF
                    && infraction.reason == "Antispam: sent 4 of the same message in 10 seconds."
        ));
        assert_eq!(
            harness.replies().await,
            vec![":warning: **Antispam:** <@1000> sent 4 of the same message in 10 seconds."]
        );

        // Already muted: no second punishment
        harness.say_at(5, MEMBER, "buy now", 4).await;
        assert_eq!(harness.platform.actions().await.len(), actions.len());
    }

    #[tokio::test]
    async fn test_moderators_are_exempt_from_antispam() {
        let harness = Harness::new().await;
        for i in 0..6 {
            harness.say_at(i + 1, MODERATOR, "buy now", i as i64).await;
        }

        assert!(harness.platform.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_still_runs_filters() {
        let harness = Harness::new().await;
        harness.say(1, MEMBER, "!nope discord.gg/spam").await;

        let actions = harness.platform.actions().await;
        assert_eq!(
            actions[0],
            Action::DeleteMessage {
                channel_id: GENERAL,
                message_id: MessageId(1),
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_and_help() {
        let harness = Harness::new().await;
        harness.say(1, ADMIN, "!toggle mute").await;
        harness.say(2, ADMIN, "!mute <@1000>").await;
        harness.say(3, ADMIN, "!toggle toggle").await;
        harness.say(4, MEMBER, "!h").await;
        harness.say(5, MEMBER, "!help hush").await;

        assert!(!harness.is_muted(MEMBER));

        let replies = harness.replies().await;
        assert_eq!(replies[0], ":white_check_mark: Command `mute` is now disabled.");
        assert_eq!(replies[1], ":x: `toggle` can't be disabled.");

        let summary = &replies[2];
        assert!(summary.starts_with("**Command Help**\n\n`!ban <user> [duration] [reason...]`"));
        assert!(!summary.contains("!mute"));
        assert!(!summary.contains("!silence"));
        assert!(summary.contains("`!unsilence`"));

        assert!(replies[3].contains("`!silence [duration]`"));
        assert!(replies[3].contains("Aliases: hush, shh"));
    }

    #[tokio::test]
    async fn test_overlong_durations_are_refused() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!silence 100000000w").await;
        harness.say(2, MODERATOR, "!mute <@1000> 100000000w").await;

        assert_eq!(
            harness.replies().await,
            vec![
                ":x: Duration is too long, the maximum is 3650 days",
                ":x: Duration is too long, the maximum is 3650 days",
            ]
        );
        assert!(!harness.bot.silences().is_silenced(GENERAL));
        assert!(!harness.is_muted(MEMBER));
        assert_eq!(harness.bot.scheduler().pending().await, 0);
        assert!(harness
            .platform
            .actions()
            .await
            .iter()
            .all(|a| matches!(a, Action::SendMessage { .. })));
    }

    #[tokio::test]
    async fn test_edited_command_runs_once() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "!ban <@1000> spam").await;

        let edited = test_support::message(1, MODERATOR, "!ban <@1000> spamming");
        handle_event(&harness.bot, &Event::MessageUpdate(edited)).await;

        let bans = harness
            .platform
            .actions()
            .await
            .into_iter()
            .filter(|a| matches!(a, Action::Ban { .. }))
            .count();
        assert_eq!(bans, 1);
    }

    #[tokio::test]
    async fn test_staff_are_exempt_from_filters() {
        let harness = Harness::new().await;
        harness.say(1, MODERATOR, "join discord.gg/spam").await;
        harness.say(2, ADMIN, "discord.gg/other").await;

        assert!(harness.platform.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_state_is_applied_in_event_order() {
        let harness = Harness::new().await;
        let message = test_support::message(1, MEMBER, "hello");

        apply_state(&harness.bot, &Event::MessageCreate(message)).await;
        apply_state(
            &harness.bot,
            &Event::MessageDelete {
                channel_id: GENERAL,
                message_id: MessageId(1),
            },
        )
        .await;

        assert!(harness.bot.history().find(MessageId(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_clean_by_user_and_count() {
        let harness = Harness::new().await;
        for i in 1..=3 {
            harness.say_at(i, MEMBER, &format!("hello {}", i), i as i64 * 20).await;
        }
        harness.say_at(4, MODERATOR, "ok", 80).await;
        harness
            .say_at(5, MODERATOR, "!clean user=<@1000> count=2", 100)
            .await;

        assert_eq!(
            harness.platform.actions().await[0],
            Action::BulkDelete {
                channel_id: GENERAL,
                message_ids: vec![MessageId(2), MessageId(3)],
            }
        );
        assert_eq!(
            harness.logs().await,
            vec!["**Cleaned:** 2 message(s) in <#104> by <@1001>"]
        );

        let left: Vec<MessageId> = harness
            .bot
            .history()
            .in_channel(GENERAL)
            .await
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(left, vec![MessageId(1), MessageId(4), MessageId(5)]);
    }

    #[tokio::test]
    async fn test_clean_rejects_in_with_since() {
        let harness = Harness::new().await;
        harness.say(1, MEMBER, "hello").await;
        harness.say(2, MODERATOR, "!clear since=1 in=<#104>").await;
        harness.say(3, MEMBER, "!c").await;

        assert_eq!(
            harness.replies().await,
            vec![":x: Cannot use the `in` and `since` options together."]
        );
        assert!(!harness
            .platform
            .actions()
            .await
            .iter()
            .any(|a| matches!(a, Action::BulkDelete { .. })));
    }

    #[tokio::test]
    async fn test_clean_limit_needs_an_admin_and_force() {
        let harness = Harness::new().await;
        for i in 1..=55 {
            harness.say_at(i, MEMBER, &format!("message {}", i), i as i64 * 20).await;
        }
        harness.say_at(100, MODERATOR, "!clean", 2000).await;
        harness.say_at(101, ADMIN, "!clean", 2001).await;
        harness.say_at(102, ADMIN, "!clean force=true", 2002).await;

        assert_eq!(
            harness.replies().await,
            vec![
                ":x: Cannot delete more than 50, please ask an admin to run this command \
                 with the `force=true` flag.",
                ":x: Cannot delete more than 50, run this command with the `force=true` \
                 flag to force it.",
            ]
        );

        let deleted: Vec<usize> = harness
            .platform
            .actions()
            .await
            .into_iter()
            .filter_map(|a| match a {
                Action::BulkDelete { message_ids, .. } => Some(message_ids.len()),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![58]);
        assert_eq!(
            harness.logs().await,
            vec!["**Cleaned:** 58 message(s) in <#104> by <@1002>"]
        );
        assert!(harness.bot.history().in_channel(GENERAL).await.is_empty());
    }

    #[tokio::test]
    async fn test_verification() {
        let harness = Harness::new().await;
        harness.say_in(1, MEMBER, VERIFICATION, "hello").await;

        assert_eq!(
            harness.sent_to(VERIFICATION).await,
            vec!["<@1000> Please send `!verify` to gain access to the rest of the server."]
        );
        assert!(harness.platform.actions().await.contains(&Action::DeleteMessage {
            channel_id: VERIFICATION,
            message_id: MessageId(1),
        }));

        harness.say_in(2, MEMBER, VERIFICATION, "!verify").await;

        assert!(harness
            .bot
            .directory()
            .has_role(MEMBER, ConfiguredRole::Developer));
        let actions = harness.platform.actions().await;
        assert!(actions.contains(&Action::DeleteMessage {
            channel_id: VERIFICATION,
            message_id: MessageId(2),
        }));
        assert!(actions.contains(&Action::AddRole {
            guild_id: test_support::GUILD,
            user_id: MEMBER,
            role_id: test_support::DEVELOPER_ROLE,
            reason: "Verified".to_string(),
        }));
        assert_eq!(
            harness.logs().await,
            vec!["**Verified:** <@1000> (`user1000`, `1000`)"]
        );

        // Verified members may talk
        let before = actions.len();
        harness.say_in(3, MEMBER, VERIFICATION, "thanks").await;
        harness.say_in(4, ADMIN, VERIFICATION, "welcome").await;
        assert_eq!(harness.platform.actions().await.len(), before);
    }

    #[tokio::test]
    async fn test_user_info() {
        let harness = Harness::new().await;
        harness.say(1, MEMBER, "!user").await;

        assert_eq!(
            harness.replies().await,
            vec!["<@1000> Please use <#102> for this command."]
        );
        assert!(harness.platform.actions().await.contains(&Action::DeleteMessage {
            channel_id: GENERAL,
            message_id: MessageId(1),
        }));

        harness.say_in(2, MEMBER, BOT_COMMANDS, "!u").await;
        harness.say_in(3, MEMBER, BOT_COMMANDS, "!user <@1002>").await;
        assert_eq!(
            harness.sent_to(BOT_COMMANDS).await,
            vec![
                "**User info:** user1000\n**ID:** `1000`\n**Roles:** None",
                ":x: Only staff members may request information about other users.",
            ]
        );

        harness.say(4, MODERATOR, "!user <@1002>").await;
        harness.say(5, MODERATOR, "!u 4242").await;
        let replies = harness.replies().await;
        assert_eq!(
            &replies[1..],
            &[
                "**User info:** user1002\n**ID:** `1002`\n**Roles:** <@&11>, <@&12>".to_string(),
                ":x: That user doesn't appear to be on the server.".to_string(),
            ]
        );
    }
}
