//! Shared fixtures for unit tests: one guild with the configured roles,
//! channels and a few members.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::config::{ChannelsConfig, Config, RolesConfig};
use crate::domain::types::{
    Channel, ChannelId, ChannelKind, GuildId, GuildSnapshot, Member, Message, MessageId, Role,
    RoleId, User, UserId,
};
use crate::domain::moderation::ActionScheduler;
use crate::domain::notify::Notifier;
use crate::domain::Directory;
use crate::service::{MemoryGuildCache, RecordingPlatform};

pub const GUILD: GuildId = GuildId(1);

pub const ADMIN_ROLE: RoleId = RoleId(11);
pub const MODERATOR_ROLE: RoleId = RoleId(12);
pub const HELPER_ROLE: RoleId = RoleId(13);
pub const DEVELOPER_ROLE: RoleId = RoleId(14);
pub const MUTED_ROLE: RoleId = RoleId(15);

pub const ALERTS: ChannelId = ChannelId(100);
pub const MODERATOR_LOG: ChannelId = ChannelId(101);
pub const BOT_COMMANDS: ChannelId = ChannelId(102);
pub const VERIFICATION: ChannelId = ChannelId(103);
pub const GENERAL: ChannelId = ChannelId(104);

pub const SELF: UserId = UserId(999);
/// Holds no roles.
pub const MEMBER: UserId = UserId(1000);
pub const MODERATOR: UserId = UserId(1001);
/// Admin and moderator.
pub const ADMIN: UserId = UserId(1002);

pub fn config() -> Config {
    Config {
        guild_id: GUILD.get(),
        roles: RolesConfig {
            admin: ADMIN_ROLE.get(),
            moderator: MODERATOR_ROLE.get(),
            helper: HELPER_ROLE.get(),
            developer: DEVELOPER_ROLE.get(),
            muted: MUTED_ROLE.get(),
        },
        channels: ChannelsConfig {
            alerts: ALERTS.get(),
            moderator_log: MODERATOR_LOG.get(),
            bot_commands: BOT_COMMANDS.get(),
            verification: VERIFICATION.get(),
        },
        ..Config::default()
    }
}

pub fn role(id: RoleId, name: &str, position: i64) -> Role {
    Role {
        id,
        name: name.to_string(),
        position,
    }
}

pub fn user(id: UserId) -> User {
    User {
        id,
        name: format!("user{}", id),
        bot: false,
    }
}

fn channel(id: ChannelId, name: &str) -> Channel {
    Channel {
        id,
        guild_id: Some(GUILD),
        name: name.to_string(),
        kind: ChannelKind::GuildText,
        position: id.get() as i64,
    }
}

fn member(id: UserId, roles: Vec<RoleId>) -> Member {
    Member {
        guild_id: GUILD,
        user: user(id),
        roles,
    }
}

pub fn snapshot() -> GuildSnapshot {
    GuildSnapshot {
        id: GUILD,
        name: "test guild".to_string(),
        roles: vec![
            role(ADMIN_ROLE, "Admin", 5),
            role(MODERATOR_ROLE, "Moderator", 4),
            role(HELPER_ROLE, "Helper", 3),
            role(DEVELOPER_ROLE, "Developer", 1),
            role(MUTED_ROLE, "Muted", 2),
        ],
        channels: vec![
            channel(ALERTS, "alerts"),
            channel(MODERATOR_LOG, "moderator-log"),
            channel(BOT_COMMANDS, "bot-commands"),
            channel(VERIFICATION, "verification"),
            channel(GENERAL, "general"),
        ],
        members: vec![
            member(SELF, Vec::new()),
            member(MEMBER, Vec::new()),
            member(MODERATOR, vec![MODERATOR_ROLE]),
            member(ADMIN, vec![ADMIN_ROLE, MODERATOR_ROLE]),
        ],
    }
}

pub fn cache() -> Arc<MemoryGuildCache> {
    let cache = MemoryGuildCache::new();
    cache.insert_guild(&snapshot());
    Arc::new(cache)
}

pub fn directory() -> Directory {
    Directory::new(Arc::new(config()), cache())
}

/// A notifier over `platform` that removes in-channel notices after 10s.
pub fn notifier(platform: Arc<RecordingPlatform>) -> Notifier {
    Notifier::new(
        platform,
        directory(),
        Arc::new(ActionScheduler::new()),
        Duration::from_secs(10),
    )
}

/// A fixed instant plus `secs`.
pub fn at(secs: i64) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(1_700_000_000 + secs)
}

/// A message in #general at [`at(0)`](at).
pub fn message(id: u64, author: UserId, content: &str) -> Message {
    message_at(id, author, content, 0)
}

pub fn message_at(id: u64, author: UserId, content: &str, secs: i64) -> Message {
    Message {
        id: MessageId(id),
        channel_id: GENERAL,
        guild_id: Some(GUILD),
        author: user(author),
        content: content.to_string(),
        embeds: Vec::new(),
        attachments: Vec::new(),
        mentions: Vec::new(),
        mention_roles: Vec::new(),
        timestamp: at(secs),
    }
}
