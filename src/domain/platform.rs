//! Collaborator interfaces the core calls out to.
//!
//! The chat platform's REST surface, the recent-message cache and the
//! moderation record sink all live outside this crate; these traits are the
//! seams they plug into.

use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::error::PlatformError;
use crate::domain::moderation::Infraction;
use crate::domain::types::{ChannelId, GuildId, Message, MessageId, RoleId, UserId};

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Outbound actions against the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<MessageId>;

    /// Fails with [`PlatformError::Forbidden`] when the user doesn't accept
    /// direct messages.
    async fn send_direct_message(&self, user: UserId, content: &str)
        -> PlatformResult<MessageId>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()>;

    async fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> PlatformResult<()>;

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> PlatformResult<()>;

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> PlatformResult<()>;

    /// Set the send-messages overwrite for `role` in `channel`.
    ///
    /// `Some(false)` denies, `Some(true)` allows, `None` clears the overwrite.
    async fn set_send_permission(
        &self,
        channel: ChannelId,
        role: RoleId,
        allow: Option<bool>,
    ) -> PlatformResult<()>;

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()>;

    async fn unban(&self, guild: GuildId, user: UserId) -> PlatformResult<()>;
}

/// Recently seen messages, used by the antispam rules and `clean`.
#[async_trait]
pub trait MessageHistory: Send + Sync {
    /// Remember a newly created message.
    async fn record(&self, message: &Message);

    /// Replace the stored copy of an edited message.
    async fn update(&self, message: &Message);

    async fn remove(&self, channel: ChannelId, message: MessageId);

    /// Messages by `author` with a timestamp in `(until - window, until]`,
    /// oldest first.
    async fn recent(&self, author: UserId, window: Duration, until: OffsetDateTime)
        -> Vec<Message>;

    /// Cached messages in `channel`, oldest first.
    async fn in_channel(&self, channel: ChannelId) -> Vec<Message>;

    /// A cached message by id, in any channel.
    async fn find(&self, message: MessageId) -> Option<Message>;
}

/// Receives moderation records.
#[async_trait]
pub trait InfractionSink: Send + Sync {
    async fn upsert(&self, infraction: &Infraction) -> anyhow::Result<()>;
}
