//! Platform implementation that records every outbound action.
//!
//! Actions are kept in memory and, when a writer is attached, emitted as one
//! JSON object per line. This is what `chat-warden run` talks to.

use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::error::PlatformError;
use crate::domain::moderation::Infraction;
use crate::domain::platform::{InfractionSink, Platform, PlatformResult};
use crate::domain::types::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::service::adapter;

const FIRST_MESSAGE_ID: u64 = 1 << 40;

/// An outbound action, as written to the output stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SendMessage {
        channel_id: ChannelId,
        message_id: MessageId,
        content: String,
    },
    DirectMessage {
        user_id: UserId,
        message_id: MessageId,
        content: String,
    },
    DeleteMessage {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    BulkDelete {
        channel_id: ChannelId,
        message_ids: Vec<MessageId>,
    },
    AddRole {
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    },
    RemoveRole {
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    },
    SetSendPermission {
        channel_id: ChannelId,
        role_id: RoleId,
        allow: Option<bool>,
    },
    Ban {
        guild_id: GuildId,
        user_id: UserId,
        reason: String,
    },
    Unban {
        guild_id: GuildId,
        user_id: UserId,
    },
    Infraction(Infraction),
}

#[derive(Default)]
struct State {
    actions: Vec<Action>,
    deleted: HashSet<(ChannelId, MessageId)>,
    banned: HashSet<(GuildId, UserId)>,
}

/// Records actions instead of calling a real platform.
pub struct RecordingPlatform {
    state: Mutex<State>,
    writer: Option<Mutex<Box<dyn Write + Send>>>,
    closed_dms: HashSet<UserId>,
    next_id: AtomicU64,
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            writer: None,
            closed_dms: HashSet::new(),
            next_id: AtomicU64::new(FIRST_MESSAGE_ID),
        }
    }

    /// Also write each action as a JSON line to `writer`.
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = Some(Mutex::new(writer));
        self
    }

    /// Reject direct messages to `user` with [`PlatformError::Forbidden`].
    pub fn with_closed_dms(mut self, user: UserId) -> Self {
        self.closed_dms.insert(user);
        self
    }

    /// Everything recorded so far, in order.
    pub async fn actions(&self) -> Vec<Action> {
        self.state.lock().await.actions.clone()
    }

    fn next_message_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn record(&self, action: Action) {
        debug!(?action, "Platform action");

        if let Some(writer) = &self.writer {
            match adapter::format_action(&action) {
                Ok(line) => {
                    let mut writer = writer.lock().await;
                    if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                        warn!(error = %e, "Failed to write action");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to serialize action"),
            }
        }

        self.state.lock().await.actions.push(action);
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<MessageId> {
        let message_id = self.next_message_id();
        self.record(Action::SendMessage {
            channel_id: channel,
            message_id,
            content: content.to_string(),
        })
        .await;
        Ok(message_id)
    }

    async fn send_direct_message(
        &self,
        user: UserId,
        content: &str,
    ) -> PlatformResult<MessageId> {
        if self.closed_dms.contains(&user) {
            return Err(PlatformError::Forbidden);
        }

        let message_id = self.next_message_id();
        self.record(Action::DirectMessage {
            user_id: user,
            message_id,
            content: content.to_string(),
        })
        .await;
        Ok(message_id)
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<()> {
        if !self.state.lock().await.deleted.insert((channel, message)) {
            return Err(PlatformError::NotFound);
        }

        self.record(Action::DeleteMessage {
            channel_id: channel,
            message_id: message,
        })
        .await;
        Ok(())
    }

    async fn bulk_delete(&self, channel: ChannelId, messages: &[MessageId]) -> PlatformResult<()> {
        let message_ids: Vec<MessageId> = {
            let mut state = self.state.lock().await;
            messages
                .iter()
                .copied()
                .filter(|id| state.deleted.insert((channel, *id)))
                .collect()
        };

        if message_ids.is_empty() {
            return Ok(());
        }

        self.record(Action::BulkDelete {
            channel_id: channel,
            message_ids,
        })
        .await;
        Ok(())
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> PlatformResult<()> {
        self.record(Action::AddRole {
            guild_id: guild,
            user_id: user,
            role_id: role,
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
        reason: &str,
    ) -> PlatformResult<()> {
        self.record(Action::RemoveRole {
            guild_id: guild,
            user_id: user,
            role_id: role,
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn set_send_permission(
        &self,
        channel: ChannelId,
        role: RoleId,
        allow: Option<bool>,
    ) -> PlatformResult<()> {
        self.record(Action::SetSendPermission {
            channel_id: channel,
            role_id: role,
            allow,
        })
        .await;
        Ok(())
    }

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> PlatformResult<()> {
        self.state.lock().await.banned.insert((guild, user));
        self.record(Action::Ban {
            guild_id: guild,
            user_id: user,
            reason: reason.to_string(),
        })
        .await;
        Ok(())
    }

    async fn unban(&self, guild: GuildId, user: UserId) -> PlatformResult<()> {
        if !self.state.lock().await.banned.remove(&(guild, user)) {
            return Err(PlatformError::NotFound);
        }

        self.record(Action::Unban {
            guild_id: guild,
            user_id: user,
        })
        .await;
        Ok(())
    }
}

#[async_trait]
impl InfractionSink for RecordingPlatform {
    async fn upsert(&self, infraction: &Infraction) -> anyhow::Result<()> {
        self.record(Action::Infraction(infraction.clone())).await;
        Ok(())
    }
}
