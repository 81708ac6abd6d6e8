//! Staff alerts, moderation log entries and user notifications.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::directory::{ConfiguredChannel, ConfiguredRole, Directory};
use crate::domain::error::{PlatformError, Result};
use crate::domain::moderation::{ActionScheduler, PendingAction};
use crate::domain::platform::Platform;
use crate::domain::types::{ChannelId, ChannelKind, Message, MessageId};

/// Appended to every reason sent to a user.
pub const MISTAKE_MESSAGE: &str =
    "If you feel that this was a mistake, please feel free to contact a member of staff.";

/// Where a user notification ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Direct(MessageId),
    /// Posted in the original channel, deletion scheduled.
    Channel(MessageId),
}

/// Sends the messages that make moderation visible.
#[derive(Clone)]
pub struct Notifier {
    platform: Arc<dyn Platform>,
    directory: Directory,
    scheduler: Arc<ActionScheduler>,
    delete_after: Duration,
}

impl Notifier {
    pub fn new(
        platform: Arc<dyn Platform>,
        directory: Directory,
        scheduler: Arc<ActionScheduler>,
        delete_after: Duration,
    ) -> Self {
        Self {
            platform,
            directory,
            scheduler,
            delete_after,
        }
    }

    /// Post to the alerts channel, optionally prefixed with a moderator mention.
    pub async fn send_alert(&self, content: &str, mention: bool) -> Result<MessageId> {
        let channel = self.directory.channel(ConfiguredChannel::Alerts)?;
        let content = if mention {
            let moderators = self.directory.role_id(ConfiguredRole::Moderator);
            format!("{} {}", moderators.mention(), content)
        } else {
            content.to_string()
        };

        Ok(self.platform.send_message(channel.id, &content).await?)
    }

    /// Post to the moderator log channel.
    pub async fn send_log(&self, content: &str) -> Result<MessageId> {
        let channel = self.directory.channel(ConfiguredChannel::ModeratorLog)?;
        Ok(self.platform.send_message(channel.id, content).await?)
    }

    /// Tell the author of `message` why it was actioned.
    ///
    /// Direct messages are tried first. If the user doesn't accept them, the
    /// notice is posted in the message's channel with a mention and removed
    /// again after the configured delay.
    pub async fn send_notification(&self, message: &Message, reason: &str) -> Result<Delivery> {
        let content = format!("{}\n\n{}", reason, MISTAKE_MESSAGE);

        match self
            .platform
            .send_direct_message(message.author.id, &content)
            .await
        {
            Ok(id) => Ok(Delivery::Direct(id)),
            Err(PlatformError::Forbidden) => {
                debug!(user = %message.author.id, "Direct messages closed, notifying in channel");

                let content = format!("{} {}", message.author.mention(), content);
                let id = self.post_temporary(message.channel_id, &content).await?;

                Ok(Delivery::Channel(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Post `content` in `channel` and remove it again after the configured
    /// delay.
    pub async fn post_temporary(&self, channel: ChannelId, content: &str) -> Result<MessageId> {
        let id = self.platform.send_message(channel, content).await?;
        self.delete_later(channel, id).await;
        Ok(id)
    }

    /// Delete a message, treating "already gone" as success.
    pub async fn delete_ignoring_not_found(&self, message: &Message) -> Result<()> {
        match self
            .platform
            .delete_message(message.channel_id, message.id)
            .await
        {
            Ok(()) | Err(PlatformError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Describe where a message was posted, for audit records.
    pub fn describe_origin(&self, message: &Message) -> String {
        let channel = self.directory.cache().channel(message.channel_id);
        match channel {
            Some(channel) if channel.kind != ChannelKind::Dm => {
                format!("in {}", channel.id.mention())
            }
            Some(_) => "in a DM".to_string(),
            None if message.guild_id.is_none() => "in a DM".to_string(),
            None => format!("in {}", message.channel_id.mention()),
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub fn scheduler(&self) -> &Arc<ActionScheduler> {
        &self.scheduler
    }

    async fn delete_later(&self, channel: ChannelId, message: MessageId) {
        let platform = Arc::clone(&self.platform);
        self.scheduler
            .schedule(
                self.delete_after,
                PendingAction::DeleteMessage { channel, message },
                move |action| remove_notification(platform, action),
            )
            .await;
    }
}

async fn remove_notification(
    platform: Arc<dyn Platform>,
    action: PendingAction,
) -> anyhow::Result<()> {
    let PendingAction::DeleteMessage { channel, message } = action else {
        return Ok(());
    };

    match platform.delete_message(channel, message).await {
        Ok(()) | Err(PlatformError::NotFound) => Ok(()),
        Err(e) => {
            warn!(error = %e, "Failed to remove notification");
            Err(e.into())
        }
    }
}
