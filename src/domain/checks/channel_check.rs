//! Channel and channel-type checks.

use async_trait::async_trait;
use tracing::debug;

use super::{Check, CheckContext, CheckOperation};
use crate::domain::directory::ConfiguredChannel;
use crate::domain::error::Result;
use crate::domain::types::{Channel, ChannelKind};

/// The channel a [`ChannelCheck`] compares against.
#[derive(Debug, Clone)]
pub enum ChannelRef {
    Channel(Channel),
    Configured(ConfiguredChannel),
}

/// Check against the channel a message was sent in.
///
/// Supports the single-value operators only: equality compares ids, ordering
/// compares channel positions. Collection operators panic.
pub struct ChannelCheck {
    channel: ChannelRef,
    operation: CheckOperation,
}

impl ChannelCheck {
    pub fn new(channel: Channel, operation: CheckOperation) -> Self {
        Self {
            channel: ChannelRef::Channel(channel),
            operation,
        }
    }

    pub fn configured(channel: ConfiguredChannel, operation: CheckOperation) -> Self {
        Self {
            channel: ChannelRef::Configured(channel),
            operation,
        }
    }
}

#[async_trait]
impl Check for ChannelCheck {
    fn name(&self) -> String {
        let channel = match &self.channel {
            ChannelRef::Channel(channel) => channel.name.clone(),
            ChannelRef::Configured(kind) => kind.to_string(),
        };
        format!("channel {} {}", self.operation, channel)
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        self.operation.assert_single("channels");

        let Some(message) = ctx.message() else {
            return Ok(false);
        };

        let reference = match &self.channel {
            ChannelRef::Channel(channel) => channel.clone(),
            ChannelRef::Configured(kind) => ctx.directory.channel(*kind)?,
        };

        let Some(other) = ctx.directory.cache().channel(message.channel_id) else {
            debug!(channel = %message.channel_id, "Failing check: unknown channel");
            return Ok(false);
        };

        let result = self.operation.compare(&reference, Some(&other));
        debug!(
            "{} {} {} -> {}",
            reference.name, self.operation, other.name, result
        );
        Ok(result)
    }
}

/// Check against the kind of channel a message was sent in.
///
/// Only `Equal` and `NotEqual` are meaningful; everything else panics.
pub struct ChannelTypeCheck {
    kind: ChannelKind,
    operation: CheckOperation,
}

impl ChannelTypeCheck {
    pub fn new(kind: ChannelKind, operation: CheckOperation) -> Self {
        Self { kind, operation }
    }
}

#[async_trait]
impl Check for ChannelTypeCheck {
    fn name(&self) -> String {
        format!("channel type {} {:?}", self.operation, self.kind)
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        if !matches!(
            self.operation,
            CheckOperation::Equal | CheckOperation::NotEqual
        ) {
            panic!(
                "Given check ({}) is not valid for channel types",
                self.operation
            );
        }

        let Some(message) = ctx.message() else {
            return Ok(false);
        };

        // Guild-less messages come from DMs, which may not be cached
        let other = match ctx.directory.cache().channel(message.channel_id) {
            Some(channel) => channel.kind,
            None if message.guild_id.is_none() => ChannelKind::Dm,
            None => return Ok(false),
        };

        let result = match self.operation {
            CheckOperation::Equal => self.kind == other,
            _ => self.kind != other,
        };
        debug!("{:?} {} {:?} -> {}", self.kind, self.operation, other, result);
        Ok(result)
    }
}
