//! Infraction records and the reversals the scheduler carries out.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::scheduler::Scheduler;
use crate::domain::types::{ChannelId, MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfractionKind {
    Ban,
    Kick,
    Mute,
    Warn,
}

impl fmt::Display for InfractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ban => "ban",
            Self::Kick => "kick",
            Self::Mute => "mute",
            Self::Warn => "warn",
        };
        f.write_str(name)
    }
}

/// A moderation record pushed to the [`InfractionSink`](crate::domain::platform::InfractionSink).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    pub id: Uuid,
    pub kind: InfractionKind,
    pub actor: UserId,
    pub target: UserId,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub expires: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl Infraction {
    pub fn new(
        kind: InfractionKind,
        actor: UserId,
        target: UserId,
        reason: impl Into<String>,
        duration: Option<Duration>,
    ) -> Self {
        let created = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            kind,
            actor,
            target,
            reason: reason.into(),
            expires: duration.and_then(|d| expiry_after(created, d)),
            created,
        }
    }
}

/// `start + duration`, or `None` if that isn't representable.
pub fn expiry_after(start: OffsetDateTime, duration: Duration) -> Option<OffsetDateTime> {
    start.checked_add(time::Duration::try_from(duration).ok()?)
}

/// A delayed action owned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Remove an in-channel notification.
    DeleteMessage {
        channel: ChannelId,
        message: MessageId,
    },
    Unsilence {
        channel: ChannelId,
    },
    Unban {
        user: UserId,
    },
    Unmute {
        user: UserId,
    },
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteMessage { channel, message } => {
                write!(f, "delete message {} in {}", message, channel.mention())
            }
            Self::Unsilence { channel } => write!(f, "unsilence {}", channel.mention()),
            Self::Unban { user } => write!(f, "unban {}", user.mention()),
            Self::Unmute { user } => write!(f, "unmute {}", user.mention()),
        }
    }
}

/// The scheduler shared by everything that reverses an action later.
pub type ActionScheduler = Scheduler<PendingAction>;
