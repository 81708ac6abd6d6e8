//! Core domain types: identifiers, guild entities, messages and gateway events.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Platform user identifier
    UserId
);
id_type!(
    /// Platform role identifier
    RoleId
);
id_type!(
    /// Platform channel identifier
    ChannelId
);
id_type!(
    /// Platform message identifier
    MessageId
);
id_type!(
    /// Platform guild identifier
    GuildId
);

impl UserId {
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

impl RoleId {
    pub fn mention(self) -> String {
        format!("<@&{}>", self.0)
    }
}

impl ChannelId {
    pub fn mention(self) -> String {
        format!("<#{}>", self.0)
    }
}

/// A guild role. Roles are ranked by position, ties broken by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub position: i64,
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Role {}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Kind of channel, as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    #[default]
    GuildText,
    Dm,
    GuildVoice,
    GuildCategory,
    GuildNews,
}

/// A channel. Channels are equal by id and ranked by position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
    #[serde(default)]
    pub position: i64,
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Channel {}

impl PartialOrd for Channel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Channel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Message author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn mention(&self) -> String {
        self.id.mention()
    }
}

/// A user's membership in a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub guild_id: GuildId,
    pub user: User,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

/// Rich embed attached to a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

/// File uploaded with a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

impl Attachment {
    /// Lower-cased file extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// A chat message as delivered by the event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub mentions: Vec<UserId>,
    #[serde(default)]
    pub mention_roles: Vec<RoleId>,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub timestamp: OffsetDateTime,
}

/// Full guild snapshot, delivered once when the session becomes available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSnapshot {
    pub id: GuildId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// Inbound gateway events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Ready {
        self_id: UserId,
    },
    GuildCreate(GuildSnapshot),
    RoleCreate {
        guild_id: GuildId,
        role: Role,
    },
    RoleUpdate {
        guild_id: GuildId,
        role: Role,
    },
    RoleDelete {
        guild_id: GuildId,
        role_id: RoleId,
    },
    ChannelCreate(Channel),
    MemberUpdate(Member),
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete {
        channel_id: ChannelId,
        message_id: MessageId,
    },
}

/// Discriminant of [`Event`], used to key handler registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    GuildCreate,
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    ChannelCreate,
    MemberUpdate,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready { .. } => EventKind::Ready,
            Event::GuildCreate(_) => EventKind::GuildCreate,
            Event::RoleCreate { .. } => EventKind::RoleCreate,
            Event::RoleUpdate { .. } => EventKind::RoleUpdate,
            Event::RoleDelete { .. } => EventKind::RoleDelete,
            Event::ChannelCreate(_) => EventKind::ChannelCreate,
            Event::MemberUpdate(_) => EventKind::MemberUpdate,
            Event::MessageCreate(_) => EventKind::MessageCreate,
            Event::MessageUpdate(_) => EventKind::MessageUpdate,
            Event::MessageDelete { .. } => EventKind::MessageDelete,
        }
    }

    /// The message carried by this event, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Event::MessageCreate(message) | Event::MessageUpdate(message) => Some(message),
            Event::Ready { .. }
            | Event::GuildCreate(_)
            | Event::RoleCreate { .. }
            | Event::RoleUpdate { .. }
            | Event::RoleDelete { .. }
            | Event::ChannelCreate(_)
            | Event::MemberUpdate(_)
            | Event::MessageDelete { .. } => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::MessageCreate(m) | Event::MessageUpdate(m) => write!(
                f,
                "{:?}(message={}, channel={}, author={})",
                self.kind(),
                m.id,
                m.channel_id,
                m.author.id
            ),
            _ => write!(f, "{:?}", self.kind()),
        }
    }
}
