//! Resolution of configured roles and channels to guild entities.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::domain::error::{Result, WardenError};
use crate::domain::types::{Channel, ChannelId, GuildId, Member, Role, RoleId, UserId};

/// Read side of the platform's guild state (roles, channels, members).
pub trait GuildCache: Send + Sync {
    fn has_guild(&self, id: GuildId) -> bool;

    fn role(&self, id: RoleId) -> Option<Role>;

    fn channel(&self, id: ChannelId) -> Option<Channel>;

    fn member(&self, guild: GuildId, user: UserId) -> Option<Member>;
}

/// Logical roles referenced by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfiguredRole {
    Admin,
    Moderator,
    Helper,
    Developer,
    Muted,
}

impl fmt::Display for ConfiguredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "Admin",
            Self::Moderator => "Moderator",
            Self::Helper => "Helper",
            Self::Developer => "Developer",
            Self::Muted => "Muted",
        };
        f.write_str(name)
    }
}

/// Logical channels referenced by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfiguredChannel {
    Alerts,
    ModeratorLog,
    BotCommands,
    Verification,
}

impl fmt::Display for ConfiguredChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alerts => "alerts",
            Self::ModeratorLog => "moderator-log",
            Self::BotCommands => "bot-commands",
            Self::Verification => "verification",
        };
        f.write_str(name)
    }
}

/// Maps logical roles/channels onto the guild cache.
#[derive(Clone)]
pub struct Directory {
    guild_id: GuildId,
    config: Arc<Config>,
    cache: Arc<dyn GuildCache>,
}

impl Directory {
    pub fn new(config: Arc<Config>, cache: Arc<dyn GuildCache>) -> Self {
        Self {
            guild_id: GuildId(config.guild_id),
            config,
            cache,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn cache(&self) -> &dyn GuildCache {
        self.cache.as_ref()
    }

    /// Fail with [`WardenError::MissingGuild`] unless the configured guild is known.
    pub fn require_guild(&self) -> Result<GuildId> {
        if self.cache.has_guild(self.guild_id) {
            Ok(self.guild_id)
        } else {
            Err(WardenError::MissingGuild {
                id: self.guild_id.get(),
            })
        }
    }

    pub fn role_id(&self, role: ConfiguredRole) -> RoleId {
        let roles = &self.config.roles;
        RoleId(match role {
            ConfiguredRole::Admin => roles.admin,
            ConfiguredRole::Moderator => roles.moderator,
            ConfiguredRole::Helper => roles.helper,
            ConfiguredRole::Developer => roles.developer,
            ConfiguredRole::Muted => roles.muted,
        })
    }

    pub fn channel_id(&self, channel: ConfiguredChannel) -> ChannelId {
        let channels = &self.config.channels;
        ChannelId(match channel {
            ConfiguredChannel::Alerts => channels.alerts,
            ConfiguredChannel::ModeratorLog => channels.moderator_log,
            ConfiguredChannel::BotCommands => channels.bot_commands,
            ConfiguredChannel::Verification => channels.verification,
        })
    }

    /// Resolve a configured role, failing with [`WardenError::MissingRole`].
    pub fn role(&self, role: ConfiguredRole) -> Result<Role> {
        let id = self.role_id(role);
        self.cache
            .role(id)
            .ok_or(WardenError::MissingRole { id: id.get() })
    }

    /// Resolve a configured channel, failing with [`WardenError::MissingChannel`].
    pub fn channel(&self, channel: ConfiguredChannel) -> Result<Channel> {
        let id = self.channel_id(channel);
        self.cache
            .channel(id)
            .ok_or(WardenError::MissingChannel { id: id.get() })
    }

    /// All known roles of a guild member, or `None` if the user is not a member.
    ///
    /// Role ids the cache doesn't know about are skipped.
    pub fn member_roles(&self, user: UserId) -> Option<Vec<Role>> {
        let member = self.cache.member(self.guild_id, user)?;
        Some(
            member
                .roles
                .iter()
                .filter_map(|id| self.cache.role(*id))
                .collect(),
        )
    }

    /// Whether the user currently holds the given configured role.
    pub fn has_role(&self, user: UserId, role: ConfiguredRole) -> bool {
        let id = self.role_id(role);
        self.cache
            .member(self.guild_id, user)
            .is_some_and(|member| member.roles.contains(&id))
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}
