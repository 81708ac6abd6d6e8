//! In-memory guild cache and message history, fed from the event stream.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::domain::platform::MessageHistory;
use crate::domain::types::{
    Channel, ChannelId, Event, GuildId, GuildSnapshot, Member, Message, MessageId, Role, RoleId,
    UserId,
};
use crate::domain::GuildCache;

/// Guild state built from gateway events.
#[derive(Default)]
pub struct MemoryGuildCache {
    guilds: DashMap<GuildId, String>,
    roles: DashMap<RoleId, Role>,
    channels: DashMap<ChannelId, Channel>,
    members: DashMap<(GuildId, UserId), Member>,
}

impl MemoryGuildCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the cache from an event. Events that carry no guild state are
    /// ignored.
    pub fn apply(&self, event: &Event) {
        match event {
            Event::GuildCreate(snapshot) => self.insert_guild(snapshot),
            Event::RoleCreate { role, .. } | Event::RoleUpdate { role, .. } => {
                self.insert_role(role.clone())
            }
            Event::RoleDelete { role_id, .. } => {
                self.roles.remove(role_id);
            }
            Event::ChannelCreate(channel) => self.insert_channel(channel.clone()),
            Event::MemberUpdate(member) => self.insert_member(member.clone()),
            Event::Ready { .. }
            | Event::MessageCreate(_)
            | Event::MessageUpdate(_)
            | Event::MessageDelete { .. } => {}
        }
    }

    pub fn insert_guild(&self, snapshot: &GuildSnapshot) {
        self.guilds.insert(snapshot.id, snapshot.name.clone());
        for role in &snapshot.roles {
            self.insert_role(role.clone());
        }
        for channel in &snapshot.channels {
            let mut channel = channel.clone();
            channel.guild_id.get_or_insert(snapshot.id);
            self.insert_channel(channel);
        }
        for member in &snapshot.members {
            self.insert_member(member.clone());
        }
    }

    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.id, role);
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn insert_member(&self, member: Member) {
        self.members.insert((member.guild_id, member.user.id), member);
    }

    /// Add a role to a cached member, keeping the cache in step with
    /// outbound role changes.
    pub fn grant_role(&self, guild: GuildId, user: UserId, role: RoleId) {
        if let Some(mut member) = self.members.get_mut(&(guild, user)) {
            if !member.roles.contains(&role) {
                member.roles.push(role);
            }
        }
    }

    pub fn revoke_role(&self, guild: GuildId, user: UserId, role: RoleId) {
        if let Some(mut member) = self.members.get_mut(&(guild, user)) {
            member.roles.retain(|r| *r != role);
        }
    }
}

impl GuildCache for MemoryGuildCache {
    fn has_guild(&self, id: GuildId) -> bool {
        self.guilds.contains_key(&id)
    }

    fn role(&self, id: RoleId) -> Option<Role> {
        self.roles.get(&id).map(|r| r.clone())
    }

    fn channel(&self, id: ChannelId) -> Option<Channel> {
        self.channels.get(&id).map(|c| c.clone())
    }

    fn member(&self, guild: GuildId, user: UserId) -> Option<Member> {
        self.members.get(&(guild, user)).map(|m| m.clone())
    }
}

/// Messages kept per channel unless configured otherwise.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Recent messages, indexed two ways.
///
/// Per author, messages are pruned to a retention window. Per channel, the
/// newest `channel_capacity` messages are kept.
pub struct MemoryMessageHistory {
    retention: Duration,
    channel_capacity: usize,
    by_author: DashMap<UserId, VecDeque<Message>>,
    by_channel: DashMap<ChannelId, VecDeque<Message>>,
}

impl MemoryMessageHistory {
    /// Keep messages for `retention`, which should cover the longest antispam
    /// window.
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            by_author: DashMap::new(),
            by_channel: DashMap::new(),
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Insert keeping the deque ordered by timestamp.
    fn insert_ordered(messages: &mut VecDeque<Message>, message: &Message) {
        let index = messages
            .iter()
            .rposition(|m| m.timestamp <= message.timestamp)
            .map_or(0, |i| i + 1);
        messages.insert(index, message.clone());
    }

    fn prune(messages: &mut VecDeque<Message>, cutoff: OffsetDateTime) {
        while messages.front().is_some_and(|m| m.timestamp <= cutoff) {
            messages.pop_front();
        }
    }

    fn refresh(stored: &mut Message, message: &Message) {
        stored.content = message.content.clone();
        stored.embeds = message.embeds.clone();
        stored.attachments = message.attachments.clone();
        stored.mentions = message.mentions.clone();
        stored.mention_roles = message.mention_roles.clone();
    }
}

#[async_trait]
impl MessageHistory for MemoryMessageHistory {
    async fn record(&self, message: &Message) {
        {
            let mut messages = self.by_author.entry(message.author.id).or_default();
            Self::insert_ordered(&mut messages, message);
            Self::prune(&mut messages, message.timestamp - self.retention);
        }

        let mut messages = self.by_channel.entry(message.channel_id).or_default();
        Self::insert_ordered(&mut messages, message);
        while messages.len() > self.channel_capacity {
            messages.pop_front();
        }
    }

    async fn update(&self, message: &Message) {
        if let Some(mut messages) = self.by_author.get_mut(&message.author.id) {
            if let Some(stored) = messages.iter_mut().find(|m| m.id == message.id) {
                Self::refresh(stored, message);
            }
        }
        if let Some(mut messages) = self.by_channel.get_mut(&message.channel_id) {
            if let Some(stored) = messages.iter_mut().find(|m| m.id == message.id) {
                Self::refresh(stored, message);
            }
        }
    }

    async fn remove(&self, channel: ChannelId, message: MessageId) {
        for mut entry in self.by_author.iter_mut() {
            entry.retain(|m| !(m.channel_id == channel && m.id == message));
        }
        if let Some(mut messages) = self.by_channel.get_mut(&channel) {
            messages.retain(|m| m.id != message);
        }
    }

    async fn recent(&self, author: UserId, window: Duration, until: OffsetDateTime) -> Vec<Message> {
        let cutoff = until - window;
        self.by_author
            .get(&author)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.timestamp > cutoff && m.timestamp <= until)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn in_channel(&self, channel: ChannelId) -> Vec<Message> {
        self.by_channel
            .get(&channel)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn find(&self, message: MessageId) -> Option<Message> {
        self.by_channel
            .iter()
            .find_map(|entry| entry.iter().find(|m| m.id == message).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::User;

    fn message(id: u64, author: u64, secs: i64, content: &str) -> Message {
        Message {
            id: MessageId(id),
            channel_id: ChannelId(1),
            guild_id: Some(GuildId(1)),
            author: User {
                id: UserId(author),
                name: String::new(),
                bot: false,
            },
            content: content.to_string(),
            embeds: Vec::new(),
            attachments: Vec::new(),
            mentions: Vec::new(),
            mention_roles: Vec::new(),
            timestamp: OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(secs),
        }
    }

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(secs)
    }

    #[tokio::test]
    async fn test_recent_respects_window_and_author() {
        let history = MemoryMessageHistory::new(Duration::from_secs(60));
        history.record(&message(1, 1, 100, "a")).await;
        history.record(&message(2, 1, 104, "b")).await;
        history.record(&message(3, 1, 108, "c")).await;
        history.record(&message(4, 2, 108, "other author")).await;

        let window = history.recent(UserId(1), Duration::from_secs(5), at(108)).await;
        let ids: Vec<u64> = window.iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);

        let window = history.recent(UserId(1), Duration::from_secs(10), at(108)).await;
        assert_eq!(window.len(), 3);
    }

    #[tokio::test]
    async fn test_record_keeps_timestamp_order_and_prunes() {
        let history = MemoryMessageHistory::new(Duration::from_secs(10));
        history.record(&message(1, 1, 100, "a")).await;
        history.record(&message(3, 1, 105, "c")).await;
        history.record(&message(2, 1, 103, "b")).await;

        let ids: Vec<u64> = history
            .recent(UserId(1), Duration::from_secs(60), at(105))
            .await
            .iter()
            .map(|m| m.id.get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        history.record(&message(4, 1, 112, "d")).await;
        let ids: Vec<u64> = history
            .recent(UserId(1), Duration::from_secs(60), at(112))
            .await
            .iter()
            .map(|m| m.id.get())
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let history = MemoryMessageHistory::new(Duration::from_secs(60));
        history.record(&message(1, 1, 100, "before")).await;
        history.record(&message(2, 1, 101, "keep")).await;

        history.update(&message(1, 1, 100, "after")).await;
        history.remove(ChannelId(1), MessageId(2)).await;

        let window = history.recent(UserId(1), Duration::from_secs(60), at(101)).await;
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].content, "after");
    }

    #[tokio::test]
    async fn test_channel_index_is_bounded_and_outlives_retention() {
        let history = MemoryMessageHistory::new(Duration::from_secs(10)).with_channel_capacity(3);
        for (id, secs) in [(1, 100), (2, 200), (3, 300), (4, 400)] {
            history.record(&message(id, id, secs, "x")).await;
        }

        let ids: Vec<u64> = history
            .in_channel(ChannelId(1))
            .await
            .iter()
            .map(|m| m.id.get())
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(history.recent(UserId(2), Duration::from_secs(10), at(200)).await.len(), 1);

        assert_eq!(history.find(MessageId(3)).await.map(|m| m.author.id), Some(UserId(3)));
        assert!(history.find(MessageId(1)).await.is_none());

        history.remove(ChannelId(1), MessageId(3)).await;
        assert!(history.find(MessageId(3)).await.is_none());
        assert!(history.in_channel(ChannelId(2)).await.is_empty());
    }

    #[test]
    fn test_cache_applies_events() {
        let cache = MemoryGuildCache::new();
        cache.apply(&Event::GuildCreate(GuildSnapshot {
            id: GuildId(1),
            name: "guild".to_string(),
            roles: vec![Role {
                id: RoleId(10),
                name: "Moderator".to_string(),
                position: 3,
            }],
            channels: vec![Channel {
                id: ChannelId(20),
                guild_id: None,
                name: "general".to_string(),
                kind: Default::default(),
                position: 0,
            }],
            members: Vec::new(),
        }));

        assert!(cache.has_guild(GuildId(1)));
        assert_eq!(cache.channel(ChannelId(20)).unwrap().guild_id, Some(GuildId(1)));

        cache.apply(&Event::RoleDelete {
            guild_id: GuildId(1),
            role_id: RoleId(10),
        });
        assert!(cache.role(RoleId(10)).is_none());
    }
}
