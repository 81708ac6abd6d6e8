//! The built-in antispam rules.

use std::time::Duration;

use regex::Regex;

use super::AntispamRule;
use crate::config::RuleConfig;
use crate::domain::types::Message;

/// Too many messages.
pub struct MessagesRule {
    config: RuleConfig,
}

impl MessagesRule {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }
}

impl AntispamRule for MessagesRule {
    fn name(&self) -> &'static str {
        "messages"
    }

    fn window(&self) -> Duration {
        self.config.window()
    }

    fn threshold(&self) -> usize {
        self.config.threshold
    }

    fn evaluate(&self, messages: &[Message]) -> Option<String> {
        let count = messages.len();
        (count > self.config.threshold).then(|| {
            format!(
                "sent {} messages in {} seconds.",
                count, self.config.window_secs
            )
        })
    }
}

/// The same text posted over and over.
///
/// Counts messages whose content equals that of the newest one.
pub struct DuplicatesRule {
    config: RuleConfig,
}

impl DuplicatesRule {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }
}

impl AntispamRule for DuplicatesRule {
    fn name(&self) -> &'static str {
        "duplicates"
    }

    fn window(&self) -> Duration {
        self.config.window()
    }

    fn threshold(&self) -> usize {
        self.config.threshold
    }

    fn evaluate(&self, messages: &[Message]) -> Option<String> {
        let last = messages.last()?;
        if last.content.is_empty() {
            return None;
        }

        let count = messages
            .iter()
            .filter(|m| m.content == last.content)
            .count();

        (count > self.config.threshold).then(|| {
            format!(
                "sent {} of the same message in {} seconds.",
                count, self.config.window_secs
            )
        })
    }
}

/// Mass mentions of users and roles.
pub struct MentionsRule {
    config: RuleConfig,
}

impl MentionsRule {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }
}

impl AntispamRule for MentionsRule {
    fn name(&self) -> &'static str {
        "mentions"
    }

    fn window(&self) -> Duration {
        self.config.window()
    }

    fn threshold(&self) -> usize {
        self.config.threshold
    }

    fn evaluate(&self, messages: &[Message]) -> Option<String> {
        let count: usize = messages
            .iter()
            .map(|m| m.mentions.len() + m.mention_roles.len())
            .sum();

        (count > self.config.threshold).then(|| {
            format!(
                "mentioned {} users or roles in {} seconds.",
                count, self.config.window_secs
            )
        })
    }
}

/// Counts regex matches across the window.
struct PatternCounter {
    regex: Regex,
}

impl PatternCounter {
    fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    fn count(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| self.regex.find_iter(&m.content).count())
            .sum()
    }
}

/// Link floods.
pub struct LinksRule {
    config: RuleConfig,
    counter: PatternCounter,
}

impl LinksRule {
    pub fn new(config: RuleConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            counter: PatternCounter::new(r"https?://[^\s]+")?,
        })
    }
}

impl AntispamRule for LinksRule {
    fn name(&self) -> &'static str {
        "links"
    }

    fn window(&self) -> Duration {
        self.config.window()
    }

    fn threshold(&self) -> usize {
        self.config.threshold
    }

    fn evaluate(&self, messages: &[Message]) -> Option<String> {
        let count = self.counter.count(messages);
        (count > self.config.threshold)
            .then(|| format!("sent {} links in {} seconds.", count, self.config.window_secs))
    }
}

/// Custom emoji floods.
pub struct EmojisRule {
    config: RuleConfig,
    counter: PatternCounter,
}

impl EmojisRule {
    pub fn new(config: RuleConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            config,
            counter: PatternCounter::new(r"<a?:\w+:\d+>")?,
        })
    }
}

impl AntispamRule for EmojisRule {
    fn name(&self) -> &'static str {
        "emojis"
    }

    fn window(&self) -> Duration {
        self.config.window()
    }

    fn threshold(&self) -> usize {
        self.config.threshold
    }

    fn evaluate(&self, messages: &[Message]) -> Option<String> {
        let count = self.counter.count(messages);
        (count > self.config.threshold).then(|| {
            format!(
                "sent {} emojis in {} seconds.",
                count, self.config.window_secs
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChannelId, MessageId, RoleId, User, UserId};
    use rstest::rstest;
    use time::OffsetDateTime;

    fn message(content: &str) -> Message {
        Message {
            id: MessageId(1),
            channel_id: ChannelId(1),
            guild_id: None,
            author: User {
                id: UserId(1),
                name: "spammer".to_string(),
                bot: false,
            },
            content: content.to_string(),
            embeds: Vec::new(),
            attachments: Vec::new(),
            mentions: Vec::new(),
            mention_roles: Vec::new(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    fn messages(contents: &[&str]) -> Vec<Message> {
        contents.iter().map(|c| message(c)).collect()
    }

    #[rstest]
    #[case(9, None)]
    #[case(10, Some("sent 10 messages in 10 seconds."))]
    fn test_message_volume(#[case] count: usize, #[case] expected: Option<&str>) {
        let rule = MessagesRule::new(RuleConfig::new(10, 9));
        let window: Vec<Message> = (0..count).map(|_| message("hi")).collect();
        assert_eq!(rule.evaluate(&window).as_deref(), expected);
    }

    #[test]
    fn test_duplicates_count_matches_of_latest_content() {
        let rule = DuplicatesRule::new(RuleConfig::new(10, 3));

        let window = messages(&["spam", "spam", "other", "spam"]);
        assert_eq!(rule.evaluate(&window), None);

        let window = messages(&["spam", "spam", "other", "spam", "spam"]);
        assert_eq!(
            rule.evaluate(&window).as_deref(),
            Some("sent 4 of the same message in 10 seconds.")
        );

        // Only the newest message's content counts
        let window = messages(&["spam", "spam", "spam", "spam", "other"]);
        assert_eq!(rule.evaluate(&window), None);
    }

    #[test]
    fn test_duplicates_ignore_empty_content() {
        let rule = DuplicatesRule::new(RuleConfig::new(10, 3));
        let window = messages(&["", "", "", "", ""]);
        assert_eq!(rule.evaluate(&window), None);
        assert_eq!(rule.evaluate(&[]), None);
    }

    #[test]
    fn test_mentions_combine_users_and_roles() {
        let rule = MentionsRule::new(RuleConfig::new(5, 9));
        let mut first = message("hey");
        first.mentions = (0..5).map(UserId).collect();
        let mut second = message("hey");
        second.mention_roles = (0..5).map(RoleId).collect();

        assert_eq!(
            rule.evaluate(&[first.clone(), second]).as_deref(),
            Some("mentioned 10 users or roles in 5 seconds.")
        );
        assert_eq!(rule.evaluate(&[first]), None);
    }

    #[test]
    fn test_links_are_regex_counted() {
        let rule = LinksRule::new(RuleConfig::new(5, 2)).unwrap();
        let window = messages(&["http://a.com https://b.com", "ftp://c.com www.d.com"]);
        assert_eq!(rule.evaluate(&window), None);

        let window = messages(&["http://a.com https://b.com", "https://c.com"]);
        assert_eq!(
            rule.evaluate(&window).as_deref(),
            Some("sent 3 links in 5 seconds.")
        );
    }

    #[test]
    fn test_custom_emojis_are_regex_counted() {
        let rule = EmojisRule::new(RuleConfig::new(5, 2)).unwrap();
        let window = messages(&["<:kotlin:123> <a:party:456>", "<:kotlin:123> :smile:"]);
        assert_eq!(
            rule.evaluate(&window).as_deref(),
            Some("sent 3 emojis in 5 seconds.")
        );
    }
}
