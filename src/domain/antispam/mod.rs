//! Sliding-window antispam evaluation.

mod rule_trait;
mod rules;

use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::config::AntispamConfig;
use crate::domain::platform::MessageHistory;
use crate::domain::types::{Message, UserId};

pub use rule_trait::AntispamRule;
pub use rules::{DuplicatesRule, EmojisRule, LinksRule, MentionsRule, MessagesRule};

/// Format of the warning posted when a rule is violated.
pub fn warning(mention: &str, description: &str) -> String {
    format!(":warning: **Antispam:** {} {}", mention, description)
}

/// A violated rule and the window of messages that violated it.
#[derive(Debug, Clone)]
pub struct Violation {
    pub rule: &'static str,
    pub description: String,
    pub messages: Vec<Message>,
}

/// Runs antispam rules in order against an author's history.
pub struct Antispam {
    rules: Vec<Box<dyn AntispamRule>>,
}

impl Antispam {
    /// The five built-in rules, in catalog order.
    pub fn new(config: &AntispamConfig) -> Result<Self, regex::Error> {
        Ok(Self::with_rules(vec![
            Box::new(MessagesRule::new(config.messages)),
            Box::new(DuplicatesRule::new(config.duplicates)),
            Box::new(MentionsRule::new(config.mentions)),
            Box::new(LinksRule::new(config.links)?),
            Box::new(EmojisRule::new(config.emojis)?),
        ]))
    }

    pub fn with_rules(rules: Vec<Box<dyn AntispamRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// The longest window any rule looks at.
    pub fn max_window(&self) -> Duration {
        self.rules
            .iter()
            .map(|r| r.window())
            .max()
            .unwrap_or_default()
    }

    /// Evaluate every rule for `author` as of `now`, stopping at the first
    /// violation.
    ///
    /// Each rule fetches its own window from `history`; windows of different
    /// rules are independent.
    pub async fn evaluate(
        &self,
        history: &dyn MessageHistory,
        author: UserId,
        now: OffsetDateTime,
    ) -> Option<Violation> {
        for rule in &self.rules {
            let messages = history.recent(author, rule.window(), now).await;
            if let Some(description) = rule.evaluate(&messages) {
                debug!(
                    rule = rule.name(),
                    user = %author,
                    window = messages.len(),
                    "Antispam rule violated"
                );
                return Some(Violation {
                    rule: rule.name(),
                    description,
                    messages,
                });
            }
        }
        None
    }
}
