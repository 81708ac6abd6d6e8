//! Filter trait definition.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::notify::Notifier;
use crate::domain::types::Message;

/// Priority shared by filters that delete the message they match.
pub const PRIORITY_ACTIONING: u32 = 10;

/// Priority shared by filters that only alert staff.
pub const PRIORITY_INFORMATIONAL: u32 = 100;

/// A kind of message content a filter inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterConcern {
    Content,
    Embeds,
    Attachments,
}

impl FilterConcern {
    /// Whether the message carries this kind of content.
    pub fn present_in(self, message: &Message) -> bool {
        match self {
            Self::Content => !message.content.is_empty(),
            Self::Embeds => !message.embeds.is_empty(),
            Self::Attachments => !message.attachments.is_empty(),
        }
    }
}

/// What a filter gets to work with.
pub struct FilterContext<'a> {
    pub message: &'a Message,
    pub notifier: &'a Notifier,
}

impl<'a> FilterContext<'a> {
    pub fn new(message: &'a Message, notifier: &'a Notifier) -> Self {
        Self { message, notifier }
    }

    /// `**name** (`id`)` for audit records.
    pub fn author_label(&self) -> String {
        format!(
            "**{}** (`{}`)",
            self.message.author.name, self.message.author.id
        )
    }

    /// Alert staff and notify the author about a message that was removed.
    ///
    /// The removal already happened, so delivery failures are only logged.
    pub async fn report_removal(&self, filter: &str, alert: &str, notification: &str) {
        if let Err(e) = self.notifier.send_alert(alert, true).await {
            warn!(filter, error = %e, "Failed to send filter alert");
        }
        if let Err(e) = self
            .notifier
            .send_notification(self.message, notification)
            .await
        {
            warn!(filter, user = %self.message.author.id, error = %e, "Failed to notify author");
        }
    }
}

/// Trait for message content filters.
///
/// Both check methods return `Ok(false)` when the message was actioned and the
/// chain must stop, `Ok(true)` to let later filters run.
#[async_trait]
pub trait Filter: Send + Sync {
    fn name(&self) -> &'static str;

    /// The filter is skipped unless at least one of these is present.
    fn concerns(&self) -> &[FilterConcern];

    /// Get the priority of this filter (lower = runs earlier).
    fn priority(&self) -> u32;

    /// Inspect a newly created message. `content` is already sanitized.
    async fn check_create(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool>;

    /// Inspect an edited message. `content` is already sanitized.
    async fn check_edit(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool>;
}
