//! Antispam rule trait definition.

use std::time::Duration;

use crate::domain::types::Message;

/// A sliding-window detector over one author's recent messages.
///
/// Rules hold no state between calls; everything they look at is the window
/// handed to [`AntispamRule::evaluate`].
pub trait AntispamRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// How far back the author's history is fetched for this rule.
    fn window(&self) -> Duration;

    /// Highest tolerated count; one above it is a violation.
    fn threshold(&self) -> usize;

    /// Describe the violation in `messages`, if there is one.
    fn evaluate(&self, messages: &[Message]) -> Option<String>;
}
