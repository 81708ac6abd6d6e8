//! Runs the filter chain over created and edited messages.
//!
//! Staff are exempt: only authors whose top role is below moderator are
//! filtered.

use async_trait::async_trait;
use tracing::debug;

use super::{default_check, top_role_below};
use crate::domain::commands::{EventHandler, EventRouter};
use crate::domain::directory::ConfiguredRole;
use crate::domain::filters::{FilterContext, Trigger};
use crate::domain::types::{Event, EventKind};
use crate::service::bot::Bot;

pub(super) fn register(events: &mut EventRouter<Bot>) {
    events.register(
        "filter",
        &[EventKind::MessageCreate, EventKind::MessageUpdate],
        vec![default_check(), top_role_below(ConfiguredRole::Moderator)],
        FilterHandler,
    );
}

struct FilterHandler;

#[async_trait]
impl EventHandler<Bot> for FilterHandler {
    async fn handle(&self, bot: &Bot, event: &Event) -> anyhow::Result<()> {
        let Some(message) = event.message() else {
            return Ok(());
        };
        let trigger = if event.kind() == EventKind::MessageUpdate {
            Trigger::Edit
        } else {
            Trigger::Create
        };

        let ctx = FilterContext::new(message, bot.notifier());
        let outcome = bot.filters().run(&ctx, trigger, bot.shutdown_token()).await;
        debug!(message = %message.id, ?outcome, "Filter chain finished");
        Ok(())
    }
}
