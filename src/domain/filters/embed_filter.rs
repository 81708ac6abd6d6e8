//! Suspicious embed alerting.

use async_trait::async_trait;

use super::{Filter, FilterConcern, FilterContext, PRIORITY_INFORMATIONAL};
use crate::domain::types::Embed;

/// Alerts staff about embeds that no link preview could have produced.
///
/// Embeds with no provider, no video and no url are only ever sent by
/// self-bots and modified clients. The message is left alone.
pub struct EmbedFilter;

impl EmbedFilter {
    pub fn suspicious(embeds: &[Embed]) -> Vec<&Embed> {
        embeds
            .iter()
            .filter(|e| e.provider.is_none() && e.video.is_none() && e.url.is_none())
            .collect()
    }

    async fn inspect(&self, ctx: &FilterContext<'_>) -> anyhow::Result<bool> {
        let message = ctx.message;
        let embeds = Self::suspicious(&message.embeds);
        if embeds.is_empty() {
            return Ok(true);
        }

        ctx.notifier
            .send_alert(
                &format!(
                    "{} suspicious embed/s posted by {} {}:",
                    embeds.len(),
                    ctx.author_label(),
                    ctx.notifier.describe_origin(message)
                ),
                true,
            )
            .await?;

        for embed in embeds {
            let title = embed.title.as_deref().unwrap_or("(no title)");
            let description = embed.description.as_deref().unwrap_or("(no description)");
            ctx.notifier
                .send_alert(&format!("**{}**\n{}", title, description), false)
                .await?;
        }

        Ok(true)
    }
}

#[async_trait]
impl Filter for EmbedFilter {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn concerns(&self) -> &[FilterConcern] {
        &[FilterConcern::Embeds]
    }

    fn priority(&self) -> u32 {
        PRIORITY_INFORMATIONAL
    }

    async fn check_create(&self, ctx: &FilterContext<'_>, _content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx).await
    }

    async fn check_edit(&self, ctx: &FilterContext<'_>, _content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx).await
    }
}
