//! Blacklisted attachment type filter.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::{Filter, FilterConcern, FilterContext, PRIORITY_ACTIONING};
use crate::domain::types::Attachment;

/// Removes messages carrying files with blacklisted extensions.
pub struct AttachmentFilter {
    extensions: BTreeSet<String>,
}

impl AttachmentFilter {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn find_blacklisted<'a>(&self, attachments: &'a [Attachment]) -> Vec<&'a Attachment> {
        attachments
            .iter()
            .filter(|a| {
                a.extension()
                    .is_some_and(|ext| self.extensions.contains(&ext))
            })
            .collect()
    }

    async fn inspect(&self, ctx: &FilterContext<'_>) -> anyhow::Result<bool> {
        let message = ctx.message;
        let blocked = self.find_blacklisted(&message.attachments);
        if blocked.is_empty() {
            return Ok(true);
        }

        ctx.notifier.delete_ignoring_not_found(message).await?;

        let names: Vec<String> = blocked.iter().map(|a| format!("`{}`", a.filename)).collect();
        let alert = format!(
            "Attachment filter triggered by {} {}: {}",
            ctx.author_label(),
            ctx.notifier.describe_origin(message),
            names.join(", ")
        );

        let mut types: Vec<String> = blocked
            .iter()
            .filter_map(|a| a.extension())
            .map(|ext| format!("`.{}`", ext))
            .collect();
        types.dedup();
        let notification = format!(
            "Your message has been removed, as it contains a blacklisted file type ({}).",
            types.join(", ")
        );

        ctx.report_removal(self.name(), &alert, &notification).await;

        Ok(false)
    }
}

#[async_trait]
impl Filter for AttachmentFilter {
    fn name(&self) -> &'static str {
        "attachment"
    }

    fn concerns(&self) -> &[FilterConcern] {
        &[FilterConcern::Attachments]
    }

    fn priority(&self) -> u32 {
        PRIORITY_ACTIONING
    }

    async fn check_create(&self, ctx: &FilterContext<'_>, _content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx).await
    }

    async fn check_edit(&self, ctx: &FilterContext<'_>, _content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx).await
    }
}
