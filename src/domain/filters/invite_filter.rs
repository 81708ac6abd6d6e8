//! Invite link filter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{Filter, FilterConcern, FilterContext, PRIORITY_ACTIONING};

const INVITE_PATTERN: &str =
    r"(?i)(?:discord(?:app)?\.com/invite|discord\.(?:gg|me|io|li)|invite\.gg)/([a-z0-9\-]+)";

const NOTIFICATION: &str = "Your link has been removed, as it violates **rule 7**. \
                            For more information, see the server rules.";

/// Removes messages containing server invites.
pub struct InviteFilter {
    regex: Regex,
    whitelist: BTreeSet<String>,
}

impl InviteFilter {
    pub fn new(whitelist: Vec<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(INVITE_PATTERN)?,
            whitelist: whitelist.into_iter().collect(),
        })
    }

    /// Invite codes in `content` that aren't whitelisted.
    pub fn find_invites(&self, content: &str) -> Vec<String> {
        self.regex
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|code| code.as_str().to_string())
            .filter(|code| !self.whitelist.contains(code))
            .collect()
    }

    async fn inspect(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        let invites = self.find_invites(content);
        if invites.is_empty() {
            return Ok(true);
        }

        debug!(count = invites.len(), "Found invites");
        let message = ctx.message;
        ctx.notifier.delete_ignoring_not_found(message).await?;

        let codes: Vec<String> = invites.iter().map(|c| format!("`{}`", c)).collect();
        let alert = format!(
            "Invite filter triggered by {} {} ({}), with the following message:\n\n{}",
            ctx.author_label(),
            ctx.notifier.describe_origin(message),
            codes.join(", "),
            content
        );
        ctx.report_removal(self.name(), &alert, NOTIFICATION).await;

        Ok(false)
    }
}

#[async_trait]
impl Filter for InviteFilter {
    fn name(&self) -> &'static str {
        "invite"
    }

    fn concerns(&self) -> &[FilterConcern] {
        &[FilterConcern::Content]
    }

    fn priority(&self) -> u32 {
        PRIORITY_ACTIONING
    }

    async fn check_create(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx, content).await
    }

    async fn check_edit(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        self.inspect(ctx, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("join discord.gg/abc123 now", vec!["abc123"])]
    #[case("https://DISCORD.com/invite/Kotlin", vec!["Kotlin"])]
    #[case("discordapp.com/invite/x-y and discord.me/z", vec!["x-y", "z"])]
    #[case("no links here", vec![])]
    #[case("discord.com/channels/1/2", vec![])]
    fn test_find_invites(#[case] content: &str, #[case] expected: Vec<&str>) {
        let filter = InviteFilter::new(Vec::new()).unwrap();
        assert_eq!(filter.find_invites(content), expected);
    }

    #[test]
    fn test_whitelisted_codes_are_ignored() {
        let filter = InviteFilter::new(vec!["kotlin".to_string()]).unwrap();
        assert_eq!(
            filter.find_invites("discord.gg/kotlin discord.gg/other"),
            vec!["other"]
        );
    }
}
