//! Configured pattern alerting.

use async_trait::async_trait;
use regex::Regex;

use super::{Filter, FilterConcern, FilterContext, PRIORITY_INFORMATIONAL};
use crate::config::RegexFilterConfig;

struct Pattern {
    regex: Regex,
    description: String,
}

/// Alerts staff when content matches a configured pattern. Never removes
/// anything.
pub struct RegexFilter {
    patterns: Vec<Pattern>,
}

impl RegexFilter {
    pub fn new(configs: &[RegexFilterConfig]) -> Result<Self, regex::Error> {
        let patterns = configs
            .iter()
            .map(|config| {
                Ok(Pattern {
                    regex: Regex::new(&config.pattern)?,
                    description: config
                        .description
                        .clone()
                        .unwrap_or_else(|| config.pattern.clone()),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { patterns })
    }

    /// Descriptions of every pattern matching `content`.
    pub fn matches(&self, content: &str) -> Vec<&str> {
        self.patterns
            .iter()
            .filter(|p| p.regex.is_match(content))
            .map(|p| p.description.as_str())
            .collect()
    }

    async fn inspect(&self, ctx: &FilterContext<'_>, content: &str) -> anyhow::Result<bool> {
        let matched = self.matches(content);
        if matched.is_empty() {
            return Ok(true);
        }

        ctx.notifier
            .send_alert(
                &format!(
                    "Regex filter triggered by {} {} ({}), with the following message:\n\n{}",
                    ctx.author_label(),
                    ctx.notifier.describe_origin(ctx.message),
                    matched.join(", "),
                    content
                ),
                true,
            )
            .await?;

        Ok(true)
    }
}

#[async_trait]
impl Filter for RegexFilter {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn concerns(&self) -> &[FilterConcern] {
        &[FilterConcern::Content]
    }

    fn priority(&self) -> u32 {
        PRIORITY_INFORMATIONAL + 10
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

    #[test]
    fn test_matches_use_description_or_pattern() {
        let filter = RegexFilter::new(&[
            RegexFilterConfig {
                pattern: r"(?i)free\s+nitro".to_string(),
                description: Some("Nitro scam".to_string()),
            },
            RegexFilterConfig {
                pattern: "token".to_string(),
                description: None,
            },
        ])
        .unwrap();

        assert_eq!(filter.matches("FREE  NITRO here"), vec!["Nitro scam"]);
        assert_eq!(filter.matches("leaked token"), vec!["token"]);
        assert!(filter.matches("hello").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = RegexFilter::new(&[RegexFilterConfig {
            pattern: "(".to_string(),
            description: None,
        }]);
        assert!(result.is_err());
    }
}
