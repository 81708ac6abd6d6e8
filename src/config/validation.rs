//! Configuration validation.

use anyhow::{bail, Result};
use regex::Regex;

use super::types::RuleConfig;
use super::Config;

/// Validate configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.prefix.is_empty() {
        bail!("prefix cannot be empty");
    }
    if config.prefix.chars().any(char::is_whitespace) {
        bail!("prefix cannot contain whitespace");
    }

    // Validate log path
    if !config.log_path.as_os_str().is_empty()
        && config.log_path.to_string_lossy().contains('\0')
    {
        bail!("Invalid log_path: contains null character");
    }

    if config.message_cache_size == 0 {
        bail!("message_cache_size must be greater than zero");
    }

    let filters = &config.filters;
    for (name, entries) in [
        ("invite_whitelist", &filters.invite_whitelist),
        ("domain_blacklist", &filters.domain_blacklist),
        ("extension_blacklist", &filters.extension_blacklist),
        ("scheme_blacklist", &filters.scheme_blacklist),
        ("attachment_blacklist", &filters.attachment_blacklist),
    ] {
        for (i, entry) in entries.iter().enumerate() {
            if entry.trim().is_empty() {
                bail!("filters.{}[{}]: entry cannot be empty", name, i);
            }
        }
    }

    for (i, filter) in filters.regex.iter().enumerate() {
        if filter.pattern.is_empty() {
            bail!("filters.regex[{}]: pattern cannot be empty", i);
        }

        if let Err(e) = Regex::new(&filter.pattern) {
            bail!(
                "filters.regex[{}]: invalid regex pattern '{}': {}",
                i,
                filter.pattern,
                e
            );
        }
    }

    let antispam = &config.antispam;
    for (name, rule) in [
        ("messages", &antispam.messages),
        ("duplicates", &antispam.duplicates),
        ("mentions", &antispam.mentions),
        ("links", &antispam.links),
        ("emojis", &antispam.emojis),
    ] {
        validate_rule(name, rule)?;
    }

    Ok(())
}

fn validate_rule(name: &str, rule: &RuleConfig) -> Result<()> {
    if rule.window_secs == 0 {
        bail!("antispam.{}: window_secs must be greater than zero", name);
    }
    if rule.threshold == 0 {
        bail!("antispam.{}: threshold must be greater than zero", name);
    }
    Ok(())
}
