//! Configuration data types.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::validation;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command prefix
    pub prefix: String,

    /// ID of the guild the bot moderates
    pub guild_id: u64,

    /// Enable debug logging to stderr
    pub debug: bool,

    /// Default log directive, overridden by `RUST_LOG`
    pub log_level: String,

    /// Path to log directory
    pub log_path: PathBuf,

    /// Log files older than this many days are removed at startup
    pub log_retention_days: u64,

    /// Recent messages kept per channel for `clean`
    pub message_cache_size: usize,

    pub roles: RolesConfig,

    pub channels: ChannelsConfig,

    pub filters: FiltersConfig,

    pub antispam: AntispamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            guild_id: 0,
            debug: false,
            log_level: "info".to_string(),
            log_path: default_log_path(),
            log_retention_days: 2,
            message_cache_size: 1000,
            roles: RolesConfig::default(),
            channels: ChannelsConfig::default(),
            filters: FiltersConfig::default(),
            antispam: AntispamConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration and return errors if invalid.
    /// Delegates to the comprehensive validation module.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

/// Role IDs for the logical roles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub admin: u64,
    pub moderator: u64,
    pub helper: u64,
    pub developer: u64,
    pub muted: u64,
}

/// Channel IDs for the logical channels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub alerts: u64,
    pub moderator_log: u64,
    pub bot_commands: u64,
    pub verification: u64,
}

/// Content filter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Seconds before an in-channel fallback notification is deleted
    pub notification_delete_secs: u64,

    /// Invite codes the invite filter ignores
    pub invite_whitelist: Vec<String>,

    /// Domains (and their subdomains) the domain filter removes
    pub domain_blacklist: Vec<String>,

    /// Top-level domain extensions the domain filter removes
    pub extension_blacklist: Vec<String>,

    /// URL schemes the domain filter removes
    pub scheme_blacklist: Vec<String>,

    /// File extensions the attachment filter removes
    pub attachment_blacklist: Vec<String>,

    /// Alert-only patterns
    pub regex: Vec<RegexFilterConfig>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            notification_delete_secs: 10,
            invite_whitelist: Vec::new(),
            domain_blacklist: to_strings(DEFAULT_DOMAIN_BLACKLIST),
            extension_blacklist: to_strings(&["adult", "porn", "sex", "xxx"]),
            scheme_blacklist: to_strings(&["magnet"]),
            attachment_blacklist: to_strings(DEFAULT_ATTACHMENT_BLACKLIST),
            regex: Vec::new(),
        }
    }
}

impl FiltersConfig {
    pub fn notification_delay(&self) -> Duration {
        Duration::from_secs(self.notification_delete_secs)
    }
}

/// A single alert-only regex filter.
///
/// ```toml
/// [[filters.regex]]
/// pattern = "(?i)free nitro"
/// description = "Nitro scam"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RegexFilterConfig {
    pub pattern: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Window and threshold for one antispam rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RuleConfig {
    pub window_secs: u64,
    pub threshold: usize,
}

impl RuleConfig {
    pub const fn new(window_secs: u64, threshold: usize) -> Self {
        Self {
            window_secs,
            threshold,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Antispam settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AntispamConfig {
    pub enabled: bool,
    pub messages: RuleConfig,
    pub duplicates: RuleConfig,
    pub mentions: RuleConfig,
    pub links: RuleConfig,
    pub emojis: RuleConfig,

    /// Seconds until the muted role is removed again; 0 keeps it
    pub mute_duration_secs: u64,
}

impl Default for AntispamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            messages: RuleConfig::new(10, 9),
            duplicates: RuleConfig::new(10, 3),
            mentions: RuleConfig::new(5, 9),
            links: RuleConfig::new(5, 9),
            emojis: RuleConfig::new(5, 9),
            mute_duration_secs: 600,
        }
    }
}

impl AntispamConfig {
    pub fn mute_duration(&self) -> Option<Duration> {
        (self.mute_duration_secs > 0).then(|| Duration::from_secs(self.mute_duration_secs))
    }

    /// The longest window of any rule; message history must cover it.
    pub fn max_window(&self) -> Duration {
        [
            self.messages,
            self.duplicates,
            self.mentions,
            self.links,
            self.emojis,
        ]
        .iter()
        .map(RuleConfig::window)
        .max()
        .unwrap_or_default()
    }
}

const DEFAULT_DOMAIN_BLACKLIST: &[&str] = &[
    // Adult
    "e621.net",
    "kink.com",
    "motherless.com",
    "paheal.net",
    "pornhub.com",
    "redtube.com",
    "xhamster.com",
    "xnxx.com",
    "youjizz.com",
    "youporn.com",
    // Piracy
    "1337x.to",
    "demonoid.is",
    "eztv.io",
    "fitgirl-repacks.site",
    "limetorrents.info",
    "nyaa.si",
    "rarbg.to",
    "thepiratebay.org",
    "torrentz2.eu",
    "yts.mx",
    // Gore
    "liveleak.com",
    // Phishing
    "discord.gift",
    "ssteam.site",
    "steamwalletgift.com",
    // IP loggers
    "grabify.link",
    "iplogger.org",
    "leancoding.co",
    "stopify.co",
    "yoütu.be",
    // Unhelpful
    "lmgtfy.com",
];

const DEFAULT_ATTACHMENT_BLACKLIST: &[&str] = &[
    "exe", "bat", "cmd", "com", "scr", "msi", "jar", "vbs", "ps1", "dll", "apk",
];

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Get default log path (relative to config directory).
/// This returns a placeholder; the actual path is set by ConfigService based on config file location.
pub fn default_log_path() -> PathBuf {
    default_log_path_for_config_dir(None)
}

/// Get log path based on config directory.
pub fn default_log_path_for_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
                .join("chat-warden")
        })
        .join("logs")
}
