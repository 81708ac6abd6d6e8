//! Configuration service for loading and generating config files.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::default_log_path_for_config_dir;
use super::Config;

/// Configuration service.
pub struct ConfigService;

impl ConfigService {
    /// Get the default configuration file path.
    /// Always uses ~/.config/chat-warden/config.toml for cross-platform consistency.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("chat-warden")
            .join("config.toml")
    }

    /// Load configuration from file.
    ///
    /// If `path` is `None`, uses the default path.
    /// If the file doesn't exist, creates default configuration file.
    /// Validates configuration after loading.
    /// Log path defaults to the same directory as config file.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);
        let config_dir = path.parent();

        if !path.exists() {
            // Create default config file
            Self::generate_at(&path)?;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // log_path equal to the general default means it wasn't set in the file
        let general_default = default_log_path_for_config_dir(None);
        if config.log_path == general_default {
            config.log_path = default_log_path_for_config_dir(config_dir);
        }

        // Validate configuration
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Parse configuration from a TOML string without touching the filesystem.
    pub fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    /// Generate default configuration file at the default path.
    pub fn generate_default() -> Result<()> {
        Self::generate_at(&Self::default_path())
    }

    /// Generate default configuration file at the specified path.
    pub fn generate_at(path: &Path) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate default configuration content with comments.
    fn default_config_content() -> &'static str {
        r#"# chat-warden configuration file

# Command prefix
prefix = "!"

# ID of the guild to moderate
guild_id = 0

# Also log to stderr (default: false)
debug = false

# Log level directive, RUST_LOG takes precedence (default: "info")
log_level = "info"

# Path to log directory (default: same directory as config.toml/logs)
# log_path = "~/.config/chat-warden/logs"

# Days to keep rotated log files (default: 2)
log_retention_days = 2

# Recent messages remembered per channel, used by the clean command (default: 1000)
message_cache_size = 1000

[roles]
admin = 0
moderator = 0
helper = 0
developer = 0
muted = 0

[channels]
alerts = 0
moderator_log = 0
bot_commands = 0
verification = 0

[filters]
# Seconds before a fallback in-channel notification is removed
notification_delete_secs = 10

# Invite codes that are allowed through the invite filter
invite_whitelist = []

# Top-level domain extensions to remove
extension_blacklist = ["adult", "porn", "sex", "xxx"]

# URL schemes to remove
scheme_blacklist = ["magnet"]

# domain_blacklist and attachment_blacklist ship with built-in defaults.
# Setting them here replaces the defaults entirely.
# domain_blacklist = ["grabify.link", "lmgtfy.com"]
# attachment_blacklist = ["exe", "bat", "scr"]

# Alert-only patterns (messages are kept)
# [[filters.regex]]
# pattern = "(?i)free\\s+nitro"
# description = "Nitro scam"

[antispam]
enabled = true
# Seconds until the muted role is removed again (0 keeps it)
mute_duration_secs = 600

messages = { window_secs = 10, threshold = 9 }
duplicates = { window_secs = 10, threshold = 3 }
mentions = { window_secs = 5, threshold = 9 }
links = { window_secs = 5, threshold = 9 }
emojis = { window_secs = 5, threshold = 9 }
"#
    }
}
