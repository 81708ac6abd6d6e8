//! Error types for chat-warden.

use thiserror::Error;

/// Main error type for chat-warden.
#[derive(Debug, Error)]
pub enum WardenError {
    /// A configured role could not be found in the guild directory
    #[error("Unable to find role with ID: {id}")]
    MissingRole { id: u64 },

    /// A configured channel could not be found in the guild directory
    #[error("Unable to find channel with ID: {id}")]
    MissingChannel { id: u64 },

    /// The configured guild could not be found
    #[error("Unable to find guild with ID: {id}")]
    MissingGuild { id: u64 },

    /// Duration string contained an unknown unit
    #[error("Invalid time unit `{unit}`")]
    InvalidDuration { unit: String },

    /// Duration exceeds what the scheduler accepts
    #[error("Duration is too long, the maximum is {max_days} days")]
    DurationTooLong { max_days: u64 },

    /// Outbound platform call failed
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl WardenError {
    /// Whether this error is one of the "missing object" configuration errors.
    pub fn is_missing_object(&self) -> bool {
        matches!(
            self,
            Self::MissingRole { .. } | Self::MissingChannel { .. } | Self::MissingGuild { .. }
        )
    }
}

/// Failure classification for calls made against the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The platform refused the request (e.g. the user disallows direct messages)
    #[error("forbidden")]
    Forbidden,

    /// The target no longer exists (e.g. the message was already deleted)
    #[error("not found")]
    NotFound,

    /// Anything else
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, WardenError>;
