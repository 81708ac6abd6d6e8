//! Domain layer containing core business logic.
//!
//! This module contains:
//! - Entities, ids and the inbound event union
//! - Checks, filters, antispam rules and the command router
//! - The deferred task scheduler
//! - Collaborator traits for the platform, message history and infraction sink
//! - Tokenizer, duration parser and logger

pub mod antispam;
pub mod checks;
pub mod commands;
pub mod directory;
pub mod error;
pub mod filters;
pub mod logger;
pub mod moderation;
pub mod notify;
pub mod parser;
pub mod platform;
pub mod scheduler;
pub mod types;

pub use directory::{ConfiguredChannel, ConfiguredRole, Directory, GuildCache};
pub use error::{PlatformError, Result, WardenError};
pub use filters::FilterChain;
pub use scheduler::Scheduler;
