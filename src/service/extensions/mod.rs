//! Extensions wire checks, filters, antispam and commands into the bot.
//!
//! Each extension registers its commands and event handlers once, when the
//! bot is built.

mod antispam;
mod clean;
mod filters;
mod guild;
mod help;
mod moderation;
mod silence;
mod toggle;
mod user;
mod verification;

use std::sync::Arc;

use crate::config::Config;
use crate::domain::checks::{any, check_fn, Check, CheckOperation, DefaultCheck, RoleCheck};
use crate::domain::commands::{CommandRouter, EventRouter};
use crate::domain::directory::ConfiguredRole;
use crate::service::bot::Bot;

pub use moderation::Punishments;
pub use silence::Silences;

/// Register every extension, in the order their handlers should run.
pub fn register_all(
    config: &Config,
    commands: &mut CommandRouter<Bot>,
    events: &mut EventRouter<Bot>,
) {
    guild::register(events);
    filters::register(events);
    verification::register(commands, events);
    if config.antispam.enabled {
        antispam::register(events);
    }
    moderation::register(commands);
    silence::register(commands);
    clean::register(commands);
    user::register(commands);
    help::register(commands);
    toggle::register(commands);
}

fn default_check() -> Arc<dyn Check> {
    Arc::new(DefaultCheck)
}

/// The author holds `role`.
fn has_role(role: ConfiguredRole) -> Arc<dyn Check> {
    Arc::new(RoleCheck::configured(role, CheckOperation::Contains))
}

/// The author's top role ranks below `role`. Authors without roles, or not
/// cached as members, pass.
fn top_role_below(role: ConfiguredRole) -> Arc<dyn Check> {
    let no_roles = check_fn("no roles", |ctx| {
        ctx.message().is_some_and(|m| {
            ctx.directory
                .member_roles(m.author.id)
                .map_or(true, |roles| roles.is_empty())
        })
    });
    let outranked: Arc<dyn Check> = Arc::new(RoleCheck::configured(role, CheckOperation::Higher));
    any(vec![no_roles, outranked])
}
