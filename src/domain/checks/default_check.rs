//! The baseline check applied to almost every handler.

use async_trait::async_trait;
use tracing::debug;

use super::{Check, CheckContext};
use crate::domain::error::Result;

/// Passes for messages that:
///
/// - were sent to the configured guild
/// - weren't sent by the bot itself
/// - weren't sent by another bot
pub struct DefaultCheck;

#[async_trait]
impl Check for DefaultCheck {
    fn name(&self) -> String {
        "default".to_string()
    }

    async fn check(&self, ctx: &CheckContext<'_>) -> Result<bool> {
        let Some(message) = ctx.message() else {
            return Ok(false);
        };

        if message.guild_id != Some(ctx.directory.guild_id()) {
            debug!("Failing check: Not in the correct guild");
            return Ok(false);
        }
        if ctx.self_id == Some(message.author.id) {
            debug!("Failing check: We sent this message");
            return Ok(false);
        }
        if message.author.bot {
            debug!("Failing check: This message was sent by another bot");
            return Ok(false);
        }

        Ok(true)
    }
}
