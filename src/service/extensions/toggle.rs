//! `toggle` command: enable or disable another command at runtime.

use async_trait::async_trait;
use tracing::info;

use super::{default_check, has_role};
use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::domain::directory::ConfiguredRole;
use crate::service::bot::Bot;

const NAME: &str = "toggle";

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new(NAME, ToggleCommand)
            .checks([default_check(), has_role(ConfiguredRole::Admin)])
            .signature("<command>")
            .help("Enable or disable a command."),
    );
}

struct ToggleCommand;

#[async_trait]
impl CommandHandler<Bot> for ToggleCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let channel = inv.message.channel_id;

        let reply = match inv.args.first() {
            None => format!(":x: Usage: `{}{} <command>`", bot.commands().prefix(), NAME),
            Some(name) => match bot.commands().resolve(name) {
                None => format!(":x: Unknown command `{}`.", name),
                Some(command) if command.name() == NAME => {
                    format!(":x: `{}` can't be disabled.", NAME)
                }
                Some(command) => {
                    let enabled = !command.is_enabled();
                    command.set_enabled(enabled);
                    info!(
                        command = command.name(),
                        enabled,
                        actor = %inv.message.author.id,
                        "Command toggled"
                    );
                    format!(
                        ":white_check_mark: Command `{}` is now {}.",
                        command.name(),
                        if enabled { "enabled" } else { "disabled" }
                    )
                }
            },
        };

        bot.platform().send_message(channel, &reply).await?;
        Ok(())
    }
}
