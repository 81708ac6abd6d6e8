//! `help` command.

use async_trait::async_trait;

use crate::domain::commands::{Command, CommandHandler, CommandRouter, Invocation};
use crate::service::bot::Bot;

pub(super) fn register(commands: &mut CommandRouter<Bot>) {
    commands.register(
        Command::new("help", HelpCommand)
            .alias("h")
            .signature("[command]")
            .help("List the available commands, or show help for one of them."),
    );
}

struct HelpCommand;

impl HelpCommand {
    fn summary(bot: &Bot) -> String {
        let router = bot.commands();
        let entries: Vec<String> = router
            .commands()
            .iter()
            .filter(|c| !c.is_hidden() && c.is_enabled())
            .map(|c| {
                let short = c.help_text().lines().next().unwrap_or_default();
                format!("`{}`\n{}", c.usage(router.prefix()), short)
            })
            .collect();

        format!("**Command Help**\n\n{}", entries.join("\n\n"))
    }

    fn detail(bot: &Bot, name: &str) -> String {
        let router = bot.commands();
        match router.resolve(name) {
            Some(command) => {
                let mut text = format!("**Command Help**\n\n`{}`", command.usage(router.prefix()));
                if !command.aliases().is_empty() {
                    text.push_str(&format!("\nAliases: {}", command.aliases().join(", ")));
                }
                if !command.help_text().is_empty() {
                    text.push_str("\n\n");
                    text.push_str(command.help_text());
                }
                text
            }
            None => "Unknown command.".to_string(),
        }
    }
}

#[async_trait]
impl CommandHandler<Bot> for HelpCommand {
    async fn call(&self, inv: Invocation<'_, Bot>) -> anyhow::Result<()> {
        let bot = inv.ctx;
        let content = match inv.args.first() {
            Some(name) => Self::detail(bot, name),
            None => Self::summary(bot),
        };

        bot.platform()
            .send_message(inv.message.channel_id, &content)
            .await?;
        Ok(())
    }
}
