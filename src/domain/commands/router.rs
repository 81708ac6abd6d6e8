//! Command registration, resolution and invocation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::{Command, Invocation};
use crate::domain::checks::{all_pass, CheckContext};
use crate::domain::directory::Directory;
use crate::domain::parser::split_command;
use crate::domain::types::{Event, UserId};

/// What happened to a message offered to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The event carries no message, or the message lacks the prefix.
    NotCommand,
    /// Sent by the bot itself.
    Ignored,
    /// Prefixed, but the first token names no command.
    Unknown(String),
    Disabled(String),
    /// A check returned `false`; nothing was run.
    ChecksFailed(String),
    /// A check could not be evaluated, e.g. a configured role is missing.
    CheckError(String),
    Completed(String),
    /// The handler returned an error or panicked; it was logged.
    Failed(String),
}

/// Table of commands keyed by name and alias.
pub struct CommandRouter<C> {
    prefix: String,
    commands: Vec<Arc<Command<C>>>,
}

impl<C: Sync> CommandRouter<C> {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a command.
    ///
    /// Returns `false` and leaves the table untouched if the command's name is
    /// already taken by another command's name or alias, or if one of its
    /// aliases is another command's name.
    pub fn register(&mut self, command: Command<C>) -> bool {
        let name = command.name();

        if let Some(existing) = self.resolve(name) {
            warn!(
                command = name,
                existing = existing.name(),
                "Command name already registered"
            );
            return false;
        }

        if let Some(alias) = command
            .aliases()
            .iter()
            .find(|alias| self.commands.iter().any(|c| c.name() == alias.as_str()))
        {
            warn!(command = name, alias = %alias, "Alias collides with a registered command");
            return false;
        }

        debug!(command = name, "Registered command");
        self.commands.push(Arc::new(command));
        true
    }

    /// Find a command by exact name, then by alias.
    pub fn resolve(&self, name: &str) -> Option<&Arc<Command<C>>> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .or_else(|| {
                self.commands
                    .iter()
                    .find(|c| c.aliases().iter().any(|a| a == name))
            })
    }

    pub fn commands(&self) -> &[Arc<Command<C>>] {
        &self.commands
    }

    /// Route a newly created message to its command.
    ///
    /// Edits never invoke commands. Self-authored messages are dropped before
    /// anything else. Checks run in order and stop at the first failure.
    /// Handler errors and panics are logged with the command name and event
    /// and never propagate.
    pub async fn dispatch(
        &self,
        ctx: &C,
        event: &Event,
        directory: &Directory,
        self_id: Option<UserId>,
    ) -> Dispatch {
        let Event::MessageCreate(message) = event else {
            return Dispatch::NotCommand;
        };

        if self_id == Some(message.author.id) {
            return Dispatch::Ignored;
        }

        let Some((name, args)) = split_command(&message.content, &self.prefix) else {
            return Dispatch::NotCommand;
        };

        let Some(command) = self.resolve(&name) else {
            debug!(command = %name, "Unknown command");
            return Dispatch::Unknown(name);
        };
        let command_name = command.name().to_string();

        if !command.is_enabled() {
            debug!(command = %command_name, "Command is disabled");
            return Dispatch::Disabled(command_name);
        }

        let check_ctx = CheckContext::new(event, directory, self_id).with_args(&args);
        match all_pass(command.check_list(), &check_ctx).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(command = %command_name, "Command checks failed");
                return Dispatch::ChecksFailed(command_name);
            }
            Err(e) => {
                error!(command = %command_name, event = %event, error = %e, "Unable to evaluate command checks");
                return Dispatch::CheckError(command_name);
            }
        }

        let invocation = Invocation {
            ctx,
            event,
            message,
            invoked_as: &name,
            args: &args,
        };

        let outcome = AssertUnwindSafe(command.handler().call(invocation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => Dispatch::Completed(command_name),
            Ok(Err(e)) => {
                error!(
                    error = %format!("{:#}", e),
                    "Error while executing command {} ({})", command_name, event
                );
                Dispatch::Failed(command_name)
            }
            Err(_) => {
                error!("Command {} panicked ({})", command_name, event);
                Dispatch::Failed(command_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::checks::check_fn;
    use crate::domain::commands::CommandHandler;
    use crate::test_support;

    type Log = Mutex<Vec<String>>;

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        Fail,
        Panic,
    }

    struct Recorder(Outcome);

    #[async_trait]
    impl CommandHandler<Log> for Recorder {
        async fn call(&self, invocation: Invocation<'_, Log>) -> anyhow::Result<()> {
            let mut line = invocation.invoked_as.to_string();
            for arg in invocation.args {
                line.push(' ');
                line.push_str(arg);
            }
            invocation.ctx.lock().unwrap().push(line);

            match self.0 {
                Outcome::Ok => Ok(()),
                Outcome::Fail => anyhow::bail!("handler failed"),
                Outcome::Panic => panic!("handler panicked"),
            }
        }
    }

    fn router() -> CommandRouter<Log> {
        let mut router = CommandRouter::new("!");
        assert!(router.register(
            Command::new("silence", Recorder(Outcome::Ok))
                .alias("hush")
                .alias("shh")
        ));
        assert!(router.register(Command::new("fail", Recorder(Outcome::Fail))));
        assert!(router.register(Command::new("panic", Recorder(Outcome::Panic))));
        router
    }

    async fn dispatch(router: &CommandRouter<Log>, author: UserId, content: &str) -> (Dispatch, Vec<String>) {
        let log = Log::default();
        let directory = test_support::directory();
        let event = Event::MessageCreate(test_support::message(1, author, content));
        let outcome = router
            .dispatch(&log, &event, &directory, Some(test_support::SELF))
            .await;
        (outcome, log.into_inner().unwrap())
    }

    #[test]
    fn test_duplicate_names_and_aliases_are_rejected() {
        let mut router = router();

        assert!(!router.register(Command::new("silence", Recorder(Outcome::Ok))));
        assert!(!router.register(Command::new("hush", Recorder(Outcome::Ok))));
        assert!(!router.register(Command::new("quiet", Recorder(Outcome::Ok)).alias("fail")));

        let names: Vec<&str> = router.commands().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["silence", "fail", "panic"]);
    }

    #[test]
    fn test_resolve_prefers_names_over_aliases() {
        let mut router = router();
        assert!(router.register(Command::new("other", Recorder(Outcome::Ok)).alias("panic2")));

        assert_eq!(router.resolve("shh").map(|c| c.name()), Some("silence"));
        assert_eq!(router.resolve("panic").map(|c| c.name()), Some("panic"));
        assert_eq!(router.resolve("panic2").map(|c| c.name()), Some("other"));
        assert!(router.resolve("missing").is_none());
    }

    #[tokio::test]
    async fn test_dispatch_by_alias_passes_arguments() {
        let router = router();
        let (outcome, log) = dispatch(&router, test_support::MEMBER, "!hush 10 m").await;

        assert_eq!(outcome, Dispatch::Completed("silence".to_string()));
        assert_eq!(log, vec!["hush 10 m"]);
    }

    #[tokio::test]
    async fn test_non_commands_and_unknown_commands() {
        let router = router();

        let (outcome, _) = dispatch(&router, test_support::MEMBER, "hello !silence").await;
        assert_eq!(outcome, Dispatch::NotCommand);

        let (outcome, log) = dispatch(&router, test_support::MEMBER, "!nope").await;
        assert_eq!(outcome, Dispatch::Unknown("nope".to_string()));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_edits_never_invoke_commands() {
        let router = router();
        let log = Log::default();
        let event = Event::MessageUpdate(test_support::message(1, test_support::MEMBER, "!silence"));

        let outcome = router
            .dispatch(&log, &event, &test_support::directory(), Some(test_support::SELF))
            .await;
        assert_eq!(outcome, Dispatch::NotCommand);
        assert!(log.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let router = router();
        let (outcome, log) = dispatch(&router, test_support::SELF, "!silence").await;

        assert_eq!(outcome, Dispatch::Ignored);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_failing_check_prevents_the_handler() {
        let mut router = CommandRouter::new("!");
        router.register(
            Command::new("guarded", Recorder(Outcome::Ok))
                .check(check_fn("no", |_| false))
                .check(check_fn("unreachable", |_| panic!("evaluated after a failure"))),
        );

        let (outcome, log) = dispatch(&router, test_support::MEMBER, "!guarded").await;
        assert_eq!(outcome, Dispatch::ChecksFailed("guarded".to_string()));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_command_is_not_run() {
        let router = router();
        router.resolve("silence").unwrap().set_enabled(false);

        let (outcome, log) = dispatch(&router, test_support::MEMBER, "!silence").await;
        assert_eq!(outcome, Dispatch::Disabled("silence".to_string()));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_handler_errors_and_panics_are_contained() {
        let router = router();

        let (outcome, log) = dispatch(&router, test_support::MEMBER, "!fail").await;
        assert_eq!(outcome, Dispatch::Failed("fail".to_string()));
        assert_eq!(log, vec!["fail"]);

        let (outcome, _) = dispatch(&router, test_support::MEMBER, "!panic").await;
        assert_eq!(outcome, Dispatch::Failed("panic".to_string()));

        let (outcome, _) = dispatch(&router, test_support::MEMBER, "!silence").await;
        assert_eq!(outcome, Dispatch::Completed("silence".to_string()));
    }
}
