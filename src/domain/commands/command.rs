//! Command definitions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::checks::Check;
use crate::domain::types::{Event, Message};

/// Everything a handler is called with.
pub struct Invocation<'a, C> {
    /// Shared application context.
    pub ctx: &'a C,
    pub event: &'a Event,
    pub message: &'a Message,
    /// The name or alias the command was invoked with.
    pub invoked_as: &'a str,
    pub args: &'a [String],
}

/// The body of a command.
#[async_trait]
pub trait CommandHandler<C: Sync>: Send + Sync {
    async fn call(&self, invocation: Invocation<'_, C>) -> anyhow::Result<()>;
}

/// A named command with aliases, checks and a handler.
pub struct Command<C> {
    name: String,
    aliases: Vec<String>,
    checks: Vec<Arc<dyn Check>>,
    help: String,
    signature: String,
    hidden: bool,
    enabled: AtomicBool,
    handler: Arc<dyn CommandHandler<C>>,
}

impl<C: Sync> Command<C> {
    pub fn new(name: impl Into<String>, handler: impl CommandHandler<C> + 'static) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            checks: Vec::new(),
            help: String::new(),
            signature: String::new(),
            hidden: false,
            enabled: AtomicBool::new(true),
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(mut self, checks: impl IntoIterator<Item = Arc<dyn Check>>) -> Self {
        self.checks.extend(checks);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Argument synopsis shown in help, e.g. `<user> [duration] [reason...]`.
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn check_list(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub(crate) fn handler(&self) -> &Arc<dyn CommandHandler<C>> {
        &self.handler
    }

    /// Usage line, e.g. `!ban <user> [duration] [reason...]`.
    pub fn usage(&self, prefix: &str) -> String {
        if self.signature.is_empty() {
            format!("{}{}", prefix, self.name)
        } else {
            format!("{}{} {}", prefix, self.name, self.signature)
        }
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("checks", &self.checks.len())
            .field("hidden", &self.hidden)
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}
