//! Prefix commands and event handlers.

mod command;
mod events;
mod router;

pub use command::{Command, CommandHandler, Invocation};
pub use events::{EventHandler, EventRouter};
pub use router::{CommandRouter, Dispatch};
