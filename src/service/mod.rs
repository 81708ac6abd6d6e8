//! Service layer: the bot context, event dispatch, extensions and the
//! collaborator implementations used by the CLI.

pub mod adapter;
mod bot;
mod bot_service;
mod dispatcher;
mod extensions;
mod memory;
mod recording;

pub use bot::Bot;
pub use bot_service::{BotService, Mode, ShutdownReport};
pub use dispatcher::{apply_state, handle_event, route_event};
pub use extensions::{Punishments, Silences};
pub use memory::{MemoryGuildCache, MemoryMessageHistory};
pub use recording::{Action, RecordingPlatform};
