//! chat-warden: moderation and automation core for group-chat communities.
//!
//! Commands and event handlers are gated by composable checks. Messages run
//! through an ordered content filter chain and sliding-window antispam rules.
//! Temporary actions (timed bans, mutes, channel silences) are reversed by a
//! cancellable scheduler.

pub mod cli;
pub mod config;
pub mod domain;
pub mod service;

#[cfg(test)]
mod test_support;
