//! Chat-facing side of the bot: command parsing and dispatch, pending prompts,
//! scheduled maintenance and the optional health endpoint.

macro_rules! sec_log {
    ($($arg:tt)*) => { log::warn!(target: "security", $($arg)*); };
}
pub(crate) use sec_log;

pub mod admin;
pub mod commands;
pub mod health;
pub mod maintenance;
pub mod pending;
pub mod platform;
pub mod public;
pub mod registry;
pub mod roles;
pub mod server;

pub use platform::{InboundEvent, Outbound, ReactionEvent, TextEvent};
pub use server::BotServer;
