//! # ksaekvat - economy and game chat bot
//!
//! A chat bot that keeps a persistent per-user ledger (balance, experience, level,
//! boosters, animal collection, equipment) and exposes it through prefixed chat commands:
//! daily/weekly/work rewards, payments, coinflip/dice/slots, animal hunting, PvE fights
//! and player duels.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ksaekvat::bot::BotServer;
//! use ksaekvat::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load("config.toml").await?;
//!     config.apply_env_overrides();
//!
//!     let mut server = BotServer::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - Dispatch server, command handlers, pending prompts, maintenance, health endpoint
//! - [`economy`] - User records, the sled-backed store, ledger mutations and the species catalog
//! - [`games`] - Reward, gambling, hunting, item and battle rules over a user record
//! - [`config`] - TOML configuration and environment overrides
//! - [`metrics`] - Process-local counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Bot Server    │ ← parsing, cooldowns, admin gate, 1s housekeeping tick
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Games         │ ← pure rules over &mut UserRecord with an injected Rng
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Economy       │ ← ledger operations and persistence
//! └─────────────────┘
//! ```

pub mod bot;
pub mod config;
pub mod economy;
pub mod games;
pub mod logutil;
pub mod metrics;
