//! Reward resolution: everything that turns randomness into ledger mutations.
//!
//! Functions here operate on a `&mut UserRecord` and take the RNG and `now` as
//! parameters, so they are pure with respect to storage and deterministic under a seeded
//! RNG. Persisting the mutated record is the caller's job.

pub mod battle;
pub mod duel;
pub mod gambling;
pub mod hunt;
pub mod items;
pub mod rewards;
pub mod weighted;

pub use battle::{CombatStats, Enemy, FightReport};
pub use duel::{Duel, DuelReport, DuelState};
pub use weighted::pick_weighted;
