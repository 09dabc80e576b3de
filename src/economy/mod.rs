//! Economy data model and persistence.
//! User records, the sled-backed keyed store, ledger mutations (credit, debit,
//! experience, boosters, counters) and the species catalog.

pub mod catalog;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod types;

pub use catalog::{AnimalCatalog, Species, SpeciesRef};
pub use errors::EconomyError;
pub use ledger::{Ledger, LevelChange, StatKind};
pub use storage::{EconomyStore, EconomyStoreBuilder};
pub use types::{
    Booster, BoosterKind, Item, ItemSlot, Rarity, StatBonus, UserRecord, DEFAULT_BALANCE,
    EXPERIENCE_PER_LEVEL, USER_SCHEMA_VERSION,
};
