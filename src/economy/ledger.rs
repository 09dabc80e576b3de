//! Ledger operations over a [`UserRecord`].
//!
//! The `impl UserRecord` block holds the pure mutations. Each one takes `now` explicitly so
//! booster expiry is deterministic under test. [`Ledger`] wraps an [`EconomyStore`] and
//! exposes the same operations keyed by user id, each a single read-modify-write.
//!
//! Boosters are applied at the moment a reward is computed and are never stored
//! pre-multiplied. Debits clamp at zero; callers check [`UserRecord::has_balance`] first.
use chrono::{DateTime, Duration, Utc};

use crate::economy::errors::EconomyError;
use crate::economy::storage::EconomyStore;
use crate::economy::types::{Booster, BoosterKind, Rarity, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub leveled_up: bool,
    pub new_level: u32,
    pub gained: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Gambled,
    Won,
    Lost,
    Command,
}

impl UserRecord {
    /// Multiply `amount` by the active booster of `kind`, if any.
    pub fn boosted(&self, kind: BoosterKind, amount: u64, now: DateTime<Utc>) -> u64 {
        match self.active_booster(kind, now) {
            Some(b) => b.apply(amount),
            None => amount,
        }
    }

    /// Add currency through the money booster. Returns the new balance.
    pub fn credit(&mut self, amount: u64, now: DateTime<Utc>) -> u64 {
        let gained = self.boosted(BoosterKind::Money, amount, now);
        self.balance = self.balance.saturating_add(gained);
        self.balance
    }

    /// Add currency with no booster applied (sales, admin grants, refunds of escrow).
    pub fn credit_raw(&mut self, amount: u64) -> u64 {
        self.balance = self.balance.saturating_add(amount);
        self.balance
    }

    /// Subtract currency, clamped at zero. Returns the new balance.
    pub fn debit(&mut self, amount: u64) -> u64 {
        self.balance = self.balance.saturating_sub(amount);
        self.balance
    }

    pub fn has_balance(&self, amount: u64) -> bool {
        self.balance >= amount
    }

    /// Check sufficiency and debit in one step.
    pub fn try_debit(&mut self, amount: u64) -> Result<u64, EconomyError> {
        if !self.has_balance(amount) {
            return Err(EconomyError::InsufficientFunds {
                needed: amount,
                available: self.balance,
            });
        }
        Ok(self.debit(amount))
    }

    /// Take a gambling stake: debit it and count it as gambled.
    pub fn place_stake(&mut self, stake: u64) -> Result<(), EconomyError> {
        self.try_debit(stake)?;
        self.record_stat(StatKind::Gambled, stake);
        Ok(())
    }

    /// Accrue experience through the exp booster. Level is recomputed but never lowered.
    pub fn add_experience(&mut self, amount: u64, now: DateTime<Utc>) -> LevelChange {
        let gained = self.boosted(BoosterKind::Exp, amount, now);
        self.experience = self.experience.saturating_add(gained);
        let computed = Self::level_for_experience(self.experience);
        let leveled_up = computed > self.level;
        if leveled_up {
            self.level = computed;
        }
        LevelChange {
            leveled_up,
            new_level: self.level,
            gained,
        }
    }

    /// Set level directly; experience is moved to the floor of that level.
    pub fn set_level(&mut self, level: u32) {
        self.level = level.max(1);
        self.experience = u64::from(self.level - 1) * crate::economy::types::EXPERIENCE_PER_LEVEL;
    }

    /// Install a booster, replacing any existing one of the same kind.
    pub fn add_booster(
        &mut self,
        kind: BoosterKind,
        multiplier: f64,
        duration: Duration,
        now: DateTime<Utc>,
    ) {
        self.boosters.insert(
            kind,
            Booster {
                multiplier,
                expires_at: now + duration,
            },
        );
    }

    /// The booster of `kind` if it has not expired. Expired entries are left for the sweep.
    pub fn active_booster(&self, kind: BoosterKind, now: DateTime<Utc>) -> Option<&Booster> {
        self.boosters.get(&kind).filter(|b| b.is_active(now))
    }

    /// Drop every expired booster. Returns how many were removed.
    pub fn expire_boosters(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.boosters.len();
        self.boosters.retain(|_, b| b.is_active(now));
        before - self.boosters.len()
    }

    pub fn record_stat(&mut self, kind: StatKind, amount: u64) {
        match kind {
            StatKind::Gambled => self.total_gambled = self.total_gambled.saturating_add(amount),
            StatKind::Won => self.total_won = self.total_won.saturating_add(amount),
            StatKind::Lost => self.total_lost = self.total_lost.saturating_add(amount),
            StatKind::Command => self.commands_used = self.commands_used.saturating_add(1),
        }
    }

    pub fn add_animal(&mut self, rarity: Rarity, species: &str, count: u64) {
        *self
            .animals
            .entry(rarity)
            .or_default()
            .entry(species.to_string())
            .or_insert(0) += count;
        self.total_animals_found = self.total_animals_found.saturating_add(count);
    }

    /// Remove one animal; prunes empty maps. Returns false if none owned.
    pub fn remove_animal(&mut self, rarity: Rarity, species: &str) -> bool {
        let Some(by_species) = self.animals.get_mut(&rarity) else {
            return false;
        };
        let Some(count) = by_species.get_mut(species) else {
            return false;
        };
        if *count == 0 {
            return false;
        }
        *count -= 1;
        if *count == 0 {
            by_species.remove(species);
        }
        if by_species.is_empty() {
            self.animals.remove(&rarity);
        }
        true
    }
}

/// User-id keyed ledger over the persistent store, pinned to one clock reading.
///
/// Handlers that touch a single user with a single mutation go through here. Anything that
/// has to validate and mutate together (wagers, claims, transfers) uses
/// [`EconomyStore::update_user`] directly.
pub struct Ledger<'a> {
    store: &'a EconomyStore,
    now: DateTime<Utc>,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a EconomyStore) -> Self {
        Self::at(store, Utc::now())
    }

    pub fn at(store: &'a EconomyStore, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    /// Credit with any active money booster applied.
    pub fn credit(&self, user_id: &str, amount: u64) -> Result<u64, EconomyError> {
        let now = self.now;
        self.store
            .update_user(user_id, |rec| Ok(rec.credit(amount, now)))
    }

    /// Credit exactly `amount`, ignoring boosters.
    pub fn grant(&self, user_id: &str, amount: u64) -> Result<u64, EconomyError> {
        self.store
            .update_user(user_id, |rec| Ok(rec.credit_raw(amount)))
    }

    pub fn debit(&self, user_id: &str, amount: u64) -> Result<u64, EconomyError> {
        self.store.update_user(user_id, |rec| Ok(rec.debit(amount)))
    }

    pub fn has_balance(&self, user_id: &str, amount: u64) -> Result<bool, EconomyError> {
        Ok(self.store.get_user(user_id)?.has_balance(amount))
    }

    pub fn add_experience(&self, user_id: &str, amount: u64) -> Result<LevelChange, EconomyError> {
        let now = self.now;
        self.store
            .update_user(user_id, |rec| Ok(rec.add_experience(amount, now)))
    }

    pub fn add_booster(
        &self,
        user_id: &str,
        kind: BoosterKind,
        multiplier: f64,
        duration: Duration,
    ) -> Result<(), EconomyError> {
        let now = self.now;
        self.store.update_user(user_id, |rec| {
            rec.add_booster(kind, multiplier, duration, now);
            Ok(())
        })
    }

    pub fn get_active_booster(
        &self,
        user_id: &str,
        kind: BoosterKind,
    ) -> Result<Option<Booster>, EconomyError> {
        let rec = self.store.get_user(user_id)?;
        Ok(rec.active_booster(kind, self.now).cloned())
    }

    pub fn update_stats(&self, user_id: &str, kind: StatKind, amount: u64) -> Result<(), EconomyError> {
        self.store.update_user(user_id, |rec| {
            rec.record_stat(kind, amount);
            Ok(())
        })
    }

    pub fn add_animal(
        &self,
        user_id: &str,
        rarity: Rarity,
        species: &str,
        count: u64,
    ) -> Result<(), EconomyError> {
        self.store.update_user(user_id, |rec| {
            rec.add_animal(rarity, species, count);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec() -> UserRecord {
        UserRecord::new("u", Utc::now())
    }

    #[test]
    fn debit_clamps_at_zero() {
        let mut r = rec();
        assert_eq!(r.debit(300), 700);
        assert_eq!(r.debit(5000), 0);
        assert_eq!(r.balance, 0);
    }

    #[test]
    fn try_debit_rejects_without_mutation() {
        let mut r = rec();
        let err = r.try_debit(1001).unwrap_err();
        assert!(matches!(
            err,
            EconomyError::InsufficientFunds {
                needed: 1001,
                available: 1000
            }
        ));
        assert_eq!(r.balance, 1000);
    }

    #[test]
    fn money_booster_doubles_until_expiry() {
        let now = Utc::now();
        let mut r = rec();
        r.add_booster(BoosterKind::Money, 2.0, Duration::minutes(60), now);
        assert_eq!(r.credit(100, now), 1200);
        let later = now + Duration::minutes(61);
        assert_eq!(r.credit(100, later), 1300);
    }

    #[test]
    fn booster_is_overwritten_not_stacked() {
        let now = Utc::now();
        let mut r = rec();
        r.add_booster(BoosterKind::Exp, 2.0, Duration::minutes(60), now);
        r.add_booster(BoosterKind::Exp, 3.0, Duration::minutes(5), now);
        let b = r.active_booster(BoosterKind::Exp, now).unwrap();
        assert_eq!(b.multiplier, 3.0);
        assert_eq!(b.expires_at, now + Duration::minutes(5));
        assert!(r
            .active_booster(BoosterKind::Exp, now + Duration::minutes(5))
            .is_none());
    }

    #[test]
    fn experience_levels_are_monotonic() {
        let now = Utc::now();
        let mut r = rec();
        let change = r.add_experience(250, now);
        assert!(change.leveled_up);
        assert_eq!(change.new_level, 3);
        assert_eq!(r.level, UserRecord::level_for_experience(r.experience));

        let change = r.add_experience(10, now);
        assert!(!change.leveled_up);
        assert_eq!(change.new_level, 3);

        // A level set above the experience floor is kept by later accrual.
        r.level = 9;
        let change = r.add_experience(1, now);
        assert_eq!(change.new_level, 9);
    }

    #[test]
    fn exp_booster_applies_to_experience() {
        let now = Utc::now();
        let mut r = rec();
        r.add_booster(BoosterKind::Exp, 2.0, Duration::minutes(1), now);
        let change = r.add_experience(60, now);
        assert_eq!(change.gained, 120);
        assert_eq!(r.level, 2);
    }

    #[test]
    fn expire_boosters_removes_only_stale() {
        let now = Utc::now();
        let mut r = rec();
        r.add_booster(BoosterKind::Money, 2.0, Duration::minutes(-1), now);
        r.add_booster(BoosterKind::Exp, 2.0, Duration::minutes(10), now);
        assert_eq!(r.expire_boosters(now), 1);
        assert!(r.boosters.contains_key(&BoosterKind::Exp));
    }

    #[test]
    fn remove_animal_prunes_empty_maps() {
        let mut r = rec();
        r.add_animal(Rarity::Rare, "fox", 1);
        assert_eq!(r.total_animals_found, 1);
        assert!(r.remove_animal(Rarity::Rare, "fox"));
        assert!(r.animals.is_empty());
        assert!(!r.remove_animal(Rarity::Rare, "fox"));
    }

    #[test]
    fn set_level_moves_experience_floor() {
        let mut r = rec();
        r.set_level(12);
        assert_eq!(r.level, 12);
        assert_eq!(r.experience, 1100);
    }
}
