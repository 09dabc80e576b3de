//! Hunting, selling and the zoo summary.
//!
//! A hunt either ends in a distraction (no reward) or picks a rarity tier by weight,
//! then a species uniformly within that tier. The find pays the species value through
//! the money booster and `rarity value / 20` experience. Legendary and better finds have
//! a small chance to grant a 2x booster for an hour.
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::HuntingConfig;
use crate::economy::{
    AnimalCatalog, BoosterKind, EconomyError, LevelChange, Rarity, UserRecord,
};
use crate::games::weighted::pick_weighted;

pub const DISTRACTIONS: [(&str, &str); 12] = [
    ("📱", "got distracted by your phone"),
    ("🍕", "got hungry and went to get pizza"),
    ("😴", "fell asleep while waiting"),
    ("🌧️", "got caught in the rain and ran for shelter"),
    ("🎮", "got distracted by a game notification"),
    ("📺", "got distracted by a funny video"),
    ("🚗", "had to help a friend with car trouble"),
    ("☕", "needed a coffee break"),
    ("📚", "remembered you had homework to do"),
    ("🐱", "got distracted by a cute cat"),
    ("🎵", "stopped to listen to your favorite song"),
    ("💤", "dozed off and missed all the animals"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Find {
    pub rarity: Rarity,
    pub species_key: String,
    pub name: String,
    pub emoji: String,
    pub coins: u64,
    pub balance: u64,
    pub exp: LevelChange,
    pub bonus_booster: Option<BoosterKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HuntOutcome {
    Distracted {
        emoji: &'static str,
        text: &'static str,
    },
    Found(Find),
}

pub fn hunt<R: Rng + ?Sized>(
    user: &mut UserRecord,
    catalog: &AnimalCatalog,
    cfg: &HuntingConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<HuntOutcome, EconomyError> {
    user.last_hunt = Some(now);
    if rng.gen::<f64>() < cfg.distraction_chance {
        let (emoji, text) = DISTRACTIONS
            .choose(rng)
            .copied()
            .unwrap_or(DISTRACTIONS[0]);
        return Ok(HuntOutcome::Distracted { emoji, text });
    }

    let tier = pick_weighted(&cfg.rarities, |r| r.weight, rng)
        .ok_or_else(|| EconomyError::Internal("rarity table has no weights".into()))?;
    let found = catalog
        .random_species(tier.rarity, rng)
        .ok_or_else(|| EconomyError::NotFound(format!("no animals for rarity {}", tier.rarity)))?;

    let (key, name, emoji, value) = (
        found.key.to_string(),
        found.species.name.clone(),
        found.species.emoji.clone(),
        found.species.value,
    );
    user.add_animal(tier.rarity, &key, 1);

    let before = user.balance;
    user.credit(value, now);
    let coins = user.balance - before;
    let exp = user.add_experience(tier.value / cfg.exp_divisor.max(1), now);

    let mut bonus_booster = None;
    if tier.rarity.grants_bonus_booster() && rng.gen::<f64>() < cfg.bonus_booster_chance {
        let kind = if rng.gen_bool(0.5) {
            BoosterKind::Money
        } else {
            BoosterKind::Exp
        };
        user.add_booster(kind, 2.0, Duration::minutes(cfg.bonus_booster_minutes), now);
        bonus_booster = Some(kind);
    }

    Ok(HuntOutcome::Found(Find {
        rarity: tier.rarity,
        species_key: key,
        name,
        emoji,
        coins,
        balance: user.balance,
        exp,
        bonus_booster,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    pub animals_sold: u64,
    pub value: u64,
    pub balance: u64,
    /// Name of the species when a single animal was sold.
    pub species: Option<String>,
}

/// Sell the whole collection at catalog value. Sales bypass boosters.
pub fn sell_all(user: &mut UserRecord, catalog: &AnimalCatalog) -> Result<Sale, EconomyError> {
    let count = user.animal_count();
    if count == 0 {
        return Err(EconomyError::InvalidArgument(
            "you don't have any animals to sell".into(),
        ));
    }
    let value = catalog.collection_value(user);
    user.animals.clear();
    user.credit_raw(value);
    Ok(Sale {
        animals_sold: count,
        value,
        balance: user.balance,
        species: None,
    })
}

/// Sell one animal whose species name or key contains `query`.
pub fn sell_one(
    user: &mut UserRecord,
    catalog: &AnimalCatalog,
    query: &str,
) -> Result<Sale, EconomyError> {
    let hit = catalog
        .find_owned(user, query)
        .ok_or_else(|| EconomyError::NotFound(format!("you don't own any '{}'", query.trim())))?;
    let (rarity, key, name, value) = (
        hit.rarity,
        hit.key.to_string(),
        hit.species.name.clone(),
        hit.species.value,
    );
    if !user.remove_animal(rarity, &key) {
        return Err(EconomyError::NotFound(format!("you don't own any '{}'", name)));
    }
    user.credit_raw(value);
    Ok(Sale {
        animals_sold: 1,
        value,
        balance: user.balance,
        species: Some(name),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierSummary {
    pub rarity: Rarity,
    pub count: u64,
    pub value: u64,
    pub unique: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZooSummary {
    pub tiers: Vec<TierSummary>,
    pub total_animals: u64,
    pub total_value: u64,
    pub unique_species: usize,
    pub achievements: Vec<&'static str>,
}

pub fn zoo_summary(user: &UserRecord, catalog: &AnimalCatalog) -> ZooSummary {
    let mut tiers = Vec::new();
    for (rarity, owned) in &user.animals {
        let count: u64 = owned.values().sum();
        if count == 0 {
            continue;
        }
        let value = owned
            .iter()
            .map(|(k, c)| catalog.get(*rarity, k).map(|s| s.value * c).unwrap_or(0))
            .sum();
        tiers.push(TierSummary {
            rarity: *rarity,
            count,
            value,
            unique: owned.values().filter(|c| **c > 0).count(),
        });
    }
    let total_animals = tiers.iter().map(|t| t.count).sum();
    let total_value = tiers.iter().map(|t| t.value).sum();
    let unique_species = tiers.iter().map(|t| t.unique).sum();

    let mut achievements = Vec::new();
    if user.total_animals_found >= 100 {
        achievements.push("🏆 Animal Hunter (100+ finds)");
    }
    if user.total_animals_found >= 500 {
        achievements.push("🥇 Animal Master (500+ finds)");
    }
    if total_value >= 100_000 {
        achievements.push("💰 Wealthy Collector (100k+ value)");
    }
    if tiers.len() >= 5 {
        achievements.push("🌈 Rarity Collector (5+ rarities)");
    }
    if tiers.iter().any(|t| t.rarity == Rarity::Priceless) {
        achievements.push("⭐ Priceless Collector");
    }
    if tiers.iter().any(|t| t.rarity == Rarity::Mythical) {
        achievements.push("✨ Mythical Hunter");
    }

    ZooSummary {
        tiers,
        total_animals,
        total_value,
        unique_species,
        achievements,
    }
}
