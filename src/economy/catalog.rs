//! Species catalog: rarity key -> species key -> {name, emoji, value}.
//!
//! A default catalog is compiled in from `data/animals.json`; deployments can point
//! `storage.catalog_path` at their own file with the same shape.
use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::economy::errors::EconomyError;
use crate::economy::types::{Rarity, UserRecord};

const EMBEDDED_CATALOG: &str = include_str!("../../data/animals.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    pub emoji: String,
    pub value: u64,
}

/// A catalog hit: where the species lives plus its definition.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesRef<'a> {
    pub rarity: Rarity,
    pub key: &'a str,
    pub species: &'a Species,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalCatalog {
    tiers: BTreeMap<Rarity, BTreeMap<String, Species>>,
}

impl AnimalCatalog {
    pub fn embedded() -> Result<Self, EconomyError> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    pub fn from_json_str(text: &str) -> Result<Self, EconomyError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EconomyError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&text)?;
        info!(
            "loaded animal catalog from {} ({} species)",
            path.as_ref().display(),
            catalog.species_count()
        );
        Ok(catalog)
    }

    pub fn species_count(&self) -> usize {
        self.tiers.values().map(|t| t.len()).sum()
    }

    pub fn tier(&self, rarity: Rarity) -> Option<&BTreeMap<String, Species>> {
        self.tiers.get(&rarity)
    }

    pub fn get(&self, rarity: Rarity, key: &str) -> Option<&Species> {
        self.tiers.get(&rarity).and_then(|t| t.get(key))
    }

    /// Uniform pick among the species of one tier.
    pub fn random_species<R: Rng + ?Sized>(&self, rarity: Rarity, rng: &mut R) -> Option<SpeciesRef<'_>> {
        let tier = self.tiers.get(&rarity)?;
        let (key, species) = tier.iter().choose(rng)?;
        Some(SpeciesRef {
            rarity,
            key: key.as_str(),
            species,
        })
    }

    /// First species (rarity order, then key order) whose name or key contains `query`.
    pub fn find(&self, query: &str) -> Option<SpeciesRef<'_>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.tiers.iter().find_map(|(rarity, tier)| {
            tier.iter()
                .find(|(key, sp)| {
                    key.to_lowercase().contains(&needle) || sp.name.to_lowercase().contains(&needle)
                })
                .map(|(key, species)| SpeciesRef {
                    rarity: *rarity,
                    key: key.as_str(),
                    species,
                })
        })
    }

    /// Like [`find`](Self::find) but restricted to species the user owns at least one of.
    pub fn find_owned<'a>(&'a self, user: &UserRecord, query: &str) -> Option<SpeciesRef<'a>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        for (rarity, owned) in &user.animals {
            for (key, count) in owned {
                if *count == 0 {
                    continue;
                }
                let Some(species) = self.get(*rarity, key) else {
                    continue;
                };
                if key.to_lowercase().contains(&needle)
                    || species.name.to_lowercase().contains(&needle)
                {
                    if let Some((k, _)) = self.tiers.get(rarity).and_then(|t| t.get_key_value(key)) {
                        return Some(SpeciesRef {
                            rarity: *rarity,
                            key: k.as_str(),
                            species,
                        });
                    }
                }
            }
        }
        None
    }

    /// Market value of a user's whole collection. Unknown species count as zero.
    pub fn collection_value(&self, user: &UserRecord) -> u64 {
        user.animals
            .iter()
            .flat_map(|(rarity, owned)| {
                owned
                    .iter()
                    .map(move |(key, count)| (*rarity, key.as_str(), *count))
            })
            .map(|(rarity, key, count)| self.get(rarity, key).map(|s| s.value * count).unwrap_or(0))
            .sum()
    }
}
