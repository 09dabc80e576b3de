use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USER_SCHEMA_VERSION: u8 = 1;

pub const DEFAULT_BALANCE: u64 = 1000;
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Ordered rarity tiers for animals. Declaration order is the drop-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythical,
    Priceless,
}

impl Rarity {
    pub const ALL: [Rarity; 7] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
        Rarity::Mythical,
        Rarity::Priceless,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
            Rarity::Mythical => "mythical",
            Rarity::Priceless => "priceless",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Mythical => "Mythical",
            Rarity::Priceless => "Priceless",
        }
    }

    /// Parse from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Tiers that can roll a bonus booster on a successful hunt.
    pub fn grants_bonus_booster(&self) -> bool {
        matches!(self, Rarity::Legendary | Rarity::Mythical | Rarity::Priceless)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoosterKind {
    Money,
    Exp,
}

impl BoosterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoosterKind::Money => "money",
            BoosterKind::Exp => "exp",
        }
    }
}

/// A time-boxed multiplier. Active iff `expires_at > now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booster {
    pub multiplier: f64,
    pub expires_at: DateTime<Utc>,
}

impl Booster {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whole minutes left, rounded up, or zero once expired.
    pub fn minutes_left(&self, now: DateTime<Utc>) -> i64 {
        let ms = (self.expires_at - now).num_milliseconds();
        if ms <= 0 {
            0
        } else {
            (ms + 59_999) / 60_000
        }
    }

    /// Apply to an amount, flooring the result.
    pub fn apply(&self, amount: u64) -> u64 {
        (amount as f64 * self.multiplier).floor() as u64
    }
}

/// Equipment slots. At most one item may be equipped per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSlot {
    Weapon,
    Armor,
    Shoe,
    Accessory,
}

impl ItemSlot {
    pub const ALL: [ItemSlot; 4] = [
        ItemSlot::Weapon,
        ItemSlot::Armor,
        ItemSlot::Shoe,
        ItemSlot::Accessory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSlot::Weapon => "weapon",
            ItemSlot::Armor => "armor",
            ItemSlot::Shoe => "shoe",
            ItemSlot::Accessory => "accessory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ItemSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ItemSlot::Weapon => "⚔️",
            ItemSlot::Armor => "🛡️",
            ItemSlot::Shoe => "👢",
            ItemSlot::Accessory => "💍",
        }
    }
}

impl fmt::Display for ItemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Additive stat bonuses carried by an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatBonus {
    pub attack: i64,
    pub defense: i64,
    pub hp: i64,
    pub speed: i64,
    pub luck: i64,
    pub crit_rate: i64,
    pub evasion: i64,
}

impl StatBonus {
    pub fn add(&mut self, other: &StatBonus) {
        self.attack += other.attack;
        self.defense += other.defense;
        self.hp += other.hp;
        self.speed += other.speed;
        self.luck += other.luck;
        self.crit_rate += other.crit_rate;
        self.evasion += other.evasion;
    }

    /// Compact "+5 ATK, +3 DEF" listing of the non-zero fields.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = [
            (self.attack, "ATK"),
            (self.defense, "DEF"),
            (self.hp, "HP"),
            (self.speed, "SPD"),
            (self.luck, "LUCK"),
            (self.crit_rate, "CRIT"),
            (self.evasion, "EVA"),
        ]
        .iter()
        .filter(|(v, _)| *v != 0)
        .map(|(v, label)| format!("+{} {}", v, label))
        .collect();
        if parts.is_empty() {
            "no bonuses".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub slot: ItemSlot,
    pub bonus: StatBonus,
    pub obtained_at: DateTime<Utc>,
}

impl Item {
    /// Leading characters of the id, enough to type back into `equip`.
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// One user's economy and game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub balance: u64,
    pub level: u32,
    pub experience: u64,
    #[serde(default)]
    pub daily_claimed: bool,
    #[serde(default)]
    pub weekly_claimed: bool,
    #[serde(default)]
    pub last_daily: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_weekly: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_hunt: Option<DateTime<Utc>>,
    /// rarity -> species key -> count. Empty inner maps are removed.
    #[serde(default)]
    pub animals: BTreeMap<Rarity, BTreeMap<String, u64>>,
    #[serde(default)]
    pub boosters: BTreeMap<BoosterKind, Booster>,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub equipped: BTreeMap<ItemSlot, Item>,
    #[serde(default)]
    pub total_animals_found: u64,
    #[serde(default)]
    pub total_gambled: u64,
    #[serde(default)]
    pub total_won: u64,
    #[serde(default)]
    pub total_lost: u64,
    #[serde(default)]
    pub commands_used: u64,
    pub joined_at: DateTime<Utc>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

fn default_schema_version() -> u8 {
    USER_SCHEMA_VERSION
}

impl UserRecord {
    pub fn new(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            balance: DEFAULT_BALANCE,
            level: 1,
            experience: 0,
            daily_claimed: false,
            weekly_claimed: false,
            last_daily: None,
            last_weekly: None,
            last_hunt: None,
            animals: BTreeMap::new(),
            boosters: BTreeMap::new(),
            inventory: Vec::new(),
            equipped: BTreeMap::new(),
            total_animals_found: 0,
            total_gambled: 0,
            total_won: 0,
            total_lost: 0,
            commands_used: 0,
            joined_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    /// Level implied by an experience total.
    pub fn level_for_experience(experience: u64) -> u32 {
        (experience / EXPERIENCE_PER_LEVEL) as u32 + 1
    }

    /// Sum of bonuses from all equipped items.
    pub fn equipment_bonus(&self) -> StatBonus {
        let mut total = StatBonus::default();
        for item in self.equipped.values() {
            total.add(&item.bonus);
        }
        total
    }

    pub fn animal_count(&self) -> u64 {
        self.animals
            .values()
            .flat_map(|species| species.values())
            .sum()
    }

    /// Highest tier with at least one animal owned.
    pub fn rarest_tier(&self) -> Option<Rarity> {
        self.animals
            .iter()
            .rev()
            .find(|(_, species)| species.values().any(|c| *c > 0))
            .map(|(rarity, _)| *rarity)
    }

    pub fn net_gambling(&self) -> i64 {
        self.total_won as i64 - self.total_lost as i64
    }

    /// Won as a percentage of everything gambled.
    pub fn win_rate(&self) -> f64 {
        if self.total_gambled == 0 {
            0.0
        } else {
            self.total_won as f64 * 100.0 / self.total_gambled as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_defaults() {
        let now = Utc::now();
        let rec = UserRecord::new("42", now);
        assert_eq!(rec.balance, 1000);
        assert_eq!(rec.level, 1);
        assert_eq!(rec.experience, 0);
        assert!(rec.animals.is_empty());
        assert_eq!(rec.joined_at, now);
        assert_eq!(rec.schema_version, USER_SCHEMA_VERSION);
    }

    #[test]
    fn rarity_parse_is_case_insensitive() {
        assert_eq!(Rarity::parse("Legendary"), Some(Rarity::Legendary));
        assert_eq!(Rarity::parse(" priceless "), Some(Rarity::Priceless));
        assert_eq!(Rarity::parse("shiny"), None);
        assert!(Rarity::Mythical.grants_bonus_booster());
        assert!(!Rarity::Epic.grants_bonus_booster());
    }

    #[test]
    fn rarest_tier_skips_empty_maps() {
        let mut rec = UserRecord::new("1", Utc::now());
        rec.animals
            .entry(Rarity::Common)
            .or_default()
            .insert("rabbit".into(), 2);
        rec.animals.entry(Rarity::Epic).or_default();
        assert_eq!(rec.rarest_tier(), Some(Rarity::Common));
        assert_eq!(rec.animal_count(), 2);
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let rec = UserRecord::new("7", Utc::now());
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("totalAnimalsFound").is_some());
        assert!(json.get("joinedAt").is_some());
    }
}
