//! # Configuration Management Module
//!
//! All tunable behaviour of the bot lives here: command prefixes and aliases, the admin
//! allow-list, payout and weight tables, cooldowns, the maintenance schedule and the
//! health endpoint.
//!
//! ## Configuration Structure
//!
//! - [`BotConfig`] - Identity, prefixes, short prefixes, admins, currency name
//! - [`StorageConfig`] - Data directory and optional catalog override
//! - [`EconomyConfig`] - Reward ranges, level bonuses, payment limits
//! - [`GamblingConfig`] - Bet limits and the slot outcome table
//! - [`HuntingConfig`] - Rarity weights and distraction chance
//! - [`BattleConfig`] - Round caps, response windows and experience awards
//! - [`CooldownConfig`] - Per-command cooldowns in milliseconds
//! - [`MaintenanceConfig`] - Daily/weekly reset boundaries
//! - [`HealthConfig`] - HTTP liveness endpoint
//! - [`LoggingConfig`] - Logging settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ksaekvat::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = Config::load("config.toml").await?;
//!     config.apply_env_overrides();
//!     println!("Prefixes: {:?}", config.bot.prefixes);
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Integration
//!
//! `DISCORD_TOKEN`, `ADMIN_ID_1`..`ADMIN_ID_4` and `PORT` override the file. Precedence is
//! Environment > Config file > Defaults.
//!
//! Payout multipliers and drop weights are product tuning values. They are exposed here so
//! they can be adjusted without touching game logic, but the defaults must not drift.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::economy::Rarity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    /// Main command prefixes; matched case-sensitively against the start of a message.
    pub prefixes: Vec<String>,
    /// Platform user ids allowed to run admin commands.
    #[serde(default)]
    pub admin_ids: Vec<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Platform gateway token. Only presence is checked by the console transport.
    #[serde(default)]
    pub token: Option<String>,
    /// User id the console transport speaks as.
    #[serde(default = "default_console_user")]
    pub console_user: String,
    /// Bare words that expand to a full command line, e.g. `cf` -> `coinflip`.
    #[serde(default = "default_short_prefixes")]
    pub short_prefixes: BTreeMap<String, String>,
}

fn default_short_prefixes() -> BTreeMap<String, String> {
    [
        ("hp", "help"),
        ("cf", "coinflip"),
        ("s", "slots"),
        ("d", "daily"),
        ("w", "weekly"),
        ("hunt", "hunt"),
        ("zoo", "zoo"),
        ("h", "coinflip heads"),
        ("t", "coinflip tails"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_currency() -> String {
    "riel".to_string()
}

fn default_console_user() -> String {
    "console".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Optional species catalog JSON; the built-in catalog is used when unset.
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl StorageConfig {
    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("economy")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub min: u64,
    pub max: u64,
}

/// Highest payment allowed for senders at or above `min_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayLimit {
    pub min_level: u32,
    pub max_amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub max_bet: u64,
    pub daily_level_bonus: u64,
    pub weekly_level_bonus: u64,
    pub work_level_bonus: u64,
    pub daily_exp: u64,
    pub weekly_exp: u64,
    pub work_exp: u64,
    pub weekly_booster_chance: f64,
    pub weekly_booster_minutes: i64,
    pub daily: RangeConfig,
    pub weekly: RangeConfig,
    pub work: RangeConfig,
    pub pay_limits: Vec<PayLimit>,
}

impl EconomyConfig {
    pub fn pay_limit_for(&self, level: u32) -> u64 {
        self.pay_limits
            .iter()
            .filter(|l| level >= l.min_level)
            .map(|l| l.max_amount)
            .max()
            .unwrap_or(self.max_bet)
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            max_bet: 250_000,
            daily: RangeConfig {
                min: 1000,
                max: 5000,
            },
            weekly: RangeConfig {
                min: 10_000,
                max: 25_000,
            },
            work: RangeConfig { min: 100, max: 1000 },
            daily_level_bonus: 10,
            weekly_level_bonus: 50,
            work_level_bonus: 2,
            daily_exp: 25,
            weekly_exp: 100,
            work_exp: 15,
            weekly_booster_chance: 0.05,
            weekly_booster_minutes: 30,
            pay_limits: vec![
                PayLimit {
                    min_level: 1,
                    max_amount: 250_000,
                },
                PayLimit {
                    min_level: 10,
                    max_amount: 750_000,
                },
                PayLimit {
                    min_level: 15,
                    max_amount: 1_500_000,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLimits {
    pub min_bet: u64,
    pub max_bet: u64,
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min_bet: 1,
            max_bet: 250_000,
        }
    }
}

/// One row of the slot outcome table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotTier {
    pub key: String,
    pub weight: u32,
    pub emoji: String,
    pub multiplier: u64,
    pub label: String,
}

fn slot_tier(key: &str, weight: u32, emoji: &str, multiplier: u64, label: &str) -> SlotTier {
    SlotTier {
        key: key.to_string(),
        weight,
        emoji: emoji.to_string(),
        multiplier,
        label: label.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamblingConfig {
    pub coinflip_win_exp: u64,
    pub dice_exact_multiplier: u64,
    pub dice_high_multiplier: u64,
    /// Lowest non-matching roll that still pays the high multiplier.
    pub dice_high_threshold: u8,
    pub dice_exact_exp: u64,
    pub dice_high_exp: u64,
    pub slots_win_exp: u64,
    pub coinflip: BetLimits,
    pub dice: BetLimits,
    pub slots: BetLimits,
    pub slot_tiers: Vec<SlotTier>,
}

impl Default for GamblingConfig {
    fn default() -> Self {
        Self {
            coinflip: BetLimits::default(),
            dice: BetLimits::default(),
            slots: BetLimits::default(),
            coinflip_win_exp: 20,
            dice_exact_multiplier: 5,
            dice_high_multiplier: 2,
            dice_high_threshold: 4,
            dice_exact_exp: 30,
            dice_high_exp: 15,
            slots_win_exp: 25,
            slot_tiers: vec![
                slot_tier("diamond", 5, "🔷", 10, "DIAMOND JACKPOT!"),
                slot_tier("rocket", 15, "🚀", 5, "ROCKET BONUS!"),
                slot_tier("coin", 25, "🪙", 2, "COIN WIN!"),
                slot_tier("draw", 30, "🤝", 1, "DRAW!"),
                slot_tier("lose", 25, "💀", 0, "LOSS"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityWeight {
    pub rarity: Rarity,
    pub value: u64,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntingConfig {
    pub distraction_chance: f64,
    /// Chance that a legendary-or-better find also grants a 2x booster.
    pub bonus_booster_chance: f64,
    pub bonus_booster_minutes: i64,
    /// Experience is the rarity value divided by this.
    pub exp_divisor: u64,
    pub rarities: Vec<RarityWeight>,
}

impl HuntingConfig {
    pub fn rarity_value(&self, rarity: Rarity) -> u64 {
        self.rarities
            .iter()
            .find(|r| r.rarity == rarity)
            .map(|r| r.value)
            .unwrap_or(0)
    }
}

impl Default for HuntingConfig {
    fn default() -> Self {
        let table = [
            (Rarity::Common, 100, 40),
            (Rarity::Uncommon, 500, 25),
            (Rarity::Rare, 1500, 15),
            (Rarity::Epic, 5000, 10),
            (Rarity::Legendary, 15_000, 6),
            (Rarity::Mythical, 50_000, 3),
            (Rarity::Priceless, 100_000, 1),
        ];
        Self {
            distraction_chance: 0.3,
            rarities: table
                .into_iter()
                .map(|(rarity, value, weight)| RarityWeight {
                    rarity,
                    value,
                    weight,
                })
                .collect(),
            bonus_booster_chance: 0.15,
            bonus_booster_minutes: 60,
            exp_divisor: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleConfig {
    pub duel_max_rounds: u32,
    pub fight_max_rounds: u32,
    /// Seconds the challenged user has to accept a duel.
    pub duel_response_secs: u64,
    /// Seconds an admin has to confirm a reset.
    pub reset_confirm_secs: u64,
    pub duel_winner_exp: u64,
    pub duel_loser_exp: u64,
    pub fight_loss_exp: u64,
    pub drop_chance_win: f64,
    pub drop_chance_loss: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            duel_max_rounds: 10,
            fight_max_rounds: 15,
            duel_response_secs: 60,
            reset_confirm_secs: 30,
            duel_winner_exp: 50,
            duel_loser_exp: 25,
            fight_loss_exp: 10,
            drop_chance_win: 0.4,
            drop_chance_loss: 0.15,
        }
    }
}

/// Per-command cooldowns, always in milliseconds. Commands absent from the map have none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownConfig {
    pub millis: BTreeMap<String, u64>,
}

impl CooldownConfig {
    pub fn for_command(&self, command: &str) -> Option<std::time::Duration> {
        self.millis
            .get(command)
            .filter(|ms| **ms > 0)
            .map(|ms| std::time::Duration::from_millis(*ms))
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        let millis = [
            ("coinflip", 3000),
            ("dice", 3000),
            ("slots", 5000),
            ("hunt", 10_000),
            ("work", 30_000),
            ("pay", 5000),
            ("duel", 30_000),
            ("fight", 10_000),
            ("inv", 3000),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { millis }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    /// UTC hour at which daily (and weekly) claim flags reset.
    pub reset_hour: u32,
    /// Weekday for the weekly reset: "sun", "mon", ...
    pub weekly_reset_day: String,
    pub booster_sweep: bool,
}

impl MaintenanceConfig {
    pub fn weekly_weekday(&self) -> chrono::Weekday {
        self.weekly_reset_day
            .parse::<chrono::Weekday>()
            .unwrap_or(chrono::Weekday::Sun)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reset_hour: 0,
            weekly_reset_day: "sun".to_string(),
            booster_sweep: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default)]
    pub security_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub gambling: GamblingConfig,
    #[serde(default)]
    pub hunting: HuntingConfig,
    #[serde(default)]
    pub battle: BattleConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub health: HealthConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Apply process environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an injectable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.bot.token = Some(token);
        }
        for n in 1..=4 {
            if let Some(id) = lookup(&format!("ADMIN_ID_{}", n)) {
                let id = id.trim().to_string();
                if !id.is_empty() && !self.bot.admin_ids.contains(&id) {
                    self.bot.admin_ids.push(id);
                }
            }
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.health.port = port;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bot: BotConfig {
                name: "KsaekVat".to_string(),
                prefixes: vec!["k".to_string(), "K".to_string()],
                short_prefixes: default_short_prefixes(),
                admin_ids: Vec::new(),
                currency: default_currency(),
                token: None,
                console_user: default_console_user(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                catalog_path: None,
            },
            economy: EconomyConfig::default(),
            gambling: GamblingConfig::default(),
            hunting: HuntingConfig::default(),
            battle: BattleConfig::default(),
            cooldowns: CooldownConfig::default(),
            maintenance: MaintenanceConfig::default(),
            health: HealthConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("ksaekvat.log".to_string()),
                security_file: Some("ksaekvat-security.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_match_documented_values() {
        let cfg = Config::default();
        let weights: Vec<u32> = cfg.hunting.rarities.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![40, 25, 15, 10, 6, 3, 1]);
        let slots: Vec<(u32, u64)> = cfg
            .gambling
            .slot_tiers
            .iter()
            .map(|t| (t.weight, t.multiplier))
            .collect();
        assert_eq!(slots, vec![(5, 10), (15, 5), (25, 2), (30, 1), (25, 0)]);
        assert_eq!(cfg.hunting.rarity_value(Rarity::Mythical), 50_000);
    }

    #[test]
    fn pay_limit_tiers() {
        let eco = EconomyConfig::default();
        assert_eq!(eco.pay_limit_for(1), 250_000);
        assert_eq!(eco.pay_limit_for(9), 250_000);
        assert_eq!(eco.pay_limit_for(10), 750_000);
        assert_eq!(eco.pay_limit_for(14), 750_000);
        assert_eq!(eco.pay_limit_for(15), 1_500_000);
        assert_eq!(eco.pay_limit_for(400), 1_500_000);
    }

    #[test]
    fn cooldowns_are_milliseconds() {
        let cd = CooldownConfig::default();
        assert_eq!(cd.for_command("pay"), Some(std::time::Duration::from_secs(5)));
        assert_eq!(cd.for_command("fight"), Some(std::time::Duration::from_secs(10)));
        assert_eq!(cd.for_command("balance"), None);
    }

    #[test]
    fn env_overrides_append_admins_and_port() {
        let mut cfg = Config::default();
        cfg.bot.admin_ids.push("111".into());
        cfg.apply_overrides_from(|key| match key {
            "ADMIN_ID_1" => Some("111".into()),
            "ADMIN_ID_3" => Some(" 333 ".into()),
            "PORT" => Some("9090".into()),
            "DISCORD_TOKEN" => Some("abc".into()),
            _ => None,
        });
        assert_eq!(cfg.bot.admin_ids, vec!["111".to_string(), "333".to_string()]);
        assert_eq!(cfg.health.port, 9090);
        assert_eq!(cfg.bot.token.as_deref(), Some("abc"));
    }

    #[test]
    fn minimal_toml_fills_defaults() {
        let text = r#"
            [bot]
            name = "Test"
            prefixes = ["k"]

            [storage]
            data_dir = "/tmp/x"

            [logging]
            level = "debug"
            file = "x.log"
        "#;
        let cfg: Config = toml::from_str(text).unwrap();
        assert_eq!(cfg.bot.currency, "riel");
        assert_eq!(cfg.bot.short_prefixes.get("cf").map(String::as_str), Some("coinflip"));
        assert_eq!(cfg.economy.max_bet, 250_000);
        assert_eq!(cfg.health.port, 8080);
        assert_eq!(cfg.maintenance.weekly_weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.gambling.slot_tiers.len(), 5);
        assert_eq!(back.cooldowns.millis.len(), 9);
    }
}
