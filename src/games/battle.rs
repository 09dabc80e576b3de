//! Turn-based combat shared by duels (PvP) and fights (PvE).
//!
//! Stats derive from level and experience plus equipped-item bonuses. Each round both
//! sides roll initiative (`luck + U(0,20)`); the higher roll strikes first and the other
//! answers if still standing. Damage is `max(1, floor(atk + U(0,a) - def - U(0,d)))`
//! where `a`/`d` are 20/10 for duels and 15/8 for fights.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::BattleConfig;
use crate::economy::{EconomyError, Item, LevelChange, StatKind, UserRecord};
use crate::games::items::roll_drop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatStats {
    pub attack: i64,
    pub defense: i64,
    pub health: i64,
    pub luck: i64,
}

impl CombatStats {
    /// Base stats from level and experience only.
    pub fn base(user: &UserRecord) -> Self {
        let level = i64::from(user.level);
        let exp = user.experience as i64;
        Self {
            attack: level * 10 + exp / 100,
            defense: level * 8 + exp / 150,
            health: level * 15 + 100,
            luck: level * 2,
        }
    }

    /// Base stats plus equipped-item bonuses.
    pub fn for_user(user: &UserRecord) -> Self {
        let base = Self::base(user);
        let bonus = user.equipment_bonus();
        Self {
            attack: base.attack + bonus.attack,
            defense: base.defense + bonus.defense,
            health: base.health + bonus.hp,
            luck: base.luck + bonus.luck,
        }
    }
}

/// Random spread added to attack and defense rolls.
#[derive(Debug, Clone, Copy)]
pub struct Spread {
    pub attack: f64,
    pub defense: f64,
}

pub const DUEL_SPREAD: Spread = Spread {
    attack: 20.0,
    defense: 10.0,
};
pub const FIGHT_SPREAD: Spread = Spread {
    attack: 15.0,
    defense: 8.0,
};

const INITIATIVE_SPREAD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub round: u32,
    pub attacker: Side,
    pub damage: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleLog {
    pub rounds: u32,
    pub first_hp: i64,
    pub second_hp: i64,
    pub strikes: Vec<Strike>,
}

pub fn roll_damage<R: Rng + ?Sized>(
    attacker: &CombatStats,
    defender: &CombatStats,
    spread: Spread,
    rng: &mut R,
) -> i64 {
    let hit = attacker.attack as f64 + rng.gen::<f64>() * spread.attack;
    let block = defender.defense as f64 + rng.gen::<f64>() * spread.defense;
    ((hit - block).floor() as i64).max(1)
}

/// Run rounds until one side drops or `max_rounds` is reached. `first` wins initiative ties.
pub fn run_rounds<R: Rng + ?Sized>(
    first: &CombatStats,
    second: &CombatStats,
    max_rounds: u32,
    spread: Spread,
    rng: &mut R,
) -> BattleLog {
    let mut first_hp = first.health;
    let mut second_hp = second.health;
    let mut strikes = Vec::new();
    let mut round = 0;
    while first_hp > 0 && second_hp > 0 && round < max_rounds {
        round += 1;
        let first_init = first.luck as f64 + rng.gen::<f64>() * INITIATIVE_SPREAD;
        let second_init = second.luck as f64 + rng.gen::<f64>() * INITIATIVE_SPREAD;
        let order = if first_init >= second_init {
            [Side::First, Side::Second]
        } else {
            [Side::Second, Side::First]
        };
        for attacker in order {
            if first_hp <= 0 || second_hp <= 0 {
                break;
            }
            let damage = match attacker {
                Side::First => {
                    let d = roll_damage(first, second, spread, rng);
                    second_hp -= d;
                    d
                }
                Side::Second => {
                    let d = roll_damage(second, first, spread, rng);
                    first_hp -= d;
                    d
                }
            };
            strikes.push(Strike {
                round,
                attacker,
                damage,
            });
        }
    }
    BattleLog {
        rounds: round,
        first_hp,
        second_hp,
        strikes,
    }
}

/// Winner of a duel: knockouts first, then remaining health, then a coin flip.
pub fn duel_winner<R: Rng + ?Sized>(
    first: &CombatStats,
    second: &CombatStats,
    log: &BattleLog,
    rng: &mut R,
) -> Side {
    let first_down = log.first_hp <= 0;
    let second_down = log.second_hp <= 0;
    match (first_down, second_down) {
        (true, true) => {
            if first.health >= second.health {
                Side::First
            } else {
                Side::Second
            }
        }
        (false, true) => Side::First,
        (true, false) => Side::Second,
        (false, false) => {
            if log.first_hp > log.second_hp {
                Side::First
            } else if log.second_hp > log.first_hp {
                Side::Second
            } else if rng.gen_bool(0.5) {
                Side::First
            } else {
                Side::Second
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyTemplate {
    pub name: &'static str,
    pub emoji: &'static str,
    pub level_offset: i32,
    pub difficulty: f64,
}

pub const ENEMIES: [EnemyTemplate; 8] = [
    EnemyTemplate { name: "Goblin Warrior", emoji: "👹", level_offset: -2, difficulty: 0.8 },
    EnemyTemplate { name: "Skeleton Fighter", emoji: "💀", level_offset: -1, difficulty: 0.9 },
    EnemyTemplate { name: "Orc Berserker", emoji: "👺", level_offset: 0, difficulty: 1.0 },
    EnemyTemplate { name: "Dark Knight", emoji: "⚔️", level_offset: 1, difficulty: 1.1 },
    EnemyTemplate { name: "Shadow Assassin", emoji: "🥷", level_offset: 1, difficulty: 1.2 },
    EnemyTemplate { name: "Fire Elemental", emoji: "🔥", level_offset: 2, difficulty: 1.3 },
    EnemyTemplate { name: "Ice Giant", emoji: "🧊", level_offset: 2, difficulty: 1.4 },
    EnemyTemplate { name: "Dragon Wyrmling", emoji: "🐉", level_offset: 3, difficulty: 1.5 },
];

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub name: &'static str,
    pub emoji: &'static str,
    pub level: u32,
    pub stats: CombatStats,
}

impl Enemy {
    pub fn from_template(template: &EnemyTemplate, player_level: u32) -> Self {
        let level = (i64::from(player_level) + i64::from(template.level_offset)).max(1) as u32;
        let l = f64::from(level);
        let d = template.difficulty;
        Self {
            name: template.name,
            emoji: template.emoji,
            level,
            stats: CombatStats {
                attack: (l * 10.0 * d).floor() as i64,
                defense: (l * 8.0 * d).floor() as i64,
                health: (l * 15.0 * d + 80.0).floor() as i64,
                luck: i64::from(level) * 2,
            },
        }
    }

    pub fn random<R: Rng + ?Sized>(player_level: u32, rng: &mut R) -> Self {
        let template = ENEMIES.choose(rng).unwrap_or(&ENEMIES[2]);
        Self::from_template(template, player_level)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FightReport {
    pub enemy: Enemy,
    pub player_stats: CombatStats,
    pub log: BattleLog,
    pub won: bool,
    pub bet: u64,
    /// Coins credited (after booster); zero on a loss.
    pub reward: u64,
    pub exp: LevelChange,
    pub drop: Option<Item>,
    pub balance: u64,
}

/// Stake (optional) and fight a random enemy. The bet is debited up front; a win pays
/// the coin reward plus twice the bet through the money booster.
pub fn fight<R: Rng + ?Sized>(
    user: &mut UserRecord,
    bet: u64,
    cfg: &BattleConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<FightReport, EconomyError> {
    if bet > 0 {
        user.place_stake(bet)?;
    }
    let enemy = Enemy::random(user.level, rng);
    let player_stats = CombatStats::for_user(user);
    let log = run_rounds(&player_stats, &enemy.stats, cfg.fight_max_rounds, FIGHT_SPREAD, rng);
    let won = log.second_hp <= 0;

    let level = u64::from(enemy.level);
    let coin_reward = (level as f64 * 50.0 + rng.gen::<f64>() * 200.0).floor() as u64;
    let exp_reward = level * 20 + 30;

    let (reward, exp) = if won {
        let before = user.balance;
        user.credit(coin_reward + bet * 2, now);
        if bet > 0 {
            user.record_stat(StatKind::Won, bet);
        }
        (user.balance - before, user.add_experience(exp_reward, now))
    } else {
        if bet > 0 {
            user.record_stat(StatKind::Lost, bet);
        }
        (0, user.add_experience(cfg.fight_loss_exp, now))
    };

    let chance = if won {
        cfg.drop_chance_win
    } else {
        cfg.drop_chance_loss
    };
    let drop = roll_drop(user, chance, enemy.level, now, rng);

    Ok(FightReport {
        enemy,
        player_stats,
        log,
        won,
        bet,
        reward,
        exp,
        drop,
        balance: user.balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::{ItemSlot, StatBonus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn base_stats_follow_formulas() {
        let mut u = UserRecord::new("b", Utc::now());
        u.level = 5;
        u.experience = 450;
        let s = CombatStats::base(&u);
        assert_eq!(s.attack, 54);
        assert_eq!(s.defense, 43);
        assert_eq!(s.health, 175);
        assert_eq!(s.luck, 10);
    }

    #[test]
    fn equipment_bonuses_are_included() {
        let mut u = UserRecord::new("b", Utc::now());
        u.equipped.insert(
            ItemSlot::Armor,
            Item {
                id: "x".into(),
                name: "Obsidian Plate".into(),
                slot: ItemSlot::Armor,
                bonus: StatBonus {
                    defense: 15,
                    hp: 20,
                    ..StatBonus::default()
                },
                obtained_at: Utc::now(),
            },
        );
        let s = CombatStats::for_user(&u);
        let b = CombatStats::base(&u);
        assert_eq!(s.defense, b.defense + 15);
        assert_eq!(s.health, b.health + 20);
    }

    #[test]
    fn damage_is_at_least_one() {
        let weak = CombatStats { attack: 0, defense: 0, health: 10, luck: 0 };
        let wall = CombatStats { attack: 0, defense: 10_000, health: 10, luck: 0 };
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            assert_eq!(roll_damage(&weak, &wall, DUEL_SPREAD, &mut rng), 1);
        }
    }

    #[test]
    fn rounds_stop_at_cap_and_knockout() {
        let tank = CombatStats { attack: 0, defense: 10_000, health: 1_000_000, luck: 0 };
        let mut rng = StdRng::seed_from_u64(8);
        let log = run_rounds(&tank, &tank, 10, DUEL_SPREAD, &mut rng);
        assert_eq!(log.rounds, 10);
        assert_eq!(log.strikes.len(), 20);

        let glass = CombatStats { attack: 1000, defense: 0, health: 1, luck: 0 };
        let log = run_rounds(&glass, &glass, 10, DUEL_SPREAD, &mut rng);
        assert_eq!(log.rounds, 1);
        assert_eq!(log.strikes.len(), 1, "no counter-attack from a downed side");
    }

    #[test]
    fn duel_winner_rules() {
        let a = CombatStats { attack: 1, defense: 1, health: 200, luck: 0 };
        let b = CombatStats { attack: 1, defense: 1, health: 100, luck: 0 };
        let mut rng = StdRng::seed_from_u64(1);
        let log = |f, s| BattleLog { rounds: 1, first_hp: f, second_hp: s, strikes: vec![] };
        assert_eq!(duel_winner(&a, &b, &log(10, 0), &mut rng), Side::First);
        assert_eq!(duel_winner(&a, &b, &log(0, 5), &mut rng), Side::Second);
        assert_eq!(duel_winner(&b, &a, &log(0, 0), &mut rng), Side::Second);
        assert_eq!(duel_winner(&a, &b, &log(30, 40), &mut rng), Side::Second);
    }

    #[test]
    fn equal_health_after_round_cap_is_a_coin_flip() {
        let a = CombatStats { attack: 1, defense: 1, health: 100, luck: 0 };
        let b = CombatStats { attack: 1, defense: 1, health: 100, luck: 0 };
        let tied = BattleLog { rounds: 50, first_hp: 40, second_hp: 40, strikes: vec![] };
        let mut rng = StdRng::seed_from_u64(9);
        let (mut first, mut second) = (0, 0);
        for _ in 0..200 {
            match duel_winner(&a, &b, &tied, &mut rng) {
                Side::First => first += 1,
                Side::Second => second += 1,
            }
        }
        assert!(first > 50 && second > 50, "first {} second {}", first, second);
    }

    #[test]
    fn enemy_stats_from_template() {
        let dragon = Enemy::from_template(&ENEMIES[7], 10);
        assert_eq!(dragon.level, 13);
        assert_eq!(dragon.stats.attack, 195);
        assert_eq!(dragon.stats.defense, 156);
        assert_eq!(dragon.stats.health, 372);
        let goblin = Enemy::from_template(&ENEMIES[0], 1);
        assert_eq!(goblin.level, 1);
    }

    #[test]
    fn fight_debits_bet_and_settles() {
        let cfg = BattleConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..20 {
            let mut u = UserRecord::new("f", Utc::now());
            let report = fight(&mut u, 100, &cfg, Utc::now(), &mut rng).unwrap();
            assert_eq!(u.total_gambled, 100);
            if report.won {
                assert!(report.reward >= 200);
                assert_eq!(u.balance, 900 + report.reward);
                assert_eq!(u.total_won, 100);
            } else {
                assert_eq!(report.reward, 0);
                assert_eq!(u.balance, 900);
                assert_eq!(u.total_lost, 100);
                assert_eq!(report.exp.gained, 10);
            }
        }
    }

    #[test]
    fn fight_rejects_unaffordable_bet() {
        let cfg = BattleConfig::default();
        let mut u = UserRecord::new("f", Utc::now());
        let mut rng = StdRng::seed_from_u64(2);
        assert!(fight(&mut u, 5000, &cfg, Utc::now(), &mut rng).is_err());
        assert_eq!(u.balance, 1000);
    }
}
