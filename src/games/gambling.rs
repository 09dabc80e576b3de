//! Coinflip, dice and slot machine resolution.
//!
//! Each game is split into a draw step (consumes the RNG) and a `settle_*` step that applies
//! a known result to a [`UserRecord`]. Settlement order is fixed: the stake is debited and
//! counted as gambled first, then any payout is credited through the money booster.
//!
//! Payouts:
//! - Coinflip: correct call pays 2x stake (+20 XP).
//! - Dice: exact number pays 5x (+30 XP); otherwise a roll of 4 or more pays 2x (+15 XP).
//! - Slots: weighted tiers diamond/rocket/coin/draw/lose pay 10x/5x/2x/1x/0x (+25 XP on a win).
//!   A loss shows three distinct symbols; every other tier shows its own symbol three times.
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{BetLimits, GamblingConfig, SlotTier};
use crate::economy::{EconomyError, LevelChange, StatKind, UserRecord};
use crate::games::weighted::pick_weighted;

/// Filler symbols for a losing spin when the tier table has fewer than three distinct emoji.
const LOSS_FILLERS: [&str; 3] = ["🍒", "🍋", "🔔"];

/// Reject zero stakes and stakes under `min_bet`.
pub fn validate_min_stake(stake: u64, limits: &BetLimits) -> Result<(), EconomyError> {
    if stake == 0 {
        return Err(EconomyError::InvalidAmount(
            "bet must be a positive number".into(),
        ));
    }
    if stake < limits.min_bet {
        return Err(EconomyError::InvalidAmount(format!(
            "minimum bet is {}",
            limits.min_bet
        )));
    }
    Ok(())
}

/// Reject stakes outside `[min_bet, max_bet]`.
pub fn validate_stake(stake: u64, limits: &BetLimits) -> Result<(), EconomyError> {
    validate_min_stake(stake, limits)?;
    if stake > limits.max_bet {
        return Err(EconomyError::InvalidAmount(format!(
            "maximum bet is {}",
            limits.max_bet
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heads" | "head" | "h" => Some(CoinSide::Heads),
            "tails" | "tail" | "t" => Some(CoinSide::Tails),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSide::Heads => "heads",
            CoinSide::Tails => "tails",
        }
    }

    pub fn flip<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoinflipReport {
    pub choice: CoinSide,
    pub result: CoinSide,
    pub stake: u64,
    pub won: bool,
    /// Amount actually credited (after any money booster).
    pub payout: u64,
    pub balance: u64,
    pub exp: Option<LevelChange>,
}

pub fn settle_coinflip(
    user: &mut UserRecord,
    stake: u64,
    choice: CoinSide,
    result: CoinSide,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
) -> Result<CoinflipReport, EconomyError> {
    // Explicit coinflip amounts have no ceiling; only `all` is capped at max_bet.
    validate_min_stake(stake, &cfg.coinflip)?;
    user.place_stake(stake)?;
    let won = choice == result;
    let mut payout = 0;
    let mut exp = None;
    if won {
        let before = user.balance;
        user.credit(stake * 2, now);
        payout = user.balance - before;
        user.record_stat(StatKind::Won, stake);
        exp = Some(user.add_experience(cfg.coinflip_win_exp, now));
    } else {
        user.record_stat(StatKind::Lost, stake);
    }
    Ok(CoinflipReport {
        choice,
        result,
        stake,
        won,
        payout,
        balance: user.balance,
        exp,
    })
}

pub fn play_coinflip<R: Rng + ?Sized>(
    user: &mut UserRecord,
    stake: u64,
    choice: CoinSide,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<CoinflipReport, EconomyError> {
    validate_min_stake(stake, &cfg.coinflip)?;
    let result = CoinSide::flip(rng);
    settle_coinflip(user, stake, choice, result, cfg, now)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiceReport {
    pub choice: u8,
    pub roll: u8,
    pub stake: u64,
    pub multiplier: u64,
    pub payout: u64,
    pub balance: u64,
    pub exp: Option<LevelChange>,
}

/// Payout multiplier and experience for a roll against the player's number.
pub fn dice_multiplier(choice: u8, roll: u8, cfg: &GamblingConfig) -> (u64, u64) {
    if roll == choice {
        (cfg.dice_exact_multiplier, cfg.dice_exact_exp)
    } else if roll >= cfg.dice_high_threshold {
        (cfg.dice_high_multiplier, cfg.dice_high_exp)
    } else {
        (0, 0)
    }
}

/// A pick outside 1..=6, or not a number at all, yields `None` and the bot picks for the player.
pub fn parse_dice_choice(raw: &str) -> Option<u8> {
    raw.trim().parse::<u8>().ok().filter(|n| (1..=6).contains(n))
}

pub fn settle_dice(
    user: &mut UserRecord,
    stake: u64,
    choice: u8,
    roll: u8,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
) -> Result<DiceReport, EconomyError> {
    validate_stake(stake, &cfg.dice)?;
    user.place_stake(stake)?;
    let (multiplier, exp_award) = dice_multiplier(choice, roll, cfg);
    let mut payout = 0;
    let mut exp = None;
    if multiplier > 0 {
        let win = stake * multiplier;
        let before = user.balance;
        user.credit(win, now);
        payout = user.balance - before;
        user.record_stat(StatKind::Won, win - stake);
        exp = Some(user.add_experience(exp_award, now));
    } else {
        user.record_stat(StatKind::Lost, stake);
    }
    Ok(DiceReport {
        choice,
        roll,
        stake,
        multiplier,
        payout,
        balance: user.balance,
        exp,
    })
}

/// Roll one die. With no `choice` the player's number is also drawn at random.
pub fn play_dice<R: Rng + ?Sized>(
    user: &mut UserRecord,
    stake: u64,
    choice: Option<u8>,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<DiceReport, EconomyError> {
    validate_stake(stake, &cfg.dice)?;
    let choice = match choice {
        Some(c) => c,
        None => rng.gen_range(1..=6),
    };
    let roll = rng.gen_range(1..=6);
    settle_dice(user, stake, choice, roll, cfg, now)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpin {
    pub tier: SlotTier,
    pub symbols: [String; 3],
}

impl SlotSpin {
    pub fn is_loss(&self) -> bool {
        self.tier.multiplier == 0
    }

    pub fn reels(&self) -> String {
        format!("{} ┃ {} ┃ {}", self.symbols[0], self.symbols[1], self.symbols[2])
    }
}

/// Draw an outcome tier and the symbols shown for it.
pub fn spin_slots<R: Rng + ?Sized>(tiers: &[SlotTier], rng: &mut R) -> Option<SlotSpin> {
    let tier = pick_weighted(tiers, |t| t.weight, rng)?.clone();
    let symbols = if tier.multiplier == 0 {
        loss_symbols(tiers, rng)
    } else {
        [tier.emoji.clone(), tier.emoji.clone(), tier.emoji.clone()]
    };
    Some(SlotSpin { tier, symbols })
}

fn loss_symbols<R: Rng + ?Sized>(tiers: &[SlotTier], rng: &mut R) -> [String; 3] {
    let mut pool: Vec<String> = Vec::new();
    for t in tiers {
        if !pool.contains(&t.emoji) {
            pool.push(t.emoji.clone());
        }
    }
    for filler in LOSS_FILLERS {
        if pool.len() >= 3 {
            break;
        }
        if !pool.iter().any(|p| p == filler) {
            pool.push(filler.to_string());
        }
    }
    pool.shuffle(rng);
    [pool[0].clone(), pool[1].clone(), pool[2].clone()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotReport {
    pub spin: SlotSpin,
    pub stake: u64,
    pub payout: u64,
    pub balance: u64,
    pub exp: Option<LevelChange>,
}

pub fn settle_slots(
    user: &mut UserRecord,
    stake: u64,
    spin: SlotSpin,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
) -> Result<SlotReport, EconomyError> {
    validate_stake(stake, &cfg.slots)?;
    user.place_stake(stake)?;
    let multiplier = spin.tier.multiplier;
    let mut payout = 0;
    let mut exp = None;
    match multiplier {
        0 => user.record_stat(StatKind::Lost, stake),
        1 => {
            // Draw: the stake comes back; not counted as a win or a loss.
            let before = user.balance;
            user.credit(stake, now);
            payout = user.balance - before;
        }
        m => {
            let win = stake * m;
            let before = user.balance;
            user.credit(win, now);
            payout = user.balance - before;
            user.record_stat(StatKind::Won, win - stake);
            exp = Some(user.add_experience(cfg.slots_win_exp, now));
        }
    }
    Ok(SlotReport {
        spin,
        stake,
        payout,
        balance: user.balance,
        exp,
    })
}

pub fn play_slots<R: Rng + ?Sized>(
    user: &mut UserRecord,
    stake: u64,
    cfg: &GamblingConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<SlotReport, EconomyError> {
    validate_stake(stake, &cfg.slots)?;
    let spin = spin_slots(&cfg.slot_tiers, rng)
        .ok_or_else(|| EconomyError::Internal("slot table has no weighted tiers".into()))?;
    settle_slots(user, stake, spin, cfg, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn user() -> UserRecord {
        UserRecord::new("g", Utc::now())
    }

    #[test]
    fn coinflip_net_is_plus_or_minus_stake() {
        let cfg = GamblingConfig::default();
        let now = Utc::now();
        let mut u = user();
        let r = settle_coinflip(&mut u, 100, CoinSide::Heads, CoinSide::Heads, &cfg, now).unwrap();
        assert!(r.won);
        assert_eq!(u.balance, 1100);
        assert_eq!(u.total_won, 100);
        assert_eq!(u.experience, 20);

        let r = settle_coinflip(&mut u, 100, CoinSide::Heads, CoinSide::Tails, &cfg, now).unwrap();
        assert!(!r.won);
        assert_eq!(u.balance, 1000);
        assert_eq!(u.total_lost, 100);
        assert_eq!(u.total_gambled, 200);
    }

    #[test]
    fn coinflip_rejects_overdraw_without_mutation() {
        let cfg = GamblingConfig::default();
        let mut u = user();
        let err = settle_coinflip(&mut u, 5000, CoinSide::Tails, CoinSide::Tails, &cfg, Utc::now());
        assert!(matches!(err, Err(EconomyError::InsufficientFunds { .. })));
        assert_eq!(u.balance, 1000);
        assert_eq!(u.total_gambled, 0);
    }

    #[test]
    fn dice_payout_table() {
        let cfg = GamblingConfig::default();
        let now = Utc::now();

        let mut u = user();
        let r = settle_dice(&mut u, 100, 6, 6, &cfg, now).unwrap();
        assert_eq!(r.multiplier, 5);
        assert_eq!(u.balance, 1000 - 100 + 500);
        assert_eq!(u.experience, 30);

        let mut u = user();
        settle_dice(&mut u, 100, 6, 4, &cfg, now).unwrap();
        assert_eq!(u.balance, 1000 - 100 + 200);
        assert_eq!(u.total_won, 100);

        let mut u = user();
        settle_dice(&mut u, 100, 6, 2, &cfg, now).unwrap();
        assert_eq!(u.balance, 900);
        assert_eq!(u.total_lost, 100);
    }

    #[test]
    fn dice_choice_outside_one_to_six_is_dropped() {
        assert_eq!(parse_dice_choice("3"), Some(3));
        assert_eq!(parse_dice_choice(" 6 "), Some(6));
        assert_eq!(parse_dice_choice("0"), None);
        assert_eq!(parse_dice_choice("7"), None);
        assert_eq!(parse_dice_choice("9"), None);
        assert_eq!(parse_dice_choice("x"), None);
    }

    #[test]
    fn coinflip_explicit_amount_ignores_max_bet() {
        let cfg = GamblingConfig::default();
        let now = Utc::now();
        let mut u = user();
        u.balance = 1_000_000;
        let stake = cfg.coinflip.max_bet * 3;
        let r = settle_coinflip(&mut u, stake, CoinSide::Heads, CoinSide::Tails, &cfg, now).unwrap();
        assert!(!r.won);
        assert_eq!(u.balance, 1_000_000 - stake);
        assert_eq!(u.total_gambled, stake);

        let below_min = cfg.coinflip.min_bet.saturating_sub(1);
        assert!(settle_coinflip(&mut u, below_min, CoinSide::Heads, CoinSide::Heads, &cfg, now).is_err());
    }

    #[test]
    fn stake_limits_enforced() {
        let limits = BetLimits {
            min_bet: 10,
            max_bet: 100,
        };
        assert!(validate_stake(0, &limits).is_err());
        assert!(validate_stake(9, &limits).is_err());
        assert!(validate_stake(101, &limits).is_err());
        assert!(validate_stake(50, &limits).is_ok());
    }

    #[test]
    fn slot_symbols_follow_outcome() {
        let cfg = GamblingConfig::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..500 {
            let spin = spin_slots(&cfg.slot_tiers, &mut rng).unwrap();
            if spin.is_loss() {
                let [a, b, c] = &spin.symbols;
                assert!(a != b && b != c && a != c, "loss must show distinct symbols");
            } else {
                assert!(spin.symbols.iter().all(|s| *s == spin.tier.emoji));
            }
        }
    }

    #[test]
    fn slot_settlement_by_tier() {
        let cfg = GamblingConfig::default();
        let now = Utc::now();
        let tier = |key: &str| cfg.slot_tiers.iter().find(|t| t.key == key).unwrap().clone();
        let spin = |t: SlotTier| SlotSpin {
            symbols: [t.emoji.clone(), t.emoji.clone(), t.emoji.clone()],
            tier: t,
        };

        let mut u = user();
        settle_slots(&mut u, 100, spin(tier("diamond")), &cfg, now).unwrap();
        assert_eq!(u.balance, 1900);
        assert_eq!(u.total_won, 900);

        let mut u = user();
        settle_slots(&mut u, 100, spin(tier("draw")), &cfg, now).unwrap();
        assert_eq!(u.balance, 1000);
        assert_eq!(u.total_won + u.total_lost, 0);

        let mut u = user();
        settle_slots(&mut u, 100, spin(tier("lose")), &cfg, now).unwrap();
        assert_eq!(u.balance, 900);
        assert_eq!(u.total_lost, 100);
    }
}
