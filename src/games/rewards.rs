//! Timed claims (daily, weekly), work shifts and player-to-player payments.
//!
//! The random base of each reward goes through the money booster once; level bonuses and
//! tips are added on top unboosted.
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{EconomyConfig, RangeConfig};
use crate::economy::{BoosterKind, EconomyError, LevelChange, UserRecord};

pub const DAILY_WINDOW_HOURS: i64 = 24;
pub const WEEKLY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub base: u64,
    pub boosted: u64,
    pub level_bonus: u64,
    pub total: u64,
    pub balance: u64,
    pub exp: LevelChange,
    /// Multiplier of the money booster that was active, if any.
    pub booster_multiplier: Option<f64>,
    /// Booster granted by this claim (weekly only).
    pub bonus_booster: Option<BoosterKind>,
}

fn roll_range<R: Rng + ?Sized>(range: &RangeConfig, rng: &mut R) -> u64 {
    if range.max <= range.min {
        return range.min;
    }
    rng.gen_range(range.min..=range.max)
}

/// Time left before a claim made at `last` reopens, if it has not yet.
pub fn remaining(last: Option<DateTime<Utc>>, window: Duration, now: DateTime<Utc>) -> Option<Duration> {
    let last = last?;
    let elapsed = now - last;
    if elapsed < window {
        Some(window - elapsed)
    } else {
        None
    }
}

fn wait_message(left: Duration) -> String {
    if left.num_days() > 0 {
        format!("{}d {}h", left.num_days(), left.num_hours() % 24)
    } else {
        format!("{}h {}m", left.num_hours(), left.num_minutes() % 60)
    }
}

fn credit_claim<R: Rng + ?Sized>(
    user: &mut UserRecord,
    range: &RangeConfig,
    level_bonus_per_level: u64,
    now: DateTime<Utc>,
    rng: &mut R,
) -> (u64, u64, u64, Option<f64>) {
    let base = roll_range(range, rng);
    let booster_multiplier = user
        .active_booster(BoosterKind::Money, now)
        .map(|b| b.multiplier);
    let boosted = user.boosted(BoosterKind::Money, base, now);
    let level_bonus = u64::from(user.level) * level_bonus_per_level;
    user.credit_raw(boosted + level_bonus);
    (base, boosted, level_bonus, booster_multiplier)
}

pub fn claim_daily<R: Rng + ?Sized>(
    user: &mut UserRecord,
    cfg: &EconomyConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Claim, EconomyError> {
    if let Some(left) = remaining(user.last_daily, Duration::hours(DAILY_WINDOW_HOURS), now) {
        return Err(EconomyError::InvalidArgument(format!(
            "you've already claimed your daily reward, come back in {}",
            wait_message(left)
        )));
    }
    let (base, boosted, level_bonus, booster_multiplier) =
        credit_claim(user, &cfg.daily, cfg.daily_level_bonus, now, rng);
    user.last_daily = Some(now);
    user.daily_claimed = true;
    let exp = user.add_experience(cfg.daily_exp, now);
    Ok(Claim {
        base,
        boosted,
        level_bonus,
        total: boosted + level_bonus,
        balance: user.balance,
        exp,
        booster_multiplier,
        bonus_booster: None,
    })
}

pub fn claim_weekly<R: Rng + ?Sized>(
    user: &mut UserRecord,
    cfg: &EconomyConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Claim, EconomyError> {
    if let Some(left) = remaining(user.last_weekly, Duration::days(WEEKLY_WINDOW_DAYS), now) {
        return Err(EconomyError::InvalidArgument(format!(
            "you've already claimed your weekly reward, come back in {}",
            wait_message(left)
        )));
    }
    let (base, boosted, level_bonus, booster_multiplier) =
        credit_claim(user, &cfg.weekly, cfg.weekly_level_bonus, now, rng);
    let mut bonus_booster = None;
    if rng.gen::<f64>() < cfg.weekly_booster_chance {
        let kind = if rng.gen_bool(0.5) {
            BoosterKind::Money
        } else {
            BoosterKind::Exp
        };
        user.add_booster(kind, 2.0, Duration::minutes(cfg.weekly_booster_minutes), now);
        bonus_booster = Some(kind);
    }
    user.last_weekly = Some(now);
    user.weekly_claimed = true;
    let exp = user.add_experience(cfg.weekly_exp, now);
    Ok(Claim {
        base,
        boosted,
        level_bonus,
        total: boosted + level_bonus,
        balance: user.balance,
        exp,
        booster_multiplier,
        bonus_booster,
    })
}

pub const JOBS: [(&str, &str, &str); 12] = [
    ("Freelance Developer", "coded some websites", "💻"),
    ("Barista", "made delicious coffee", "☕"),
    ("Tutor", "taught students", "📚"),
    ("Food Critic", "reviewed restaurants", "🍽️"),
    ("Street Performer", "entertained people", "🎭"),
    ("Content Creator", "made viral videos", "📹"),
    ("Gardener", "tended to beautiful gardens", "🌱"),
    ("Photographer", "took stunning photos", "📸"),
    ("Chef", "cooked amazing meals", "👨‍🍳"),
    ("Taxi Driver", "gave rides to customers", "🚕"),
    ("Cleaner", "cleaned office buildings", "🧹"),
    ("Translator", "translated documents", "🌍"),
];

const TIP_CHANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Shift {
    pub job: &'static str,
    pub action: &'static str,
    pub emoji: &'static str,
    pub claim: Claim,
    pub tip: u64,
}

pub fn work<R: Rng + ?Sized>(
    user: &mut UserRecord,
    cfg: &EconomyConfig,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Shift {
    let (job, action, emoji) = *JOBS.choose(rng).unwrap_or(&JOBS[0]);
    let (base, boosted, level_bonus, booster_multiplier) =
        credit_claim(user, &cfg.work, cfg.work_level_bonus, now, rng);
    let tip = if rng.gen::<f64>() < TIP_CHANCE {
        rng.gen_range(50..250)
    } else {
        0
    };
    user.credit_raw(tip);
    let exp = user.add_experience(cfg.work_exp, now);
    Shift {
        job,
        action,
        emoji,
        claim: Claim {
            base,
            boosted,
            level_bonus,
            total: boosted + level_bonus + tip,
            balance: user.balance,
            exp,
            booster_multiplier,
            bonus_booster: None,
        },
        tip,
    }
}

/// Parse a payment amount: a positive integer, or `all`/`max` for the whole balance.
pub fn parse_payment(arg: &str, balance: u64) -> Result<u64, EconomyError> {
    let amount = match arg.trim().to_ascii_lowercase().as_str() {
        "all" | "max" => balance,
        other => other.parse::<u64>().map_err(|_| {
            EconomyError::InvalidAmount(
                "give a positive number, or \"all\" to pay your entire balance".into(),
            )
        })?,
    };
    if amount == 0 {
        return Err(EconomyError::InvalidAmount(
            "minimum payment amount is 1".into(),
        ));
    }
    Ok(amount)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment {
    pub amount: u64,
    pub received: u64,
    pub sender_balance: u64,
    pub recipient_balance: u64,
}

/// Move `amount` from `sender` to `recipient`. The recipient's money booster applies.
pub fn pay(
    sender: &mut UserRecord,
    recipient: &mut UserRecord,
    amount: u64,
    cfg: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<Payment, EconomyError> {
    if sender.id == recipient.id {
        return Err(EconomyError::InvalidArgument("you cannot pay yourself".into()));
    }
    if amount == 0 {
        return Err(EconomyError::InvalidAmount("minimum payment amount is 1".into()));
    }
    let limit = cfg.pay_limit_for(sender.level);
    if amount > limit {
        return Err(EconomyError::InvalidAmount(format!(
            "you can only pay up to {} at level {}",
            limit, sender.level
        )));
    }
    sender.try_debit(amount)?;
    let before = recipient.balance;
    recipient.credit(amount, now);
    Ok(Payment {
        amount,
        received: recipient.balance - before,
        sender_balance: sender.balance,
        recipient_balance: recipient.balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn daily_window_blocks_second_claim() {
        let cfg = EconomyConfig::default();
        let now = Utc::now();
        let mut u = UserRecord::new("d", now);
        let mut rng = StdRng::seed_from_u64(1);
        let claim = claim_daily(&mut u, &cfg, now, &mut rng).unwrap();
        assert!((1000..=5000).contains(&claim.base));
        assert_eq!(claim.level_bonus, 10);
        assert_eq!(u.balance, 1000 + claim.total);
        assert!(u.daily_claimed);
        assert_eq!(u.experience, 25);

        let again = claim_daily(&mut u, &cfg, now + Duration::hours(23), &mut rng);
        assert!(matches!(again, Err(EconomyError::InvalidArgument(_))));
        assert!(claim_daily(&mut u, &cfg, now + Duration::hours(24), &mut rng).is_ok());
    }

    #[test]
    fn booster_applies_to_base_only() {
        let cfg = EconomyConfig::default();
        let now = Utc::now();
        let mut u = UserRecord::new("d", now);
        u.add_booster(BoosterKind::Money, 2.0, Duration::minutes(10), now);
        let mut rng = StdRng::seed_from_u64(9);
        let claim = claim_weekly(&mut u, &cfg, now, &mut rng).unwrap();
        assert_eq!(claim.boosted, claim.base * 2);
        assert_eq!(claim.level_bonus, 50);
        assert_eq!(claim.booster_multiplier, Some(2.0));
        assert!(u.weekly_claimed);
        assert!(claim_weekly(&mut u, &cfg, now + Duration::days(6), &mut rng).is_err());
    }

    #[test]
    fn work_pays_range_plus_level_bonus() {
        let cfg = EconomyConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..25 {
            let mut u = UserRecord::new("w", Utc::now());
            let shift = work(&mut u, &cfg, Utc::now(), &mut rng);
            assert!((100..=1000).contains(&shift.claim.base));
            assert!(shift.tip == 0 || (50..250).contains(&shift.tip));
            assert_eq!(u.balance, 1000 + shift.claim.base + 2 + shift.tip);
        }
    }

    #[test]
    fn payment_parsing() {
        assert_eq!(parse_payment("all", 700).unwrap(), 700);
        assert_eq!(parse_payment("MAX", 5).unwrap(), 5);
        assert_eq!(parse_payment("42", 5).unwrap(), 42);
        assert!(parse_payment("-3", 5).is_err());
        assert!(parse_payment("0", 5).is_err());
        assert!(parse_payment("all", 0).is_err());
    }

    #[test]
    fn pay_enforces_self_limit_and_funds() {
        let cfg = EconomyConfig::default();
        let now = Utc::now();
        let mut a = UserRecord::new("a", now);
        let mut b = UserRecord::new("b", now);
        let mut a2 = a.clone();
        assert!(pay(&mut a, &mut a2, 10, &cfg, now).is_err());

        a.balance = 1_000_000;
        assert!(matches!(
            pay(&mut a, &mut b, 250_001, &cfg, now),
            Err(EconomyError::InvalidAmount(_))
        ));
        a.set_level(10);
        let p = pay(&mut a, &mut b, 700_000, &cfg, now).unwrap();
        assert_eq!(p.sender_balance, 300_000);
        assert_eq!(p.recipient_balance, 701_000);

        assert!(matches!(
            pay(&mut a, &mut b, 300_001, &cfg, now),
            Err(EconomyError::InsufficientFunds { .. })
        ));
        assert_eq!(a.balance, 300_000);
    }

    #[test]
    fn recipient_booster_applies_to_payment() {
        let cfg = EconomyConfig::default();
        let now = Utc::now();
        let mut a = UserRecord::new("a", now);
        let mut b = UserRecord::new("b", now);
        b.add_booster(BoosterKind::Money, 2.0, Duration::minutes(1), now);
        let p = pay(&mut a, &mut b, 100, &cfg, now).unwrap();
        assert_eq!(p.received, 200);
        assert_eq!(a.balance, 900);
    }
}
