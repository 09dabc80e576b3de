//! PvP duels.
//!
//! A duel is a small state machine:
//!
//! ```text
//! Proposed -> Accepted -> InProgress -> Resolved
//! Proposed -> Declined
//! Proposed -> Expired
//! ```
//!
//! Nothing is debited until the duel runs, so a declined or expired duel leaves both
//! records untouched. The response deadline itself is tracked by the bot's pending book.
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::BattleConfig;
use crate::economy::{EconomyError, LevelChange, StatKind, UserRecord};
use crate::games::battle::{duel_winner, run_rounds, BattleLog, CombatStats, Side, DUEL_SPREAD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    Proposed,
    Accepted,
    InProgress,
    Resolved,
    Declined,
    Expired,
}

impl DuelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuelState::Proposed => "proposed",
            DuelState::Accepted => "accepted",
            DuelState::InProgress => "in_progress",
            DuelState::Resolved => "resolved",
            DuelState::Declined => "declined",
            DuelState::Expired => "expired",
        }
    }

    pub fn can_transition(&self, to: DuelState) -> bool {
        use DuelState::*;
        matches!(
            (self, to),
            (Proposed, Accepted)
                | (Proposed, Declined)
                | (Proposed, Expired)
                | (Accepted, InProgress)
                | (InProgress, Resolved)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DuelState::Resolved | DuelState::Declined | DuelState::Expired
        )
    }
}

impl fmt::Display for DuelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Duel {
    pub challenger: String,
    pub defender: String,
    pub bet: u64,
    pub created_at: DateTime<Utc>,
    state: DuelState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuelReport {
    pub winner: String,
    pub loser: String,
    pub challenger_stats: CombatStats,
    pub defender_stats: CombatStats,
    pub log: BattleLog,
    pub bet: u64,
    pub payout: u64,
    pub winner_exp: LevelChange,
    pub loser_exp: LevelChange,
}

fn check_funds(user: &UserRecord, bet: u64) -> Result<(), EconomyError> {
    if user.has_balance(bet) {
        Ok(())
    } else {
        Err(EconomyError::InsufficientFunds {
            needed: bet,
            available: user.balance,
        })
    }
}

impl Duel {
    /// Open a challenge. Both sides must be able to cover `bet` right now.
    pub fn propose(
        challenger: &UserRecord,
        defender: &UserRecord,
        bet: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, EconomyError> {
        if challenger.id == defender.id {
            return Err(EconomyError::InvalidArgument(
                "you cannot duel yourself".into(),
            ));
        }
        check_funds(challenger, bet)?;
        check_funds(defender, bet).map_err(|_| {
            EconomyError::InvalidArgument(format!(
                "<@{}> doesn't have enough to accept a bet of {}",
                defender.id, bet
            ))
        })?;
        Ok(Self {
            challenger: challenger.id.clone(),
            defender: defender.id.clone(),
            bet,
            created_at: now,
            state: DuelState::Proposed,
        })
    }

    pub fn state(&self) -> DuelState {
        self.state
    }

    pub fn transition(&mut self, to: DuelState) -> Result<(), EconomyError> {
        if !self.state.can_transition(to) {
            return Err(EconomyError::InvalidTransition {
                from: self.state.as_str(),
                to: to.as_str(),
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn accept(&mut self) -> Result<(), EconomyError> {
        self.transition(DuelState::Accepted)
    }

    pub fn decline(&mut self) -> Result<(), EconomyError> {
        self.transition(DuelState::Declined)
    }

    pub fn expire(&mut self) -> Result<(), EconomyError> {
        self.transition(DuelState::Expired)
    }

    /// Run an accepted duel to resolution and settle stakes and experience.
    ///
    /// Funds are re-checked for both sides before anything is debited.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        challenger: &mut UserRecord,
        defender: &mut UserRecord,
        cfg: &BattleConfig,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<DuelReport, EconomyError> {
        if challenger.id != self.challenger || defender.id != self.defender {
            return Err(EconomyError::Internal(
                "duel records do not match the proposal".into(),
            ));
        }
        if self.state != DuelState::Accepted {
            return Err(EconomyError::InvalidTransition {
                from: self.state.as_str(),
                to: DuelState::InProgress.as_str(),
            });
        }
        check_funds(challenger, self.bet)?;
        check_funds(defender, self.bet)?;
        self.transition(DuelState::InProgress)?;

        if self.bet > 0 {
            challenger.place_stake(self.bet)?;
            defender.place_stake(self.bet)?;
        }

        let challenger_stats = CombatStats::for_user(challenger);
        let defender_stats = CombatStats::for_user(defender);
        let log = run_rounds(
            &challenger_stats,
            &defender_stats,
            cfg.duel_max_rounds,
            DUEL_SPREAD,
            rng,
        );
        let side = duel_winner(&challenger_stats, &defender_stats, &log, rng);
        let (winner, loser) = match side {
            Side::First => (challenger, defender),
            Side::Second => (defender, challenger),
        };

        let mut payout = 0;
        if self.bet > 0 {
            let before = winner.balance;
            winner.credit(self.bet * 2, now);
            payout = winner.balance - before;
            winner.record_stat(StatKind::Won, self.bet);
            loser.record_stat(StatKind::Lost, self.bet);
        }
        let winner_exp = winner.add_experience(cfg.duel_winner_exp, now);
        let loser_exp = loser.add_experience(cfg.duel_loser_exp, now);
        self.transition(DuelState::Resolved)?;

        Ok(DuelReport {
            winner: winner.id.clone(),
            loser: loser.id.clone(),
            challenger_stats,
            defender_stats,
            log,
            bet: self.bet,
            payout,
            winner_exp,
            loser_exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pair() -> (UserRecord, UserRecord) {
        let now = Utc::now();
        (UserRecord::new("alice", now), UserRecord::new("bob", now))
    }

    #[test]
    fn transitions_are_validated() {
        let (a, b) = pair();
        let mut duel = Duel::propose(&a, &b, 0, Utc::now()).unwrap();
        assert_eq!(duel.state(), DuelState::Proposed);
        assert!(matches!(
            duel.transition(DuelState::Resolved),
            Err(EconomyError::InvalidTransition { from: "proposed", to: "resolved" })
        ));
        duel.expire().unwrap();
        assert!(duel.state().is_terminal());
        assert!(duel.accept().is_err());
        assert!(duel.decline().is_err());
    }

    #[test]
    fn propose_checks_both_balances_and_self() {
        let (a, b) = pair();
        assert!(Duel::propose(&a, &a, 0, Utc::now()).is_err());
        assert!(matches!(
            Duel::propose(&a, &b, 5000, Utc::now()),
            Err(EconomyError::InsufficientFunds { .. })
        ));
        let mut rich = a.clone();
        rich.balance = 10_000;
        assert!(matches!(
            Duel::propose(&rich, &b, 5000, Utc::now()),
            Err(EconomyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn unaccepted_duel_cannot_run() {
        let (mut a, mut b) = pair();
        let mut duel = Duel::propose(&a, &b, 100, Utc::now()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let cfg = BattleConfig::default();
        assert!(duel.run(&mut a, &mut b, &cfg, Utc::now(), &mut rng).is_err());
        assert_eq!(a.balance, 1000);
        assert_eq!(b.balance, 1000);
    }

    #[test]
    fn resolved_duel_moves_stakes_and_exp() {
        let cfg = BattleConfig::default();
        let mut rng = StdRng::seed_from_u64(77);
        for _ in 0..10 {
            let (mut a, mut b) = pair();
            let mut duel = Duel::propose(&a, &b, 300, Utc::now()).unwrap();
            duel.accept().unwrap();
            let report = duel.run(&mut a, &mut b, &cfg, Utc::now(), &mut rng).unwrap();
            assert_eq!(duel.state(), DuelState::Resolved);
            assert_eq!(a.balance + b.balance, 2000);
            let (w, l) = if report.winner == "alice" { (&a, &b) } else { (&b, &a) };
            assert_eq!(w.balance, 1300);
            assert_eq!(l.balance, 700);
            assert_eq!(w.experience, 50);
            assert_eq!(l.experience, 25);
            assert_eq!(w.total_won, 300);
            assert_eq!(l.total_lost, 300);
            assert_eq!(a.total_gambled, 300);
            assert_eq!(b.total_gambled, 300);
            assert!(report.log.rounds <= 10);
        }
    }
}
