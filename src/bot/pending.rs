//! Bounded waits for a yes/no answer from one user.
//!
//! Duel challenges and admin reset confirmations park a [PendingDecision] in the
//! [PendingBook], keyed by the user whose answer is awaited. An entry leaves the book
//! exactly once: through [PendingBook::take] when an accept/decline signal arrives, or
//! through [PendingBook::drain_expired] on the housekeeping tick. Whichever path removes
//! it owns the terminal branch, so a late signal and the timeout can never both run.
//!
//! The book lives only in memory; pending prompts are dropped on restart.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::economy::EconomyError;
use crate::games::Duel;

#[derive(Debug, Clone, PartialEq)]
pub enum PendingDecision {
    /// Waiting on the defender to accept or decline.
    Duel { duel: Duel, channel: String },
    /// Waiting on the requesting admin to confirm a reset of `target_id`.
    Reset {
        admin_id: String,
        target_id: String,
        channel: String,
    },
}

impl PendingDecision {
    fn involves(&self, user_id: &str) -> bool {
        match self {
            PendingDecision::Duel { duel, .. } => duel.challenger == user_id || duel.defender == user_id,
            PendingDecision::Reset {
                admin_id,
                target_id,
                ..
            } => admin_id == user_id || target_id == user_id,
        }
    }
}

#[derive(Debug)]
struct Entry {
    decision: PendingDecision,
    deadline: Instant,
}

/// Outcome of taking an entry for a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Taken {
    InTime(PendingDecision),
    /// The signal arrived after the deadline but before the sweep.
    Late(PendingDecision),
}

#[derive(Debug, Default)]
pub struct PendingBook {
    entries: HashMap<String, Entry>,
}

impl PendingBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a decision for `responder`. A user can owe at most one answer at a time.
    pub fn insert(
        &mut self,
        responder: &str,
        decision: PendingDecision,
        window: Duration,
        now: Instant,
    ) -> Result<(), EconomyError> {
        if self.entries.contains_key(responder) {
            return Err(EconomyError::InvalidArgument(format!(
                "<@{}> already has a pending request, try again shortly",
                responder
            )));
        }
        self.entries.insert(
            responder.to_string(),
            Entry {
                decision,
                deadline: now + window,
            },
        );
        Ok(())
    }

    pub fn take(&mut self, responder: &str, now: Instant) -> Option<Taken> {
        let entry = self.entries.remove(responder)?;
        if now >= entry.deadline {
            Some(Taken::Late(entry.decision))
        } else {
            Some(Taken::InTime(entry.decision))
        }
    }

    pub fn contains(&self, responder: &str) -> bool {
        self.entries.contains_key(responder)
    }

    /// Whether `user_id` takes part in any pending decision, on either side.
    pub fn involves(&self, user_id: &str) -> bool {
        self.entries.values().any(|e| e.decision.involves(user_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<(String, PendingDecision)> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now >= e.deadline)
            .map(|(k, _)| k.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|k| self.entries.remove(&k).map(|e| (k, e.decision)))
            .collect()
    }
}
