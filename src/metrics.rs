//! In-process counters for dispatch and maintenance.
//! Read by `status` style reporting and by tests; nothing is exported over the network.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

static EVENTS_RECEIVED: AtomicU64 = AtomicU64::new(0);
static OUTBOUND_SENT: AtomicU64 = AtomicU64::new(0);
static OUTBOUND_FAILED: AtomicU64 = AtomicU64::new(0);
static COOLDOWN_REJECTIONS: AtomicU64 = AtomicU64::new(0);
static DISPATCH_LATENCY_SUM_MS: AtomicU64 = AtomicU64::new(0);
static DISPATCH_LATENCY_COUNT: AtomicU64 = AtomicU64::new(0);
static DAILY_SWEEPS: AtomicU64 = AtomicU64::new(0);
static WEEKLY_SWEEPS: AtomicU64 = AtomicU64::new(0);
static BOOSTERS_EXPIRED: AtomicU64 = AtomicU64::new(0);

static COMMAND_COUNTERS: OnceLock<Mutex<HashMap<String, CommandCounter>>> = OnceLock::new();

pub fn inc_events_received() {
    EVENTS_RECEIVED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_outbound_sent() {
    OUTBOUND_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_outbound_failed() {
    OUTBOUND_FAILED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_cooldown_rejections() {
    COOLDOWN_REJECTIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn observe_dispatch_latency(elapsed: Duration) {
    DISPATCH_LATENCY_SUM_MS.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    DISPATCH_LATENCY_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Fold a maintenance tick's results into the sweep counters.
pub fn record_sweep(daily: bool, weekly: bool, boosters_expired: usize) {
    if daily {
        DAILY_SWEEPS.fetch_add(1, Ordering::Relaxed);
    }
    if weekly {
        WEEKLY_SWEEPS.fetch_add(1, Ordering::Relaxed);
    }
    BOOSTERS_EXPIRED.fetch_add(boosters_expired as u64, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommandCounter {
    pub invocations: u64,
    pub failures: u64,
    /// Failures that were not the user's fault (storage, internal).
    pub errors: u64,
}

fn command_counter_lock() -> MutexGuard<'static, HashMap<String, CommandCounter>> {
    COMMAND_COUNTERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn record_command(name: &str) -> CommandCounter {
    let mut guard = command_counter_lock();
    let counter = guard.entry(name.to_string()).or_default();
    counter.invocations = counter.invocations.saturating_add(1);
    *counter
}

pub fn record_command_failure(name: &str, user_facing: bool) -> CommandCounter {
    let mut guard = command_counter_lock();
    let counter = guard.entry(name.to_string()).or_default();
    counter.failures = counter.failures.saturating_add(1);
    if !user_facing {
        counter.errors = counter.errors.saturating_add(1);
    }
    *counter
}

pub fn command_counters_snapshot() -> HashMap<String, CommandCounter> {
    command_counter_lock().clone()
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub events_received: u64,
    pub outbound_sent: u64,
    pub outbound_failed: u64,
    pub cooldown_rejections: u64,
    pub dispatch_latency_avg_ms: Option<u64>,
    pub daily_sweeps: u64,
    pub weekly_sweeps: u64,
    pub boosters_expired: u64,
}

pub fn snapshot() -> Snapshot {
    let sum = DISPATCH_LATENCY_SUM_MS.load(Ordering::Relaxed);
    let count = DISPATCH_LATENCY_COUNT.load(Ordering::Relaxed);
    Snapshot {
        events_received: EVENTS_RECEIVED.load(Ordering::Relaxed),
        outbound_sent: OUTBOUND_SENT.load(Ordering::Relaxed),
        outbound_failed: OUTBOUND_FAILED.load(Ordering::Relaxed),
        cooldown_rejections: COOLDOWN_REJECTIONS.load(Ordering::Relaxed),
        dispatch_latency_avg_ms: if count > 0 { Some(sum / count) } else { None },
        daily_sweeps: DAILY_SWEEPS.load(Ordering::Relaxed),
        weekly_sweeps: WEEKLY_SWEEPS.load(Ordering::Relaxed),
        boosters_expired: BOOSTERS_EXPIRED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
pub(crate) fn reset_command_counters_for_tests() {
    if let Some(lock) = COMMAND_COUNTERS.get() {
        lock.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
