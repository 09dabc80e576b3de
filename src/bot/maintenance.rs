//! Wall-clock maintenance driven by the server's one-second tick.
//!
//! Three sweeps run on UTC boundaries:
//! - daily: clear every `daily_claimed` flag at `reset_hour:00`
//! - weekly: clear every `weekly_claimed` flag at `reset_hour:00` on the configured weekday
//! - hourly: drop expired boosters at minute 0
//!
//! Like the beacon and backup schedulers, each check is deduplicated by Unix epoch minute
//! so the sixty ticks inside a boundary minute fire a sweep at most once.
use chrono::{DateTime, Datelike, Timelike, Utc};
use log::{debug, info};

use crate::config::MaintenanceConfig;
use crate::economy::{EconomyError, EconomyStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Records whose daily flag was cleared, when the daily sweep ran.
    pub daily_reset: Option<usize>,
    pub weekly_reset: Option<usize>,
    /// Boosters removed, when the hourly sweep ran.
    pub boosters_expired: Option<usize>,
}

impl MaintenanceReport {
    pub fn ran_anything(&self) -> bool {
        self.daily_reset.is_some() || self.weekly_reset.is_some() || self.boosters_expired.is_some()
    }
}

pub struct MaintenanceScheduler {
    config: MaintenanceConfig,
    last_daily_minute: Option<i64>,
    last_weekly_minute: Option<i64>,
    last_sweep_minute: Option<i64>,
}

impl MaintenanceScheduler {
    pub fn new(config: MaintenanceConfig) -> Self {
        Self {
            config,
            last_daily_minute: None,
            last_weekly_minute: None,
            last_sweep_minute: None,
        }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    fn is_daily_boundary(&self, now: &DateTime<Utc>) -> bool {
        now.hour() == self.config.reset_hour && now.minute() == 0
    }

    fn is_weekly_boundary(&self, now: &DateTime<Utc>) -> bool {
        self.is_daily_boundary(now) && now.weekday() == self.config.weekly_weekday()
    }

    /// Run whichever sweeps are due at `now`.
    pub fn tick(
        &mut self,
        store: &EconomyStore,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceReport, EconomyError> {
        let mut report = MaintenanceReport::default();
        if !self.config.enabled {
            return Ok(report);
        }
        let minute_key = now.timestamp() / 60;

        if self.is_daily_boundary(&now) && self.last_daily_minute != Some(minute_key) {
            self.last_daily_minute = Some(minute_key);
            let n = reset_daily_flags(store)?;
            info!("Daily reset cleared {} claim flag(s)", n);
            report.daily_reset = Some(n);
        }

        if self.is_weekly_boundary(&now) && self.last_weekly_minute != Some(minute_key) {
            self.last_weekly_minute = Some(minute_key);
            let n = reset_weekly_flags(store)?;
            info!("Weekly reset cleared {} claim flag(s)", n);
            report.weekly_reset = Some(n);
        }

        if self.config.booster_sweep
            && now.minute() == 0
            && self.last_sweep_minute != Some(minute_key)
        {
            self.last_sweep_minute = Some(minute_key);
            let n = sweep_expired_boosters(store, now)?;
            if n > 0 {
                info!("Expired {} booster(s)", n);
            } else {
                debug!("Booster sweep found nothing to expire");
            }
            report.boosters_expired = Some(n);
        }

        Ok(report)
    }
}

pub fn reset_daily_flags(store: &EconomyStore) -> Result<usize, EconomyError> {
    store.sweep_users(|rec| std::mem::replace(&mut rec.daily_claimed, false))
}

pub fn reset_weekly_flags(store: &EconomyStore) -> Result<usize, EconomyError> {
    store.sweep_users(|rec| std::mem::replace(&mut rec.weekly_claimed, false))
}

/// Delete every booster whose expiry has passed. Returns the number of boosters removed.
pub fn sweep_expired_boosters(
    store: &EconomyStore,
    now: DateTime<Utc>,
) -> Result<usize, EconomyError> {
    let mut removed = 0usize;
    store.sweep_users(|rec| {
        let n = rec.expire_boosters(now);
        removed += n;
        n > 0
    })?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn boundaries_follow_config() {
        let sched = MaintenanceScheduler::new(MaintenanceConfig::default());
        // 2026-10-18 is a Sunday.
        let sunday_midnight = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 30).unwrap();
        let monday_midnight = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let monday_late = Utc.with_ymd_and_hms(2026, 10, 19, 0, 1, 0).unwrap();
        assert!(sched.is_weekly_boundary(&sunday_midnight));
        assert!(sched.is_daily_boundary(&monday_midnight));
        assert!(!sched.is_weekly_boundary(&monday_midnight));
        assert!(!sched.is_daily_boundary(&monday_late));
    }
}
