mod common;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use common::*;
use ksaekvat::bot::maintenance::MaintenanceScheduler;
use ksaekvat::config::MaintenanceConfig;
use ksaekvat::economy::{BoosterKind, EconomyStore};
use std::time::Instant;

fn seeded_store(tmp: &tempfile::TempDir) -> EconomyStore {
    let store = EconomyStore::open(tmp.path().join("economy")).unwrap();
    let base = Utc.with_ymd_and_hms(2026, 10, 20, 12, 30, 0).unwrap();
    for id in ["1", "2", "3"] {
        store
            .update_user(id, |u| {
                u.daily_claimed = true;
                u.weekly_claimed = true;
                Ok(())
            })
            .unwrap();
    }
    store
        .update_user("1", |u| {
            u.add_booster(BoosterKind::Money, 2.0, ChronoDuration::minutes(10), base);
            u.add_booster(BoosterKind::Exp, 2.0, ChronoDuration::minutes(90), base);
            Ok(())
        })
        .unwrap();
    store
}

#[test]
fn midnight_sunday_runs_every_sweep_once() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded_store(&tmp);
    let mut sched = MaintenanceScheduler::new(MaintenanceConfig::default());

    // 2026-10-18 is a Sunday.
    let first = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 1).unwrap();
    let report = sched.tick(&store, first).unwrap();
    assert_eq!(report.daily_reset, Some(3));
    assert_eq!(report.weekly_reset, Some(3));
    assert!(report.boosters_expired.is_some());

    // Later ticks inside the same minute are deduplicated.
    let again = sched.tick(&store, first + ChronoDuration::seconds(30)).unwrap();
    assert!(!again.ran_anything());

    for id in ["1", "2", "3"] {
        let rec = store.get_user(id).unwrap();
        assert!(!rec.daily_claimed);
        assert!(!rec.weekly_claimed);
    }
}

#[test]
fn weekday_midnight_leaves_weekly_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded_store(&tmp);
    let mut sched = MaintenanceScheduler::new(MaintenanceConfig::default());

    let tuesday = Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap();
    let report = sched.tick(&store, tuesday).unwrap();
    assert_eq!(report.daily_reset, Some(3));
    assert_eq!(report.weekly_reset, None);
    assert!(store.get_user("2").unwrap().weekly_claimed);

    let mid_hour = Utc.with_ymd_and_hms(2026, 10, 20, 13, 27, 0).unwrap();
    assert!(!sched.tick(&store, mid_hour).unwrap().ran_anything());
}

#[test]
fn hourly_sweep_drops_only_expired_boosters() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded_store(&tmp);
    let mut sched = MaintenanceScheduler::new(MaintenanceConfig::default());

    // Money booster ran out at 12:40, the exp booster lasts until 14:00.
    let top_of_hour = Utc.with_ymd_and_hms(2026, 10, 20, 13, 0, 0).unwrap();
    let report = sched.tick(&store, top_of_hour).unwrap();
    assert_eq!(report.boosters_expired, Some(1));

    let rec = store.get_user("1").unwrap();
    assert!(!rec.boosters.contains_key(&BoosterKind::Money));
    assert!(rec.boosters.contains_key(&BoosterKind::Exp));
}

#[test]
fn disabled_maintenance_does_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = seeded_store(&tmp);
    let mut sched = MaintenanceScheduler::new(MaintenanceConfig {
        enabled: false,
        ..MaintenanceConfig::default()
    });
    let midnight = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
    assert!(!sched.tick(&store, midnight).unwrap().ran_anything());
    assert!(store.get_user("1").unwrap().daily_claimed);
}

#[tokio::test]
async fn server_tick_drives_the_daily_reset() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;

    say(&mut server, ALICE, "kdaily").await;
    assert!(server.store().get_user(ALICE).unwrap().daily_claimed);

    let midnight = Utc.with_ymd_and_hms(2026, 10, 21, 0, 0, 0).unwrap();
    let report = server.tick(midnight, Instant::now()).await.unwrap();
    assert_eq!(report.daily_reset, Some(1));
    assert!(!server.store().get_user(ALICE).unwrap().daily_claimed);
}
