use chrono::{Duration, TimeZone, Utc};
use ksaekvat::economy::{BoosterKind, EconomyStore, Ledger, Rarity, StatKind};
use tokio_test::assert_ok;

#[test]
fn records_survive_reopening_the_store() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("economy");
    {
        let store = EconomyStore::open(&path).unwrap();
        let ledger = Ledger::new(&store);
        ledger.credit("42", 500).unwrap();
        ledger.add_animal("42", Rarity::Rare, "fox", 1).unwrap();
        ledger.update_stats("42", StatKind::Gambled, 75).unwrap();
        store.flush().unwrap();
    }
    let store = EconomyStore::open(&path).unwrap();
    let rec = store.find_user("42").unwrap().expect("persisted");
    assert_eq!(rec.balance, 1500);
    assert_eq!(rec.animals[&Rarity::Rare]["fox"], 1);
    assert_eq!(rec.total_animals_found, 1);
    assert_eq!(rec.total_gambled, 75);
}

#[test]
fn money_booster_doubles_credits_until_it_lapses() {
    let tmp = tempfile::tempdir().unwrap();
    let store = EconomyStore::open(tmp.path().join("economy")).unwrap();
    let ledger = Ledger::new(&store);

    ledger
        .add_booster("7", BoosterKind::Money, 2.0, Duration::minutes(30))
        .unwrap();
    assert!(ledger.get_active_booster("7", BoosterKind::Money).unwrap().is_some());
    assert_eq!(ledger.credit("7", 100).unwrap(), 1200);

    ledger
        .add_booster("7", BoosterKind::Money, 2.0, Duration::minutes(-1))
        .unwrap();
    assert!(ledger.get_active_booster("7", BoosterKind::Money).unwrap().is_none());
    assert_eq!(ledger.credit("7", 100).unwrap(), 1300);
}

#[test]
fn pinned_ledger_uses_its_own_clock() {
    let tmp = tempfile::tempdir().unwrap();
    let store = EconomyStore::open(tmp.path().join("economy")).unwrap();
    let start = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();

    Ledger::at(&store, start)
        .add_booster("3", BoosterKind::Money, 2.0, Duration::minutes(10))
        .unwrap();
    let during = Ledger::at(&store, start + Duration::minutes(5));
    assert_eq!(during.credit("3", 100).unwrap(), 1200);
    assert_eq!(during.grant("3", 100).unwrap(), 1300);

    let after = Ledger::at(&store, start + Duration::minutes(10));
    assert!(after.get_active_booster("3", BoosterKind::Money).unwrap().is_none());
    assert_eq!(after.credit("3", 100).unwrap(), 1400);
}

#[test]
fn debit_never_goes_below_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let store = EconomyStore::open(tmp.path().join("economy")).unwrap();
    let ledger = Ledger::new(&store);
    assert!(!assert_ok!(ledger.has_balance("9", 5000)));
    let left = assert_ok!(ledger.debit("9", 5000));
    assert_eq!(left, 0);
}

#[test]
fn sparse_import_fills_defaults_and_repairs_level() {
    let tmp = tempfile::tempdir().unwrap();
    let store = EconomyStore::open(tmp.path().join("economy")).unwrap();
    let file = tmp.path().join("legacy.json");
    std::fs::write(
        &file,
        r#"{
  "555": {
    "id": "ignored",
    "balance": 42,
    "level": 1,
    "experience": 250,
    "joinedAt": "2025-01-01T00:00:00Z"
  }
}"#,
    )
    .unwrap();

    assert_eq!(store.import_json(&file).unwrap(), 1);
    let rec = store.get_user("555").unwrap();
    assert_eq!(rec.id, "555");
    assert_eq!(rec.balance, 42);
    assert_eq!(rec.level, 3);
    assert!(rec.animals.is_empty());
    assert!(!rec.daily_claimed);

    let reset = store.reset_user("555").unwrap();
    assert_eq!(reset.balance, 1000);
    assert_eq!(store.get_user("555").unwrap().level, 1);
}
