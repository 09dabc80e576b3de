mod common;

use common::*;
use std::time::{Duration, Instant};

#[tokio::test]
async fn accepted_duel_settles_stakes_and_experience() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;
    let t0 = Instant::now();
    let now = chrono::Utc::now();

    say_at(&mut server, ALICE, &format!("kduel <@{}> 100", BOB), now, t0).await;
    assert!(last_text(&server).contains("challenges"));
    assert_eq!(server.pending_count(), 1);

    react_at(&mut server, BOB, "✅", t0 + Duration::from_secs(5)).await;
    assert_eq!(server.pending_count(), 0);
    assert!(last_text(&server).contains("Winner"));

    let alice = server.store().get_user(ALICE).unwrap();
    let bob = server.store().get_user(BOB).unwrap();
    assert_eq!(alice.balance + bob.balance, 2000);
    let (winner, loser) = if alice.balance > bob.balance {
        (alice, bob)
    } else {
        (bob, alice)
    };
    assert_eq!(winner.balance, 1100);
    assert_eq!(loser.balance, 900);
    assert_eq!(winner.experience, 50);
    assert_eq!(loser.experience, 25);
    assert_eq!(winner.total_won, 100);
    assert_eq!(loser.total_lost, 100);
}

#[tokio::test]
async fn declined_duel_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;

    say(&mut server, ALICE, &format!("kduel <@{}> 100", BOB)).await;
    say(&mut server, BOB, "kdecline").await;
    assert!(last_text(&server).contains("declined"));
    assert_eq!(balance(&server, ALICE), 1000);
    assert_eq!(balance(&server, BOB), 1000);
    assert_eq!(server.pending_count(), 0);
}

#[tokio::test]
async fn unanswered_duel_expires_without_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;
    let t0 = Instant::now();
    let now = chrono::Utc::now();

    say_at(&mut server, ALICE, &format!("kduel <@{}> 100", BOB), now, t0).await;
    let before_alice = server.store().get_user(ALICE).unwrap();
    let before_bob = server.store().get_user(BOB).unwrap();

    server.tick(now, t0 + Duration::from_secs(30)).await.unwrap();
    assert_eq!(server.pending_count(), 1);

    server.tick(now, t0 + Duration::from_secs(61)).await.unwrap();
    assert_eq!(server.pending_count(), 0);
    assert!(last_text(&server).contains("expired"));

    // A late reaction finds nothing pending and produces no new message.
    let sent = server.test_messages().len();
    react_at(&mut server, BOB, "⚔️", t0 + Duration::from_secs(62)).await;
    assert_eq!(server.test_messages().len(), sent);

    let after_alice = server.store().get_user(ALICE).unwrap();
    let after_bob = server.store().get_user(BOB).unwrap();
    assert_eq!(after_alice.balance, before_alice.balance);
    assert_eq!(after_alice.experience, before_alice.experience);
    assert_eq!(after_bob.balance, before_bob.balance);
    assert_eq!(after_bob.experience, before_bob.experience);
}

#[tokio::test]
async fn signal_after_deadline_resolves_as_expiry() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;
    let t0 = Instant::now();
    let now = chrono::Utc::now();

    say_at(&mut server, ALICE, &format!("kduel <@{}> 100", BOB), now, t0).await;
    say_at(&mut server, BOB, "kaccept", now, t0 + Duration::from_secs(90)).await;
    assert!(last_text(&server).contains("expired"));
    assert_eq!(balance(&server, ALICE), 1000);
    assert_eq!(balance(&server, BOB), 1000);
}

#[tokio::test]
async fn duel_rejects_unaffordable_bets_and_busy_users() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;

    say(&mut server, ALICE, &format!("kduel <@{}> 5000", BOB)).await;
    assert!(last_text(&server).starts_with("❌"));
    assert_eq!(server.pending_count(), 0);

    say(&mut server, ALICE, &format!("kduel <@{}>", BOB)).await;
    assert_eq!(server.pending_count(), 1);
    say(&mut server, "300", &format!("kduel <@{}>", BOB)).await;
    assert!(last_text(&server).contains("already has"));
    assert_eq!(server.pending_count(), 1);

    say(&mut server, ALICE, &format!("kduel <@{}>", ALICE)).await;
    assert!(last_text(&server).starts_with("❌"));
}

#[tokio::test]
async fn accept_with_nothing_pending_is_a_user_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut server = test_server(&tmp).await;

    say(&mut server, BOB, "kaccept").await;
    assert!(last_text(&server).contains("nothing pending"));
}
