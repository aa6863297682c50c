//! End-to-end scans through the reader loop with fake devices.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use common::{at, Harness};
use lockbank_core::association::AssociationPolicy;
use lockbank_core::types::{CardId, LoanStatus, Occupancy};
use lockbank_db::{
    AssociationBroker, FulfillOutcome, IdentityDirectory, LoanLedger, LockerRegistry,
};
use lockbank_reader::ScanOutcome;
use tokio_util::sync::CancellationToken;

async fn register(h: &Harness, card: &str, email: &str) {
    IdentityDirectory::new(h.store.clone())
        .register(&CardId::new(card).unwrap(), email, at(0))
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Loan flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_card_means_no_outcome() {
    let mut h = Harness::new().await;
    let (now, mono) = h.clocks(0);
    assert_eq!(h.reader_loop.step(now, mono).await.unwrap(), None);
}

#[tokio::test]
async fn unknown_card_changes_nothing() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(3).await.unwrap();

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    let outcome = h.reader_loop.step(now, mono).await.unwrap();

    assert_matches!(outcome, Some(ScanOutcome::UnknownIdentity { .. }));
    assert!(LoanLedger::new(h.store.clone()).recent(10).await.unwrap().is_empty());
    assert_eq!(LockerRegistry::new(h.store.clone()).summary().await.unwrap().available, 3);
    assert!(h.actuator.calls().is_empty());
}

#[tokio::test]
async fn loan_then_return_uses_lowest_available_locker() {
    let mut h = Harness::new().await;
    let registry = LockerRegistry::new(h.store.clone());
    registry.provision(5).await.unwrap();
    registry.set_occupancy(1, Occupancy::Empty).await.unwrap();
    registry.set_occupancy(2, Occupancy::Empty).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;

    h.reader.present("X");
    let (now, mono) = h.clocks(1);
    assert_eq!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed {
            email: "a@epitech.eu".to_string(),
            loan_id: 1,
            locker_id: 3,
            unlocked: true,
        })
    );
    assert_eq!(registry.get(3).await.unwrap().unwrap().occupancy, Occupancy::Empty);

    // Same card once the cooldown is over: the item goes back.
    h.reader.present("X");
    let (now, mono) = h.clocks(5);
    assert_eq!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Returned {
            email: "a@epitech.eu".to_string(),
            loan_id: 1,
            locker_id: 3,
            unlocked: true,
        })
    );
    assert_eq!(registry.get(3).await.unwrap().unwrap().occupancy, Occupancy::HoldsItem);

    let loan = LoanLedger::new(h.store.clone()).get(1).await.unwrap().unwrap();
    assert_eq!(loan.status, LoanStatus::Closed);
    assert_eq!((loan.opened_at, loan.closed_at), (at(1), Some(at(5))));
    assert_eq!(h.actuator.calls(), vec![3, 3]);
}

#[tokio::test]
async fn repeat_read_inside_cooldown_is_ignored() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { locker_id: 1, .. })
    );

    h.reader.present("X");
    let (now, mono) = h.clocks(2);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Debounced { .. })
    );

    assert!(LoanLedger::new(h.store.clone()).has_open_loan("a@epitech.eu").await.unwrap());
    assert_eq!(h.actuator.calls(), vec![1]);
}

#[tokio::test]
async fn other_cards_are_not_held_by_the_cooldown() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;
    register(&h, "Z", "c@epitech.eu").await;

    h.reader.present("X");
    h.reader.present("Z");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { locker_id: 1, .. })
    );
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { locker_id: 2, .. })
    );
}

#[tokio::test]
async fn empty_bank_reports_no_locker() {
    let mut h = Harness::new().await;
    let registry = LockerRegistry::new(h.store.clone());
    registry.provision(2).await.unwrap();
    registry.set_occupancy(1, Occupancy::Empty).await.unwrap();
    registry.set_occupancy(2, Occupancy::Empty).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::NoLockerAvailable { .. })
    );
    assert!(!LoanLedger::new(h.store.clone()).has_open_loan("a@epitech.eu").await.unwrap());
    assert!(h.actuator.calls().is_empty());
}

#[tokio::test]
async fn failed_unlock_is_retried_once_and_loan_is_kept() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(1).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;
    h.actuator.fail_next(2);

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { locker_id: 1, unlocked: false, .. })
    );

    assert_eq!(h.actuator.calls(), vec![1, 1]);
    assert!(LoanLedger::new(h.store.clone()).has_open_loan("a@epitech.eu").await.unwrap());
}

#[tokio::test]
async fn unlock_succeeds_on_retry() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(1).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;
    h.actuator.fail_next(1);

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { unlocked: true, .. })
    );
    assert_eq!(h.actuator.calls(), vec![1, 1]);
}

#[tokio::test]
async fn return_to_unknown_locker_is_not_guessed() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;

    let mut conn = h.store.pool().acquire().await.unwrap();
    sqlx_insert_orphan_loan(&mut conn).await;
    drop(conn);

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::LedgerInconsistency { locker_id: 42, .. })
    );
    assert!(h.actuator.calls().is_empty());
    assert_eq!(LockerRegistry::new(h.store.clone()).summary().await.unwrap().available, 2);
}

#[tokio::test]
async fn loan_opened_elsewhere_mid_scan_leaves_lockers_alone() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;

    // Another writer slips an OPEN loan in just before ours is inserted.
    let web = h.other_process().await;
    sqlx::query(
        "CREATE TRIGGER competing_loan BEFORE INSERT ON loans \
         WHEN NEW.email = 'a@epitech.eu' \
          AND NOT EXISTS (SELECT 1 FROM loans WHERE email = NEW.email AND status = 'OPEN') \
         BEGIN \
           INSERT INTO loans (email, locker_id, opened_at, status) \
           VALUES (NEW.email, 2, NEW.opened_at, 'OPEN'); \
         END",
    )
    .execute(web.pool())
    .await
    .unwrap();

    h.reader.present("X");
    let (now, mono) = h.clocks(0);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::AlreadyOpenRace { ref email }) if email == "a@epitech.eu"
    );

    assert!(h.actuator.calls().is_empty());
    let summary = LockerRegistry::new(h.store.clone()).summary().await.unwrap();
    assert_eq!((summary.available, summary.occupied), (2, 0));
}

async fn sqlx_insert_orphan_loan(conn: &mut sqlx::SqliteConnection) {
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await.unwrap();
    sqlx::query(
        "INSERT INTO loans (email, locker_id, opened_at, status) \
         VALUES ('a@epitech.eu', 42, '2025-03-09T09:00:00Z', 'OPEN')",
    )
    .execute(&mut *conn)
    .await
    .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await.unwrap();
}

// ---------------------------------------------------------------------------
// Running loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_keeps_polling_after_a_reader_error_and_stops_on_cancel() {
    let h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "X", "a@epitech.eu").await;
    h.reader.fail_next(1);
    h.reader.present("X");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(h.polling_loop(Duration::from_millis(10)).run(cancel.clone()));

    let ledger = LoanLedger::new(h.store.clone());
    let opened = tokio::time::timeout(Duration::from_secs(5), async {
        while !ledger.has_open_loan("a@epitech.eu").await.unwrap() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(opened.is_ok(), "loan was never opened after the reader error");
    assert_eq!(h.reader.failures_left(), 0);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("reader loop did not stop after cancel")
        .unwrap();
    assert_eq!(h.actuator.calls(), vec![1]);
}

// ---------------------------------------------------------------------------
// Association flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scan_inside_window_fulfils_association() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    let web = AssociationBroker::new(h.other_process().await, AssociationPolicy::default());

    web.request_association("b@epitech.eu", at(0)).await.unwrap();

    h.reader.present("Y");
    let (now, mono) = h.clocks(10);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Association { outcome: FulfillOutcome::Registered, ref email, .. })
            if email == "b@epitech.eu"
    );

    let directory = IdentityDirectory::new(h.store.clone());
    assert_eq!(
        directory.lookup(&CardId::new("Y").unwrap()).await.unwrap().as_deref(),
        Some("b@epitech.eu")
    );
    // Registration does not lend the item.
    assert!(h.actuator.calls().is_empty());
    assert!(!LoanLedger::new(h.store.clone()).has_open_loan("b@epitech.eu").await.unwrap());
}

#[tokio::test]
async fn scan_after_window_falls_through_to_loan_flow() {
    let mut h = Harness::new().await;
    LockerRegistry::new(h.store.clone()).provision(2).await.unwrap();
    register(&h, "Y", "y@epitech.eu").await;
    let web = AssociationBroker::new(h.other_process().await, AssociationPolicy::default());

    web.request_association("b@epitech.eu", at(0)).await.unwrap();

    h.reader.present("Y");
    let (now, mono) = h.clocks(21);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Borrowed { ref email, locker_id: 1, .. }) if email == "y@epitech.eu"
    );

    let directory = IdentityDirectory::new(h.store.clone());
    assert_eq!(directory.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn known_card_cannot_be_associated_again() {
    let mut h = Harness::new().await;
    register(&h, "X", "a@epitech.eu").await;
    let web = AssociationBroker::new(h.other_process().await, AssociationPolicy::default());

    web.request_association("b@epitech.eu", at(0)).await.unwrap();

    h.reader.present("X");
    let (now, mono) = h.clocks(3);
    assert_matches!(
        h.reader_loop.step(now, mono).await.unwrap(),
        Some(ScanOutcome::Association { outcome: FulfillOutcome::AlreadyRegistered, .. })
    );
    assert!(web.poll(at(4)).await.unwrap().is_none());
}
