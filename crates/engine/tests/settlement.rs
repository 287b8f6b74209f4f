use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use uuid::Uuid;

use engine::{
    CreateExpenseCmd, CreateGroupCmd, Currency, GroupMember, Ledger, LedgerError, LedgerEvent,
    MarkPaidCmd, SettleAllCmd, SplitInput, SplitType, TransferAccounts,
};

mod support;

use support::{AllowAll, DenyAll, MemStore, RecordingNotifier, RecordingTransfers};

struct Harness {
    ledger: Ledger,
    store: MemStore,
    transfers: Arc<RecordingTransfers>,
    notifier: Arc<RecordingNotifier>,
}

fn harness() -> Harness {
    let store = MemStore::default();
    let transfers = Arc::new(RecordingTransfers::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let ledger = Ledger::builder(Arc::new(store.clone()), Arc::new(AllowAll))
        .transfers(Arc::clone(&transfers) as Arc<dyn engine::AccountTransferService>)
        .notifier(Arc::clone(&notifier) as Arc<dyn engine::Notifier>)
        .build();
    Harness {
        ledger,
        store,
        transfers,
        notifier,
    }
}

async fn trip_group(ledger: &Ledger) -> Uuid {
    ledger
        .create_group(
            CreateGroupCmd::new("Trip", "alice", Utc::now())
                .currency(Currency::Eur)
                .member("bob")
                .member("carol"),
        )
        .await
        .unwrap()
}

/// A pays 90.00 split equally among A, B, C.
async fn ninety_equal(ledger: &Ledger, group_id: Uuid) -> Uuid {
    ledger
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap()
}

fn accounts() -> TransferAccounts {
    TransferAccounts {
        from_account_id: Uuid::new_v4(),
        to_account_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn equal_split_then_settle_updates_pair_balances() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    // Each member owes 30.00; Alice's own row is informational.
    let balances = h.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 3000);
    assert_eq!(balances.net_between("alice", "carol").minor(), 3000);

    let payment = h
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap();

    assert_eq!(payment.from_user_id, "bob");
    assert_eq!(payment.to_user_id, "alice");
    assert_eq!(payment.amount.minor(), 3000);
    assert_eq!(payment.closed_expense_ids, vec![expense_id]);

    let balances = h.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 0);
    assert_eq!(balances.net_between("alice", "carol").minor(), 3000);
}

#[tokio::test]
async fn settle_all_twice_changes_state_once() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap();

    let err = h
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NothingToSettle(_)));
    assert_eq!(h.store.payments().len(), 1);
}

#[tokio::test]
async fn settle_all_moves_the_net_and_closes_both_directions() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;

    // Bob owes Alice 50.00; Alice owes Bob 30.00 back.
    h.ledger
        .create_expense(
            CreateExpenseCmd::new(group_id, "alice", 10_000, "alice", Utc::now())
                .input(SplitInput::new("alice"))
                .input(SplitInput::new("bob")),
        )
        .await
        .unwrap();
    h.ledger
        .create_expense(
            CreateExpenseCmd::new(group_id, "bob", 6000, "bob", Utc::now())
                .input(SplitInput::new("alice"))
                .input(SplitInput::new("bob")),
        )
        .await
        .unwrap();

    let payment = h
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "alice", "bob", "bob", Utc::now()))
        .await
        .unwrap();

    // Only the 20.00 net moves, but both open rows close.
    assert_eq!(payment.from_user_id, "bob");
    assert_eq!(payment.to_user_id, "alice");
    assert_eq!(payment.amount.minor(), 2000);
    assert_eq!(payment.closed_expense_ids.len(), 2);

    let balances = h.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 0);
}

#[tokio::test]
async fn settle_all_with_zero_balance_is_nothing_to_settle() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;

    let err = h
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NothingToSettle(_)));
}

#[tokio::test]
async fn mark_paid_flips_one_row_and_records_a_payment() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    let payment_id = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();

    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    let bob = expense.participant("bob").unwrap();
    assert!(bob.is_paid);
    assert_eq!(bob.linked_payment_id, Some(payment_id));
    assert!(bob.paid_at.is_some());

    let carol = expense.participant("carol").unwrap();
    assert!(!carol.is_paid);

    let payments = h.store.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount.minor(), 3000);
    assert_eq!(payments[0].closed_expense_ids, vec![expense_id]);
}

#[tokio::test]
async fn mark_paid_twice_is_already_paid() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();
    let err = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyPaid(_)));
}

#[tokio::test]
async fn payer_cannot_owe_themselves() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    let err = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "alice", "alice", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NothingToSettle(_)));
}

#[tokio::test]
async fn unknown_participant_is_not_found() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    let err = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "mallory", "alice", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn unsettle_compensates_without_deleting_history() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    let payment_id = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();

    // Only the payer can revert.
    let err = h
        .ledger
        .mark_participant_unpaid(expense_id, "bob", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotAuthorized(_)));

    h.ledger
        .mark_participant_unpaid(expense_id, "bob", "alice")
        .await
        .unwrap();

    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    let bob = expense.participant("bob").unwrap();
    assert!(!bob.is_paid);
    assert_eq!(bob.linked_payment_id, None);

    // The payment survives, amended and with the expense removed from its
    // closed set.
    let payments = h.store.payments();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].id, payment_id);
    assert!(payments[0].amended);
    assert!(payments[0].closed_expense_ids.is_empty());

    // The debt is live again.
    let balances = h.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 3000);
}

#[tokio::test]
async fn unsettle_of_unpaid_row_is_not_paid() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    let err = h
        .ledger
        .mark_participant_unpaid(expense_id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotPaid(_)));
}

#[tokio::test]
async fn failing_linked_transfer_leaves_the_ledger_untouched() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.transfers.fail_next.store(true, Ordering::SeqCst);
    let err = h
        .ledger
        .mark_participant_paid(
            MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()).accounts(accounts()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::LinkedTransferFailed(_)));

    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    assert!(!expense.participant("bob").unwrap().is_paid);
    assert!(h.store.payments().is_empty());
}

#[tokio::test]
async fn commit_failure_reverses_the_linked_transfer() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.store.fail_next_commit();
    let err = h
        .ledger
        .mark_participant_paid(
            MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()).accounts(accounts()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::StoreUnavailable(_)));

    // The money movement went out before the commit failed; the
    // compensating reversal must have been issued for it.
    let requested = h.transfers.requested.lock().unwrap();
    let reversed = h.transfers.reversed.lock().unwrap();
    assert_eq!(requested.len(), 1);
    assert_eq!(reversed.as_slice(), &[requested[0].1]);

    // And the ledger rolled back.
    drop((requested, reversed));
    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    assert!(!expense.participant("bob").unwrap().is_paid);
    assert!(h.store.payments().is_empty());
}

#[tokio::test]
async fn transfer_without_configured_service_fails() {
    let store = MemStore::default();
    let ledger = Ledger::builder(Arc::new(store.clone()), Arc::new(AllowAll)).build();
    let group_id = trip_group(&ledger).await;
    let expense_id = ninety_equal(&ledger, group_id).await;

    let err = ledger
        .mark_participant_paid(
            MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()).accounts(accounts()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::LinkedTransferFailed(_)));
}

#[tokio::test]
async fn idempotency_key_returns_the_existing_expense() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;

    let make = || {
        CreateExpenseCmd::new(group_id, "alice", 9000, "alice", Utc::now())
            .idempotency_key("receipt-42")
    };
    let first = h.ledger.create_expense(make()).await.unwrap();
    let second = h.ledger.create_expense(make()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.store.expense_count(), 1);
}

#[tokio::test]
async fn recalculating_a_locked_expense_is_rejected() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();

    let err = h
        .ledger
        .recalculate_split(engine::RecalculateSplitCmd {
            expense_id,
            total_minor: Some(12_000),
            split_type: None,
            inputs: vec![
                SplitInput::new("alice"),
                SplitInput::new("bob"),
                SplitInput::new("carol"),
            ],
            acting_user: "alice".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyPaid(_)));
}

#[tokio::test]
async fn recalculation_replaces_the_whole_split() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .recalculate_split(engine::RecalculateSplitCmd {
            expense_id,
            total_minor: None,
            split_type: Some(SplitType::Shares),
            inputs: vec![
                SplitInput::new("alice").shares(1),
                SplitInput::new("bob").shares(2),
            ],
            acting_user: "alice".to_string(),
        })
        .await
        .unwrap();

    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    assert_eq!(expense.split_type, SplitType::Shares);
    assert_eq!(expense.participants.len(), 2);
    assert_eq!(expense.participant("bob").unwrap().amount_owed.minor(), 6000);
    assert!(expense.participant("carol").is_none());
}

#[tokio::test]
async fn deleting_an_expense_with_paid_shares_is_rejected() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();

    let err = h
        .ledger
        .delete_expense(expense_id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyPaid(_)));

    // After un-settling, deletion goes through.
    h.ledger
        .mark_participant_unpaid(expense_id, "bob", "alice")
        .await
        .unwrap();
    h.ledger.delete_expense(expense_id, "alice").await.unwrap();
    assert_eq!(h.store.expense_count(), 0);
}

#[tokio::test]
async fn member_with_open_balances_cannot_be_removed() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    ninety_equal(&h.ledger, group_id).await;

    let err = h
        .ledger
        .remove_member(group_id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMember(_)));

    h.ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap();
    h.ledger.remove_member(group_id, "bob", "alice").await.unwrap();

    let group = h.ledger.group(group_id, "alice").await.unwrap();
    assert!(!group.is_member("bob"));
}

#[tokio::test]
async fn denied_caller_gets_not_authorized() {
    let store = MemStore::default();
    let open = Ledger::builder(Arc::new(store.clone()), Arc::new(AllowAll)).build();
    let group_id = trip_group(&open).await;

    let closed = Ledger::builder(Arc::new(store), Arc::new(DenyAll)).build();
    let err = closed
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotAuthorized(_)));
}

#[tokio::test]
async fn notifier_sees_commits_but_not_rollbacks() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;
    let expense_id = ninety_equal(&h.ledger, group_id).await;

    h.ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();
    let _ = h
        .ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap_err();

    let events = h.notifier.events.lock().unwrap();
    let paid_events = events
        .iter()
        .filter(|e| matches!(e, LedgerEvent::ParticipantPaid { .. }))
        .count();
    assert_eq!(paid_events, 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, LedgerEvent::ExpenseCreated { .. }))
    );
}

#[tokio::test]
async fn expense_listing_paginates_newest_first() {
    let h = harness();
    let group_id = trip_group(&h.ledger).await;

    let base = Utc::now();
    let mut ids = Vec::new();
    for offset in 0..3i64 {
        let id = h
            .ledger
            .create_expense(CreateExpenseCmd::new(
                group_id,
                "alice",
                1000 + offset,
                "alice",
                base + Duration::seconds(offset),
            ))
            .await
            .unwrap();
        ids.push(id);
    }

    let (page, cursor) = h
        .ledger
        .list_group_expenses(group_id, "alice", 2, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, ids[2]);
    assert_eq!(page[1].id, ids[1]);
    let cursor = cursor.expect("a third expense remains");

    let (rest, done) = h
        .ledger
        .list_group_expenses(group_id, "alice", 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, ids[0]);
    assert!(done.is_none());
}

#[tokio::test]
async fn group_default_percentages_drive_the_default_split() {
    let h = harness();
    let group_id = h
        .ledger
        .create_group(
            CreateGroupCmd::new("Flat", "alice", Utc::now())
                .default_split(SplitType::Percentage)
                .member("bob"),
        )
        .await
        .unwrap();

    // Percentage defaults must exist for every member before an input-less
    // create can work.
    let err = h
        .ledger
        .create_expense(CreateExpenseCmd::new(group_id, "alice", 10_000, "alice", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSplit(_)));

    for (user, bp) in [("alice", 6000), ("bob", 4000)] {
        let mut member = GroupMember::new(user);
        member.default_percent_bp = Some(bp);
        h.ledger.upsert_member(group_id, member, "alice").await.unwrap();
    }

    let expense_id = h
        .ledger
        .create_expense(CreateExpenseCmd::new(group_id, "alice", 10_000, "alice", Utc::now()))
        .await
        .unwrap();
    let expense = h.ledger.expense(expense_id, "alice").await.unwrap();
    assert_eq!(expense.participant("alice").unwrap().amount_owed.minor(), 6000);
    assert_eq!(expense.participant("bob").unwrap().amount_owed.minor(), 4000);
}
