//! End-to-end coverage of the sea-orm store through the engine's public
//! operations, against a real SQLite database with the real migrations.
//!
//! A file-backed database is used instead of `sqlite::memory:` because the
//! authorization collaborator reads through its own pooled connection, and
//! every pooled connection must see the same database.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    CreateExpenseCmd, CreateGroupCmd, Currency, Ledger, LedgerError, MarkPaidCmd, SettleAllCmd,
    SplitInput, SplitType,
};
use migration::MigratorTrait;
use store::{MembershipAuth, SqlStore};

struct TestDb {
    ledger: Ledger,
    db: DatabaseConnection,
    path: std::path::PathBuf,
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn ledger_with_db() -> TestDb {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("store_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    // The settlement operations hold a store transaction open on one pooled
    // connection while the authorization collaborator reads through its own
    // pooled connection (see the module docs). That requires a pool of more
    // than one connection; sea-orm otherwise defaults SQLite to a single
    // connection, which would deadlock on connection acquisition.
    let mut opts = ConnectOptions::new(&url);
    opts.max_connections(5);
    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let backend = db.get_database_backend();
    for user in ["alice", "bob", "carol"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![user.into(), "password".into()],
        ))
        .await
        .unwrap();
    }

    let ledger = Ledger::builder(
        Arc::new(SqlStore::new(db.clone())),
        Arc::new(MembershipAuth::new(db.clone())),
    )
    .build();

    TestDb { ledger, db, path }
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

#[tokio::test]
async fn group_round_trips_with_member_order() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let group = t.ledger.group(group_id, "alice").await.unwrap();
    assert_eq!(group.name, "Trip");
    assert_eq!(group.owner_id, "alice");
    assert_eq!(group.currency, Currency::Eur);
    let order: Vec<&str> = group.members.iter().map(|m| m.user_id.as_str()).collect();
    assert_eq!(order, vec!["alice", "bob", "carol"]);
}

#[tokio::test]
async fn non_member_is_denied() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let err = t.ledger.group(group_id, "mallory").await.unwrap_err();
    assert!(matches!(err, LedgerError::NotAuthorized(_)));
}

#[tokio::test]
async fn only_the_owner_manages_members() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let err = t
        .ledger
        .remove_member(group_id, "carol", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotAuthorized(_)));

    t.ledger
        .remove_member(group_id, "carol", "alice")
        .await
        .unwrap();
    let group = t.ledger.group(group_id, "alice").await.unwrap();
    assert!(!group.is_member("carol"));
}

#[tokio::test]
async fn expense_split_persists_and_sums_exactly() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let expense_id = t
        .ledger
        .create_expense(
            CreateExpenseCmd::new(group_id, "alice", 10_000, "alice", Utc::now())
                .split_type(SplitType::Percentage)
                .input(SplitInput::new("alice").percent_bp(5000))
                .input(SplitInput::new("bob").percent_bp(3000))
                .input(SplitInput::new("carol").percent_bp(2000))
                .note("hotel"),
        )
        .await
        .unwrap();

    let expense = t.ledger.expense(expense_id, "bob").await.unwrap();
    assert_eq!(expense.note.as_deref(), Some("hotel"));
    assert_eq!(expense.split_type, SplitType::Percentage);
    let sum: i64 = expense
        .participants
        .iter()
        .map(|p| p.amount_owed.minor())
        .sum();
    assert_eq!(sum, 10_000);
    // Inputs are retained for re-display.
    assert_eq!(expense.participant("bob").unwrap().percent_bp, Some(3000));
}

#[tokio::test]
async fn settle_all_end_to_end() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let expense_id = t
        .ledger
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap();

    let payment = t
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap();
    assert_eq!(payment.amount.minor(), 3000);
    assert_eq!(payment.closed_expense_ids, vec![expense_id]);

    // Second settle observes the committed state.
    let err = t
        .ledger
        .settle_all(SettleAllCmd::new(group_id, "bob", "alice", "bob", Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NothingToSettle(_)));

    let balances = t.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 0);
    assert_eq!(balances.net_between("alice", "carol").minor(), 3000);
}

#[tokio::test]
async fn unsettle_amends_the_payment_row() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let expense_id = t
        .ledger
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap();

    t.ledger
        .mark_participant_paid(MarkPaidCmd::new(expense_id, "bob", "bob", Utc::now()))
        .await
        .unwrap();
    t.ledger
        .mark_participant_unpaid(expense_id, "bob", "alice")
        .await
        .unwrap();

    // The payment row survives in the database, amended, with an empty
    // closed set.
    let backend = t.db.get_database_backend();
    let row = t
        .db
        .query_one(Statement::from_string(
            backend,
            "SELECT amended, (SELECT COUNT(*) FROM payment_expenses) AS closed FROM payments",
        ))
        .await
        .unwrap()
        .unwrap();
    let amended: bool = row.try_get("", "amended").unwrap();
    let closed: i64 = row.try_get("", "closed").unwrap();
    assert!(amended);
    assert_eq!(closed, 0);

    let balances = t.ledger.group_balances(group_id, "alice").await.unwrap();
    assert_eq!(balances.net_between("alice", "bob").minor(), 3000);
}

#[tokio::test]
async fn idempotency_key_survives_storage() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let make = || {
        CreateExpenseCmd::new(group_id, "alice", 4200, "alice", Utc::now())
            .idempotency_key("receipt-7")
    };
    let first = t.ledger.create_expense(make()).await.unwrap();
    let second = t.ledger.create_expense(make()).await.unwrap();
    assert_eq!(first, second);

    let (page, _) = t
        .ledger
        .list_group_expenses(group_id, "alice", 10, None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn recalculated_split_replaces_rows_in_storage() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    let expense_id = t
        .ledger
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap();

    t.ledger
        .recalculate_split(engine::RecalculateSplitCmd {
            expense_id,
            total_minor: Some(8000),
            split_type: Some(SplitType::Exact),
            inputs: vec![
                SplitInput::new("alice").exact_minor(5000),
                SplitInput::new("bob").exact_minor(3000),
            ],
            acting_user: "alice".to_string(),
        })
        .await
        .unwrap();

    let expense = t.ledger.expense(expense_id, "alice").await.unwrap();
    assert_eq!(expense.total.minor(), 8000);
    assert_eq!(expense.participants.len(), 2);
    assert_eq!(expense.participant("bob").unwrap().amount_owed.minor(), 3000);
}

#[tokio::test]
async fn paid_state_cas_mismatch_is_store_unavailable() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;
    let expense_id = t
        .ledger
        .create_expense(CreateExpenseCmd::new(
            group_id, "alice", 9000, "alice",
            Utc::now(),
        ))
        .await
        .unwrap();

    use engine::LedgerStore;
    let store = SqlStore::new(t.db.clone());
    let mut tx = store.begin().await.unwrap();
    let mut row = tx.load_participant(expense_id, "bob").await.unwrap();
    assert!(!row.is_paid);

    // The row is unpaid; a writer claiming it was already paid lost the
    // race and must not write.
    row.is_paid = true;
    let err = tx.save_participant(&row, true).await.unwrap_err();
    assert!(matches!(err, LedgerError::StoreUnavailable(_)));
}

#[tokio::test]
async fn simplified_debts_read_from_storage() {
    let t = ledger_with_db().await;
    let group_id = trip_group(&t.ledger).await;

    // Alice fronts 90.00 for everyone, Bob fronts 30.00 for everyone.
    for (payer, total) in [("alice", 9000), ("bob", 3000)] {
        t.ledger
            .create_expense(CreateExpenseCmd::new(group_id, payer, total, payer, Utc::now()))
            .await
            .unwrap();
    }

    let plan = t.ledger.simplified_debts(group_id, "carol").await.unwrap();
    // Nets: alice +5000, bob -1000, carol -4000 → carol pays 4000 and bob
    // pays 1000, both straight to alice.
    assert_eq!(plan.len(), 2);
    let total_moved: i64 = plan.iter().map(|tr| tr.amount.minor()).sum();
    assert_eq!(total_moved, 5000);
    assert!(plan.iter().all(|tr| tr.to_user_id == "alice"));
}
