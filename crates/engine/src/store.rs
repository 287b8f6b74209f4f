//! Collaborator contracts.
//!
//! The engine owns none of its infrastructure: durable storage,
//! authorization, account transfers and notifications are all consumed
//! through the traits below. Implementations live outside this crate; tests
//! ship an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Expense, Group, GroupMember, LedgerError, Money, Participant, Payment};

/// Durable storage for groups, expenses, participants and payments.
///
/// `begin` opens one unit of work; every state-mutating ledger operation
/// runs its reads and writes inside a single unit and commits once, so the
/// balance check and the resulting write are atomic (two racing settlements
/// serialize; the loser re-reads the settled state). Implementations must
/// roll back on drop and bound the transaction's lifetime — an expired or
/// conflicted transaction surfaces as `StoreUnavailable`, which the engine
/// never retries itself.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, LedgerError>;
}

/// One transactional unit of work against the store.
///
/// Dropping an uncommitted unit rolls every write back.
#[async_trait]
pub trait LedgerTx: Send {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    async fn load_group(&mut self, group_id: Uuid) -> Result<Group, LedgerError>;
    async fn insert_group(&mut self, group: &Group) -> Result<(), LedgerError>;
    async fn upsert_member(
        &mut self,
        group_id: Uuid,
        member: &GroupMember,
    ) -> Result<(), LedgerError>;
    async fn remove_member(&mut self, group_id: Uuid, user_id: &str) -> Result<(), LedgerError>;

    async fn load_expense(&mut self, expense_id: Uuid) -> Result<Expense, LedgerError>;
    async fn load_participant(
        &mut self,
        expense_id: Uuid,
        user_id: &str,
    ) -> Result<Participant, LedgerError>;
    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), LedgerError>;
    /// Rewrites an expense's header fields (total, split type, note).
    async fn update_expense(&mut self, expense: &Expense) -> Result<(), LedgerError>;
    /// Replaces the full participant list of an expense (split recomputes
    /// are whole-split, never incremental).
    async fn replace_participants(
        &mut self,
        expense_id: Uuid,
        rows: &[Participant],
    ) -> Result<(), LedgerError>;
    async fn delete_expense(&mut self, expense_id: Uuid) -> Result<(), LedgerError>;
    async fn load_group_expenses(&mut self, group_id: Uuid) -> Result<Vec<Expense>, LedgerError>;
    /// Newest-first page; `before` is the exclusive `(created_at, id)`
    /// position of the previous page's last row.
    async fn load_group_expenses_page(
        &mut self,
        group_id: Uuid,
        before: Option<(DateTime<Utc>, Uuid)>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError>;
    async fn find_expense_by_idempotency_key(
        &mut self,
        group_id: Uuid,
        key: &str,
    ) -> Result<Option<Uuid>, LedgerError>;

    /// Persists a participant row, compare-and-swapping on `is_paid`.
    ///
    /// `expected_paid` is the paid-state the caller read; a mismatch means a
    /// concurrent writer got there first and must surface as
    /// `StoreUnavailable`.
    async fn save_participant(
        &mut self,
        row: &Participant,
        expected_paid: bool,
    ) -> Result<(), LedgerError>;

    async fn append_payment(&mut self, payment: &Payment) -> Result<(), LedgerError>;
    async fn load_payment(&mut self, payment_id: Uuid) -> Result<Payment, LedgerError>;
    /// Rewrites a payment's closed-expense set; used by the un-settle
    /// compensation path, never to delete history.
    async fn update_payment_closed_set(
        &mut self,
        payment_id: Uuid,
        closed_expense_ids: &[Uuid],
        amended: bool,
    ) -> Result<(), LedgerError>;
}

/// A ledger operation submitted for authorization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerOp {
    ViewGroup { group_id: Uuid },
    ManageMembers { group_id: Uuid },
    CreateExpense { group_id: Uuid },
    EditExpense { group_id: Uuid, expense_id: Uuid },
    MarkPaid { expense_id: Uuid, debtor_id: String },
    MarkUnpaid { expense_id: Uuid },
    SettleAll { group_id: Uuid },
}

/// Decides whether an acting user may perform an operation.
///
/// The engine calls this before every mutation and never decides
/// authorization itself; a deny becomes `NotAuthorized`.
#[async_trait]
pub trait AuthorizationCheck: Send + Sync {
    async fn allow(&self, op: &LedgerOp, acting_user: &str) -> Result<bool, LedgerError>;
}

/// A requested money movement between real accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Money,
}

/// Failure reported by the account-transfer collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferFailure(pub String);

/// Optional collaborator that moves real money alongside a settlement.
///
/// The ledger state change and the transfer succeed or fail as one unit:
/// the engine requests the transfer inside the settlement operation and
/// issues `reverse` as a compensating action when the ledger commit fails
/// afterwards.
#[async_trait]
pub trait AccountTransferService: Send + Sync {
    async fn transfer(&self, request: TransferRequest) -> Result<Uuid, TransferFailure>;
    async fn reverse(&self, transfer_id: Uuid) -> Result<(), TransferFailure>;
}

/// Events emitted after a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    ExpenseCreated {
        group_id: Uuid,
        expense_id: Uuid,
        payer_id: String,
        total: Money,
    },
    ParticipantPaid {
        expense_id: Uuid,
        user_id: String,
        payment_id: Uuid,
    },
    ParticipantUnpaid {
        expense_id: Uuid,
        user_id: String,
    },
    PairSettled {
        group_id: Uuid,
        from_user_id: String,
        to_user_id: String,
        amount: Money,
        payment_id: Uuid,
    },
}

/// Fire-and-forget event sink: called only after a successful commit, never
/// awaited for correctness. Implementations that need to do real I/O should
/// hand the event off to a background task.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LedgerEvent);
}
