//! In-memory collaborators for exercising the engine end-to-end.
//!
//! `MemStore` keeps the whole ledger in one mutex-guarded state value.
//! `begin` clones it; writes land on the clone and `commit` swaps it back,
//! so a dropped transaction really does roll back.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use engine::{
    AccountTransferService, AuthorizationCheck, Expense, Group, GroupMember, LedgerError,
    LedgerEvent, LedgerOp, LedgerStore, LedgerTx, Notifier, Participant, Payment,
    TransferFailure, TransferRequest,
};

#[derive(Clone, Default)]
pub struct MemState {
    pub groups: HashMap<Uuid, Group>,
    pub expenses: HashMap<Uuid, Expense>,
    pub payments: HashMap<Uuid, Payment>,
}

#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemStore {
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn payments(&self) -> Vec<Payment> {
        let mut payments: Vec<Payment> = lock(&self.state).payments.values().cloned().collect();
        payments.sort_by_key(|p| p.created_at);
        payments
    }

    pub fn expense_count(&self) -> usize {
        lock(&self.state).expenses.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct MemTx {
    shared: Arc<Mutex<MemState>>,
    work: MemState,
    fail_commit: Arc<AtomicBool>,
}

#[async_trait]
impl LedgerStore for MemStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, LedgerError> {
        let work = lock(&self.state).clone();
        Ok(Box::new(MemTx {
            shared: Arc::clone(&self.state),
            work,
            fail_commit: Arc::clone(&self.fail_next_commit),
        }))
    }
}

fn not_found(what: impl Into<String>) -> LedgerError {
    LedgerError::NotFound(what.into())
}

#[async_trait]
impl LedgerTx for MemTx {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::StoreUnavailable(
                "injected commit failure".to_string(),
            ));
        }
        *lock(&self.shared) = self.work;
        Ok(())
    }

    async fn load_group(&mut self, group_id: Uuid) -> Result<Group, LedgerError> {
        self.work
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| not_found(format!("group {group_id}")))
    }

    async fn insert_group(&mut self, group: &Group) -> Result<(), LedgerError> {
        self.work.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn upsert_member(
        &mut self,
        group_id: Uuid,
        member: &GroupMember,
    ) -> Result<(), LedgerError> {
        let group = self
            .work
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| not_found(format!("group {group_id}")))?;
        match group.members.iter_mut().find(|m| m.user_id == member.user_id) {
            Some(existing) => *existing = member.clone(),
            None => group.members.push(member.clone()),
        }
        Ok(())
    }

    async fn remove_member(&mut self, group_id: Uuid, user_id: &str) -> Result<(), LedgerError> {
        let group = self
            .work
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| not_found(format!("group {group_id}")))?;
        group.members.retain(|m| m.user_id != user_id);
        Ok(())
    }

    async fn load_expense(&mut self, expense_id: Uuid) -> Result<Expense, LedgerError> {
        self.work
            .expenses
            .get(&expense_id)
            .cloned()
            .ok_or_else(|| not_found(format!("expense {expense_id}")))
    }

    async fn load_participant(
        &mut self,
        expense_id: Uuid,
        user_id: &str,
    ) -> Result<Participant, LedgerError> {
        let expense = self.load_expense(expense_id).await?;
        expense
            .participant(user_id)
            .cloned()
            .ok_or_else(|| not_found(format!("participant {user_id}")))
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), LedgerError> {
        self.work.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn update_expense(&mut self, expense: &Expense) -> Result<(), LedgerError> {
        let stored = self
            .work
            .expenses
            .get_mut(&expense.id)
            .ok_or_else(|| not_found(format!("expense {}", expense.id)))?;
        stored.total = expense.total;
        stored.split_type = expense.split_type;
        stored.note = expense.note.clone();
        Ok(())
    }

    async fn replace_participants(
        &mut self,
        expense_id: Uuid,
        rows: &[Participant],
    ) -> Result<(), LedgerError> {
        let stored = self
            .work
            .expenses
            .get_mut(&expense_id)
            .ok_or_else(|| not_found(format!("expense {expense_id}")))?;
        stored.participants = rows.to_vec();
        Ok(())
    }

    async fn delete_expense(&mut self, expense_id: Uuid) -> Result<(), LedgerError> {
        self.work
            .expenses
            .remove(&expense_id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("expense {expense_id}")))
    }

    async fn load_group_expenses(&mut self, group_id: Uuid) -> Result<Vec<Expense>, LedgerError> {
        let mut expenses: Vec<Expense> = self
            .work
            .expenses
            .values()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect();
        expenses.sort_by_key(|e| (e.created_at, e.id));
        Ok(expenses)
    }

    async fn load_group_expenses_page(
        &mut self,
        group_id: Uuid,
        before: Option<(DateTime<Utc>, Uuid)>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError> {
        let mut expenses = self.load_group_expenses(group_id).await?;
        expenses.reverse();
        if let Some((created_at, expense_id)) = before {
            expenses.retain(|e| (e.created_at, e.id) < (created_at, expense_id));
        }
        expenses.truncate(limit as usize);
        Ok(expenses)
    }

    async fn find_expense_by_idempotency_key(
        &mut self,
        group_id: Uuid,
        key: &str,
    ) -> Result<Option<Uuid>, LedgerError> {
        Ok(self
            .work
            .expenses
            .values()
            .find(|e| e.group_id == group_id && e.idempotency_key.as_deref() == Some(key))
            .map(|e| e.id))
    }

    async fn save_participant(
        &mut self,
        row: &Participant,
        expected_paid: bool,
    ) -> Result<(), LedgerError> {
        let expense = self
            .work
            .expenses
            .get_mut(&row.expense_id)
            .ok_or_else(|| not_found(format!("expense {}", row.expense_id)))?;
        let stored = expense
            .participants
            .iter_mut()
            .find(|p| p.user_id == row.user_id)
            .ok_or_else(|| not_found(format!("participant {}", row.user_id)))?;
        if stored.is_paid != expected_paid {
            return Err(LedgerError::StoreUnavailable(
                "paid-state conflict".to_string(),
            ));
        }
        *stored = row.clone();
        Ok(())
    }

    async fn append_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        self.work.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn load_payment(&mut self, payment_id: Uuid) -> Result<Payment, LedgerError> {
        self.work
            .payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| not_found(format!("payment {payment_id}")))
    }

    async fn update_payment_closed_set(
        &mut self,
        payment_id: Uuid,
        closed_expense_ids: &[Uuid],
        amended: bool,
    ) -> Result<(), LedgerError> {
        let payment = self
            .work
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| not_found(format!("payment {payment_id}")))?;
        payment.closed_expense_ids = closed_expense_ids.to_vec();
        payment.amended = amended;
        Ok(())
    }
}

/// Authorization stub that allows everything.
pub struct AllowAll;

#[async_trait]
impl AuthorizationCheck for AllowAll {
    async fn allow(&self, _op: &LedgerOp, _acting_user: &str) -> Result<bool, LedgerError> {
        Ok(true)
    }
}

/// Authorization stub that denies everything.
pub struct DenyAll;

#[async_trait]
impl AuthorizationCheck for DenyAll {
    async fn allow(&self, _op: &LedgerOp, _acting_user: &str) -> Result<bool, LedgerError> {
        Ok(false)
    }
}

/// Transfer collaborator that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingTransfers {
    pub fail_next: AtomicBool,
    pub requested: Mutex<Vec<(TransferRequest, Uuid)>>,
    pub reversed: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl AccountTransferService for RecordingTransfers {
    async fn transfer(&self, request: TransferRequest) -> Result<Uuid, TransferFailure> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransferFailure("account service rejected".to_string()));
        }
        let transfer_id = Uuid::new_v4();
        lock(&self.requested).push((request, transfer_id));
        Ok(transfer_id)
    }

    async fn reverse(&self, transfer_id: Uuid) -> Result<(), TransferFailure> {
        lock(&self.reversed).push(transfer_id);
        Ok(())
    }
}

/// Notifier that records every event.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<LedgerEvent>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &LedgerEvent) {
        lock(&self.events).push(event.clone());
    }
}
