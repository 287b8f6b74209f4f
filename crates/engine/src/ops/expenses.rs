use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CreateExpenseCmd, Expense, Group, LedgerError, LedgerEvent, LedgerOp, Money,
    RecalculateSplitCmd, ResultLedger, SplitInput, SplitType, split::split_expense,
};

use super::{Ledger, normalize_optional_text, with_tx};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    created_at: DateTime<Utc>,
    expense_id: Uuid,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultLedger<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| LedgerError::InvalidAmount("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultLedger<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| LedgerError::InvalidAmount("invalid expenses cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| LedgerError::InvalidAmount("invalid expenses cursor".to_string()))
    }
}

/// Derives split inputs from the group's member list and default weights
/// when the caller provided none.
fn default_inputs(group: &Group, split_type: SplitType) -> ResultLedger<Vec<SplitInput>> {
    match split_type {
        SplitType::Equal => Ok(group
            .members
            .iter()
            .map(|m| SplitInput::new(&m.user_id))
            .collect()),
        SplitType::Percentage => group
            .members
            .iter()
            .map(|m| {
                let bp = m.default_percent_bp.ok_or_else(|| {
                    LedgerError::InvalidSplit(format!(
                        "no default percentage configured for {}",
                        m.user_id
                    ))
                })?;
                Ok(SplitInput::new(&m.user_id).percent_bp(bp))
            })
            .collect(),
        SplitType::Shares => Ok(group
            .members
            .iter()
            .map(|m| SplitInput::new(&m.user_id).shares(m.default_shares.unwrap_or(1)))
            .collect()),
        SplitType::Exact => Err(LedgerError::InvalidSplit(
            "an exact split requires explicit participant amounts".to_string(),
        )),
    }
}

fn ensure_inputs_are_members(group: &Group, inputs: &[SplitInput]) -> ResultLedger<()> {
    for input in inputs {
        if !group.is_member(&input.user_id) {
            return Err(LedgerError::InvalidMember(format!(
                "{} is not a member of the group",
                input.user_id
            )));
        }
    }
    Ok(())
}

impl Ledger {
    /// Creates an expense and splits it among participants in one step.
    ///
    /// With an idempotency key, retrying the same create returns the
    /// existing expense id instead of recording the cost twice.
    pub async fn create_expense(&self, cmd: CreateExpenseCmd) -> ResultLedger<Uuid> {
        self.authorize(
            LedgerOp::CreateExpense {
                group_id: cmd.group_id,
            },
            &cmd.acting_user,
        )
        .await?;

        let note = normalize_optional_text(cmd.note.as_deref());
        let (expense_id, event) = with_tx!(self, |tx| {
            let group = tx.load_group(cmd.group_id).await?;
            if !group.is_member(&cmd.payer_id) {
                return Err(LedgerError::InvalidMember(format!(
                    "payer {} is not a member of the group",
                    cmd.payer_id
                )));
            }

            let existing = match cmd.idempotency_key.as_deref() {
                Some(key) => tx.find_expense_by_idempotency_key(cmd.group_id, key).await?,
                None => None,
            };
            if let Some(existing) = existing {
                // Same key, same group: hand back the expense already
                // recorded instead of charging the group twice.
                Ok((existing, None))
            } else {
                let split_type = cmd.split_type.unwrap_or(group.default_split);
                let total = Money::new(cmd.total_minor, group.currency);
                let mut expense = Expense::new(
                    cmd.group_id,
                    &cmd.payer_id,
                    total,
                    split_type,
                    cmd.created_at,
                )?;
                expense.note = note.clone();
                expense.idempotency_key = cmd.idempotency_key.clone();

                let inputs = if cmd.inputs.is_empty() {
                    default_inputs(&group, split_type)?
                } else {
                    cmd.inputs.clone()
                };
                ensure_inputs_are_members(&group, &inputs)?;
                expense.participants =
                    split_expense(expense.id, expense.total, split_type, &inputs)?;

                let event = LedgerEvent::ExpenseCreated {
                    group_id: expense.group_id,
                    expense_id: expense.id,
                    payer_id: expense.payer_id.clone(),
                    total: expense.total,
                };
                tx.insert_expense(&expense).await?;
                Ok((expense.id, Some(event)))
            }
        })?;

        if let Some(event) = event {
            self.notify(event);
        }
        Ok(expense_id)
    }

    /// Returns one expense with its participant rows.
    pub async fn expense(&self, expense_id: Uuid, acting_user: &str) -> ResultLedger<Expense> {
        let expense = with_tx!(self, |tx| tx.load_expense(expense_id).await)?;
        self.authorize(
            LedgerOp::ViewGroup {
                group_id: expense.group_id,
            },
            acting_user,
        )
        .await?;
        Ok(expense)
    }

    /// Recomputes an expense's split from a fresh, complete input list.
    ///
    /// Partial incremental edits are not supported: the whole split is
    /// recomputed from the edited inputs to avoid drift. Allowed only while
    /// no participant has paid; afterwards the expense is immutable and a
    /// correction requires deleting and recreating it.
    pub async fn recalculate_split(&self, cmd: RecalculateSplitCmd) -> ResultLedger<()> {
        let current = with_tx!(self, |tx| tx.load_expense(cmd.expense_id).await)?;
        self.authorize(
            LedgerOp::EditExpense {
                group_id: current.group_id,
                expense_id: cmd.expense_id,
            },
            &cmd.acting_user,
        )
        .await?;

        with_tx!(self, |tx| {
            // Re-read inside the transaction: the pre-auth snapshot may be
            // stale by now.
            let mut expense = tx.load_expense(cmd.expense_id).await?;
            if expense.is_locked() {
                return Err(LedgerError::AlreadyPaid(
                    "expense has recorded payments; delete and recreate to correct it"
                        .to_string(),
                ));
            }
            let group = tx.load_group(expense.group_id).await?;

            let split_type = cmd.split_type.unwrap_or(expense.split_type);
            let total = match cmd.total_minor {
                Some(minor) => Money::new(minor, group.currency),
                None => expense.total,
            };
            if !total.is_positive() {
                return Err(LedgerError::InvalidAmount(
                    "expense total must be > 0".to_string(),
                ));
            }
            ensure_inputs_are_members(&group, &cmd.inputs)?;
            let rows = split_expense(expense.id, total, split_type, &cmd.inputs)?;

            expense.total = total;
            expense.split_type = split_type;
            tx.update_expense(&expense).await?;
            tx.replace_participants(expense.id, &rows).await
        })
    }

    /// Deletes an expense. Refused while any share is marked paid: un-settle
    /// those shares first so payment history stays auditable.
    pub async fn delete_expense(&self, expense_id: Uuid, acting_user: &str) -> ResultLedger<()> {
        let current = with_tx!(self, |tx| tx.load_expense(expense_id).await)?;
        self.authorize(
            LedgerOp::EditExpense {
                group_id: current.group_id,
                expense_id,
            },
            acting_user,
        )
        .await?;

        with_tx!(self, |tx| {
            let expense = tx.load_expense(expense_id).await?;
            if expense.participants.iter().any(|row| row.is_paid) {
                return Err(LedgerError::AlreadyPaid(
                    "expense has paid shares; mark them unpaid before deleting".to_string(),
                ));
            }
            tx.delete_expense(expense_id).await
        })
    }

    /// Lists a group's expenses newest-first with opaque cursor pagination.
    pub async fn list_group_expenses(
        &self,
        group_id: Uuid,
        acting_user: &str,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultLedger<(Vec<Expense>, Option<String>)> {
        self.authorize(LedgerOp::ViewGroup { group_id }, acting_user)
            .await?;
        let limit = limit.clamp(1, 200);
        let before = cursor
            .map(ExpensesCursor::decode)
            .transpose()?
            .map(|c| (c.created_at, c.expense_id));

        let mut expenses = with_tx!(self, |tx| {
            tx.load_group_expenses_page(group_id, before, limit + 1).await
        })?;

        let next_cursor = if expenses.len() as u64 > limit {
            expenses.truncate(limit as usize);
            expenses
                .last()
                .map(|e| {
                    ExpensesCursor {
                        created_at: e.created_at,
                        expense_id: e.id,
                    }
                    .encode()
                })
                .transpose()?
        } else {
            None
        };

        Ok((expenses, next_cursor))
    }
}
