use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Money;

/// A recorded settlement event between two members.
///
/// Payments are append-only history. One settlement may close several
/// participant rows at once; `closed_expense_ids` lists every expense it
/// touched. Undoing part of a settlement never deletes the payment — the
/// affected expense is removed from the closed set and the payment is
/// flagged `amended` so the audit trail stays intact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub group_id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    /// The net amount that actually moved, not the gross sum of closed rows.
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub closed_expense_ids: Vec<Uuid>,
    /// Reference returned by the account-transfer collaborator, when one was
    /// requested alongside this settlement.
    pub linked_transfer_id: Option<Uuid>,
    /// Set when a later un-settle removed an expense from the closed set.
    pub amended: bool,
}

impl Payment {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        amount: Money,
        closed_expense_ids: Vec<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            amount,
            created_at,
            closed_expense_ids,
            linked_transfer_id: None,
            amended: false,
        }
    }
}
