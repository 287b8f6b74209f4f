//! Command structs for ledger operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Currency, SplitInput, SplitType};

/// Source and destination accounts for an optional linked money movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferAccounts {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
}

/// Create a group.
#[derive(Clone, Debug)]
pub struct CreateGroupCmd {
    pub name: String,
    pub currency: Currency,
    pub default_split: SplitType,
    /// Additional members beyond the owner, in join order.
    pub members: Vec<String>,
    pub acting_user: String,
    pub created_at: DateTime<Utc>,
}

impl CreateGroupCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        acting_user: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            currency: Currency::default(),
            default_split: SplitType::Equal,
            members: Vec::new(),
            acting_user: acting_user.into(),
            created_at,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn default_split(mut self, default_split: SplitType) -> Self {
        self.default_split = default_split;
        self
    }

    #[must_use]
    pub fn member(mut self, user_id: impl Into<String>) -> Self {
        self.members.push(user_id.into());
        self
    }
}

/// Create an expense and split it in one step.
#[derive(Clone, Debug)]
pub struct CreateExpenseCmd {
    pub group_id: Uuid,
    pub payer_id: String,
    pub total_minor: i64,
    /// Defaults to the group's default split type.
    pub split_type: Option<SplitType>,
    /// Defaults to one equal-weight input per group member.
    pub inputs: Vec<SplitInput>,
    pub note: Option<String>,
    /// Optional idempotency key for safely retrying the same create request.
    pub idempotency_key: Option<String>,
    pub acting_user: String,
    pub created_at: DateTime<Utc>,
}

impl CreateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        payer_id: impl Into<String>,
        total_minor: i64,
        acting_user: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            payer_id: payer_id.into(),
            total_minor,
            split_type: None,
            inputs: Vec::new(),
            note: None,
            idempotency_key: None,
            acting_user: acting_user.into(),
            created_at,
        }
    }

    #[must_use]
    pub fn split_type(mut self, split_type: SplitType) -> Self {
        self.split_type = Some(split_type);
        self
    }

    #[must_use]
    pub fn input(mut self, input: SplitInput) -> Self {
        self.inputs.push(input);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Recompute an expense's split from a fresh set of inputs.
#[derive(Clone, Debug)]
pub struct RecalculateSplitCmd {
    pub expense_id: Uuid,
    /// New total in minor units; `None` keeps the current one.
    pub total_minor: Option<i64>,
    /// New split type; `None` keeps the current one.
    pub split_type: Option<SplitType>,
    pub inputs: Vec<SplitInput>,
    pub acting_user: String,
}

/// Mark one participant row paid.
#[derive(Clone, Debug)]
pub struct MarkPaidCmd {
    pub expense_id: Uuid,
    pub user_id: String,
    pub acting_user: String,
    /// When set, a linked account transfer is requested as part of the same
    /// settlement.
    pub accounts: Option<TransferAccounts>,
    pub at: DateTime<Utc>,
}

impl MarkPaidCmd {
    #[must_use]
    pub fn new(
        expense_id: Uuid,
        user_id: impl Into<String>,
        acting_user: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            acting_user: acting_user.into(),
            accounts: None,
            at,
        }
    }

    #[must_use]
    pub fn accounts(mut self, accounts: TransferAccounts) -> Self {
        self.accounts = Some(accounts);
        self
    }
}

/// Settle the whole net position between two members.
#[derive(Clone, Debug)]
pub struct SettleAllCmd {
    pub group_id: Uuid,
    pub user_a: String,
    pub user_b: String,
    pub acting_user: String,
    pub accounts: Option<TransferAccounts>,
    pub at: DateTime<Utc>,
}

impl SettleAllCmd {
    #[must_use]
    pub fn new(
        group_id: Uuid,
        user_a: impl Into<String>,
        user_b: impl Into<String>,
        acting_user: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            user_a: user_a.into(),
            user_b: user_b.into(),
            acting_user: acting_user.into(),
            accounts: None,
            at,
        }
    }

    #[must_use]
    pub fn accounts(mut self, accounts: TransferAccounts) -> Self {
        self.accounts = Some(accounts);
        self
    }
}
