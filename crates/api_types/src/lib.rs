use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Jpy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    Equal,
    Percentage,
    Exact,
    Shares,
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub currency: Option<Currency>,
        pub default_split: Option<SplitType>,
        /// Additional member usernames beyond the creator, in join order.
        pub members: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub username: String,
        /// Default percentage in basis points (10 000 = 100%).
        pub default_percent_bp: Option<u32>,
        pub default_shares: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub owner: String,
        pub currency: Currency,
        pub default_split: SplitType,
        pub members: Vec<MemberView>,
    }

    /// Request body for adding/updating a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberUpsert {
        pub username: String,
        pub default_percent_bp: Option<u32>,
        pub default_shares: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }
}

pub mod expense {
    use super::*;

    /// One participant's raw split input. Which field is required depends on
    /// the split type; `equal` needs none.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitInputView {
        pub username: String,
        /// Percentage in basis points (10 000 = 100%).
        pub percent_bp: Option<u32>,
        pub shares: Option<u32>,
        pub exact_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: Uuid,
        /// Member who fronted the money.
        pub payer: String,
        pub total_minor: i64,
        /// Defaults to the group's default split type.
        pub split_type: Option<SplitType>,
        /// Defaults to one input per group member.
        pub participants: Option<Vec<SplitInputView>>,
        pub note: Option<String>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub username: String,
        pub amount_owed_minor: i64,
        pub percent_bp: Option<u32>,
        pub shares: Option<u32>,
        pub is_paid: bool,
        pub paid_at: Option<DateTime<FixedOffset>>,
        pub linked_payment_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub payer: String,
        pub total_minor: i64,
        pub currency: Currency,
        pub split_type: SplitType,
        pub note: Option<String>,
        pub created_at: DateTime<FixedOffset>,
        pub participants: Vec<ParticipantView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseList {
        pub group_id: Uuid,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseListResponse {
        pub expenses: Vec<ExpenseView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseGet {
        pub id: Uuid,
    }

    /// Full-split recompute: the complete input list replaces the old split.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitRecalculate {
        pub total_minor: Option<i64>,
        pub split_type: Option<SplitType>,
        pub participants: Vec<SplitInputView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PairBalanceView {
        pub user_a: String,
        pub user_b: String,
        /// Positive means `user_b` owes `user_a`.
        pub net_minor: i64,
        pub total_historical_minor: i64,
        pub total_paid_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub group_id: Uuid,
        pub currency: Currency,
        pub pairs: Vec<PairBalanceView>,
    }
}

pub mod settlement {
    use super::*;

    /// Optional account pair for a linked money movement.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LinkedAccounts {
        pub from_account_id: Uuid,
        pub to_account_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MarkPaid {
        pub accounts: Option<LinkedAccounts>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentCreated {
        pub payment_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleAll {
        pub user_a: String,
        pub user_b: String,
        pub accounts: Option<LinkedAccounts>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettleResult {
        pub payment_id: Uuid,
        pub from: String,
        pub to: String,
        /// Net amount settled, in minor units.
        pub amount_minor: i64,
        pub closed_expense_ids: Vec<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SuggestedTransferView {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlePlanResponse {
        pub group_id: Uuid,
        pub currency: Currency,
        pub transfers: Vec<SuggestedTransferView>,
    }
}
