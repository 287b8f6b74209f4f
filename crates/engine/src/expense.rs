//! Expense primitives.
//!
//! An `Expense` is one shared cost fronted by a single payer and divided
//! among an ordered list of `Participant` rows. The division rule is a
//! [`SplitType`]; the inputs that produced each owed amount are retained on
//! the row for re-display and editing, never re-derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money};

/// The rule used to divide an expense's total among participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    Equal,
    Percentage,
    Exact,
    Shares,
}

impl SplitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
            Self::Exact => "exact",
            Self::Shares => "shares",
        }
    }
}

impl TryFrom<&str> for SplitType {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "equal" => Ok(Self::Equal),
            "percentage" => Ok(Self::Percentage),
            "exact" => Ok(Self::Exact),
            "shares" => Ok(Self::Shares),
            other => Err(LedgerError::InvalidSplit(format!(
                "invalid split type: {other}"
            ))),
        }
    }
}

/// One participant's raw input to the split calculator.
///
/// Which field is required depends on the split type; the others must stay
/// empty. `Equal` needs none of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInput {
    pub user_id: String,
    /// Percentage in basis points (10 000 = 100%), for `Percentage`.
    pub percent_bp: Option<u32>,
    /// Share count (>= 1), for `Shares`.
    pub shares: Option<u32>,
    /// Owed amount in minor units, for `Exact`.
    pub exact_minor: Option<i64>,
}

impl SplitInput {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            percent_bp: None,
            shares: None,
            exact_minor: None,
        }
    }

    #[must_use]
    pub fn percent_bp(mut self, percent_bp: u32) -> Self {
        self.percent_bp = Some(percent_bp);
        self
    }

    #[must_use]
    pub fn shares(mut self, shares: u32) -> Self {
        self.shares = Some(shares);
        self
    }

    #[must_use]
    pub fn exact_minor(mut self, exact_minor: i64) -> Self {
        self.exact_minor = Some(exact_minor);
        self
    }
}

/// One member's owed share of one expense.
///
/// Exactly one row exists per `(expense_id, user_id)`. The payer's own row
/// (when the payer is also listed) is informational: they cannot owe
/// themselves, and the balance aggregator skips it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub expense_id: Uuid,
    pub user_id: String,
    pub amount_owed: Money,
    /// The input that produced `amount_owed`, kept for re-display.
    pub percent_bp: Option<u32>,
    pub shares: Option<u32>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub linked_payment_id: Option<Uuid>,
}

impl Participant {
    #[must_use]
    pub fn new(expense_id: Uuid, user_id: impl Into<String>, amount_owed: Money) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            amount_owed,
            percent_bp: None,
            shares: None,
            is_paid: false,
            paid_at: None,
            linked_payment_id: None,
        }
    }
}

/// One shared cost, split among participants, fronted by one payer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub payer_id: String,
    pub total: Money,
    pub split_type: SplitType,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub participants: Vec<Participant>,
}

impl Expense {
    pub fn new(
        group_id: Uuid,
        payer_id: impl Into<String>,
        total: Money,
        split_type: SplitType,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if !total.is_positive() {
            return Err(LedgerError::InvalidAmount(
                "expense total must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            payer_id: payer_id.into(),
            total,
            split_type,
            note: None,
            created_at,
            idempotency_key: None,
            participants: Vec::new(),
        })
    }

    #[must_use]
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// `true` once any non-payer row has been marked paid.
    ///
    /// A locked expense's total and split type are immutable; corrections
    /// require deleting and recreating it.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.participants
            .iter()
            .any(|p| p.is_paid && p.user_id != self.payer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;

    #[test]
    fn zero_total_is_rejected() {
        let err = Expense::new(
            Uuid::new_v4(),
            "alice",
            Money::zero(Currency::Eur),
            SplitType::Equal,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn split_type_round_trips_through_str() {
        for kind in [
            SplitType::Equal,
            SplitType::Percentage,
            SplitType::Exact,
            SplitType::Shares,
        ] {
            assert_eq!(SplitType::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(SplitType::try_from("weighted").is_err());
    }
}
