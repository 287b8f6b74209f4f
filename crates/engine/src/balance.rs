//! Balance aggregation.
//!
//! Folds all expenses of a group into net pairwise balances and paid/unpaid
//! progress. This is a pure, side-effect-free read: all accumulation is
//! addition over exact integer amounts, so the result depends only on the
//! expense set, never on evaluation order. Payments influence it solely
//! through `Participant.is_paid`, which the settlement operations maintain
//! inside the same transaction that appends the payment.
//!
//! Callers must treat the output as a point-in-time view: a concurrent
//! settlement can make it stale the instant it is returned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, Expense, Group, LedgerError, Money};

/// Net position between one unordered pair of members.
///
/// `user_a < user_b` lexicographically; a positive `net` means `user_b` owes
/// `user_a`. `total_historical` sums every owed amount ever recorded between
/// the pair (paid or not); `total_paid` the paid part — both drive progress
/// display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairBalance {
    pub user_a: String,
    pub user_b: String,
    pub net: Money,
    pub total_historical: Money,
    pub total_paid: Money,
}

/// All pair balances of one group, derived on demand and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalances {
    pub group_id: Uuid,
    pub currency: Currency,
    /// Sorted by `(user_a, user_b)`; pairs with no history are absent.
    pub pairs: Vec<PairBalance>,
}

impl GroupBalances {
    /// Signed net between two members: positive means `b` owes `a`.
    ///
    /// Antisymmetric by construction: `net_between(a, b) == -net_between(b, a)`.
    #[must_use]
    pub fn net_between(&self, a: &str, b: &str) -> Money {
        let (first, second, flip) = if a <= b { (a, b, false) } else { (b, a, true) };
        let net = self
            .pairs
            .iter()
            .find(|p| p.user_a == first && p.user_b == second)
            .map_or(Money::zero(self.currency), |p| p.net);
        if flip { -net } else { net }
    }

    /// Each member's net position across the whole group: positive for
    /// creditors, negative for debtors. Members with zero net are omitted.
    #[must_use]
    pub fn net_positions(&self) -> BTreeMap<String, i64> {
        let mut positions: BTreeMap<String, i64> = BTreeMap::new();
        for pair in &self.pairs {
            *positions.entry(pair.user_a.clone()).or_default() += pair.net.minor();
            *positions.entry(pair.user_b.clone()).or_default() -= pair.net.minor();
        }
        positions.retain(|_, net| *net != 0);
        positions
    }
}

#[derive(Default)]
struct PairAccumulator {
    /// Unpaid debt from `user_b` to `user_a` minus the opposite direction.
    net_minor: i64,
    historical_minor: i64,
    paid_minor: i64,
}

/// Folds a group's expenses into [`GroupBalances`].
///
/// For each unpaid participant row the owed amount is attributed as a debt
/// from the row's user to the expense payer, then the two directions of each
/// pair are netted into one signed figure. Rows where the user *is* the
/// payer are informational and skipped.
///
/// A payer or participant that is not a current group member means the
/// stored data violates its own invariants; that is reported as
/// `InconsistentLedger` (and logged), never silently dropped.
pub fn aggregate(group: &Group, expenses: &[Expense]) -> Result<GroupBalances, LedgerError> {
    let mut pairs: BTreeMap<(String, String), PairAccumulator> = BTreeMap::new();

    for expense in expenses {
        if expense.total.currency() != group.currency {
            return Err(inconsistent(format!(
                "expense {} is in {}, group {} uses {}",
                expense.id,
                expense.total.currency().code(),
                group.id,
                group.currency.code()
            )));
        }
        if !group.is_member(&expense.payer_id) {
            return Err(inconsistent(format!(
                "expense {} references payer {} who is not a member of group {}",
                expense.id, expense.payer_id, group.id
            )));
        }

        for row in &expense.participants {
            if row.user_id == expense.payer_id {
                continue;
            }
            if !group.is_member(&row.user_id) {
                return Err(inconsistent(format!(
                    "expense {} references participant {} who is not a member of group {}",
                    expense.id, row.user_id, group.id
                )));
            }

            let debtor = row.user_id.as_str();
            let creditor = expense.payer_id.as_str();
            let (key, direction) = if creditor <= debtor {
                ((creditor.to_string(), debtor.to_string()), 1)
            } else {
                ((debtor.to_string(), creditor.to_string()), -1)
            };

            let acc = pairs.entry(key).or_default();
            let owed = row.amount_owed.minor();
            acc.historical_minor += owed;
            if row.is_paid {
                acc.paid_minor += owed;
            } else {
                acc.net_minor += direction * owed;
            }
        }
    }

    let currency = group.currency;
    let pairs = pairs
        .into_iter()
        .map(|((user_a, user_b), acc)| PairBalance {
            user_a,
            user_b,
            net: Money::new(acc.net_minor, currency),
            total_historical: Money::new(acc.historical_minor, currency),
            total_paid: Money::new(acc.paid_minor, currency),
        })
        .collect();

    Ok(GroupBalances {
        group_id: group.id,
        currency,
        pairs,
    })
}

fn inconsistent(message: String) -> LedgerError {
    tracing::error!("{message}");
    LedgerError::InconsistentLedger(message)
}
