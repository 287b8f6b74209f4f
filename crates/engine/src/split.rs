//! The split calculator.
//!
//! Turns `(total, split type, participant inputs)` into participant rows
//! whose owed amounts sum **exactly** to the total. This is a pure function:
//! recalculating a split re-runs it over the full input list — there are no
//! incremental edits, which is what keeps repeated edits from drifting.

use uuid::Uuid;

use crate::{LedgerError, Money, Participant, SplitInput, SplitType};

/// 100% expressed in basis points.
pub const PERCENT_TOTAL_BP: u32 = 10_000;
/// Accepted deviation of a percentage split from 100%, in basis points.
pub const PERCENT_EPSILON_BP: u32 = 1;

fn ensure_unique_users(inputs: &[SplitInput]) -> Result<(), LedgerError> {
    for (index, input) in inputs.iter().enumerate() {
        if inputs[..index].iter().any(|i| i.user_id == input.user_id) {
            return Err(LedgerError::InvalidSplit(format!(
                "duplicate participant: {}",
                input.user_id
            )));
        }
    }
    Ok(())
}

/// Computes the ordered participant rows for one expense.
///
/// Guarantees `Σ amount_owed == total` in every accepted case; the inputs
/// that produced each amount are retained on the rows. Rejects with
/// `InvalidSplit` on empty or duplicate inputs, missing per-mode fields,
/// percentages outside `100% ± 0.01`, shares below 1, or exact amounts that
/// do not sum to the total (zero tolerance — `Exact` has no reconciliation).
pub fn split_expense(
    expense_id: Uuid,
    total: Money,
    split_type: SplitType,
    inputs: &[SplitInput],
) -> Result<Vec<Participant>, LedgerError> {
    if inputs.is_empty() {
        return Err(LedgerError::InvalidSplit(
            "an expense needs at least one participant".to_string(),
        ));
    }
    ensure_unique_users(inputs)?;

    match split_type {
        SplitType::Equal => {
            let weights = vec![1u64; inputs.len()];
            let amounts = total.allocate(&weights)?;
            Ok(inputs
                .iter()
                .zip(amounts)
                .map(|(input, amount)| Participant::new(expense_id, &input.user_id, amount))
                .collect())
        }
        SplitType::Percentage => {
            let mut weights = Vec::with_capacity(inputs.len());
            let mut sum_bp: u64 = 0;
            for input in inputs {
                let bp = input.percent_bp.ok_or_else(|| {
                    LedgerError::InvalidSplit(format!(
                        "missing percentage for {}",
                        input.user_id
                    ))
                })?;
                sum_bp += u64::from(bp);
                weights.push(u64::from(bp));
            }
            let target = u64::from(PERCENT_TOTAL_BP);
            let epsilon = u64::from(PERCENT_EPSILON_BP);
            if sum_bp.abs_diff(target) > epsilon {
                return Err(LedgerError::InvalidSplit(format!(
                    "percentages sum to {sum_bp} bp, expected {target} bp"
                )));
            }
            let amounts = total.allocate(&weights)?;
            Ok(inputs
                .iter()
                .zip(amounts)
                .map(|(input, amount)| {
                    let mut row = Participant::new(expense_id, &input.user_id, amount);
                    row.percent_bp = input.percent_bp;
                    row
                })
                .collect())
        }
        SplitType::Shares => {
            let mut weights = Vec::with_capacity(inputs.len());
            for input in inputs {
                let shares = input.shares.ok_or_else(|| {
                    LedgerError::InvalidSplit(format!("missing shares for {}", input.user_id))
                })?;
                if shares == 0 {
                    return Err(LedgerError::InvalidSplit(format!(
                        "shares must be >= 1 for {}",
                        input.user_id
                    )));
                }
                weights.push(u64::from(shares));
            }
            let amounts = total.allocate(&weights)?;
            Ok(inputs
                .iter()
                .zip(amounts)
                .map(|(input, amount)| {
                    let mut row = Participant::new(expense_id, &input.user_id, amount);
                    row.shares = input.shares;
                    row
                })
                .collect())
        }
        SplitType::Exact => {
            let mut rows = Vec::with_capacity(inputs.len());
            let mut sum = Money::zero(total.currency());
            for input in inputs {
                let minor = input.exact_minor.ok_or_else(|| {
                    LedgerError::InvalidSplit(format!(
                        "missing exact amount for {}",
                        input.user_id
                    ))
                })?;
                if minor < 0 {
                    return Err(LedgerError::InvalidSplit(format!(
                        "exact amount must be >= 0 for {}",
                        input.user_id
                    )));
                }
                let amount = Money::new(minor, total.currency());
                sum = sum.checked_add(amount)?;
                rows.push(Participant::new(expense_id, &input.user_id, amount));
            }
            if sum != total {
                return Err(LedgerError::InvalidSplit(format!(
                    "exact amounts sum to {sum}, expected {total}"
                )));
            }
            Ok(rows)
        }
    }
}
