//! Debt simplification.
//!
//! Reduces a group's pairwise balances to the minimum number of transfers
//! that zero out everyone's net position. This is a read-only projection —
//! a *suggestion* that may not match actual pairwise history — and is never
//! used to rewrite payment records.

use serde::{Deserialize, Serialize};

use crate::{GroupBalances, Money};

/// One suggested transfer in a simplified settlement plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTransfer {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
}

/// Greedy minimum-transaction settlement over whole-group net positions.
///
/// Repeatedly matches the creditor with the largest positive net against the
/// debtor with the largest negative net, transferring the smaller of the two
/// magnitudes; whoever reaches zero drops out. Net positions come from an
/// ordered map and ties break toward the smaller member id, so the plan is
/// deterministic. Terminates in at most `members − 1` transfers.
#[must_use]
pub fn simplify(balances: &GroupBalances) -> Vec<SuggestedTransfer> {
    let mut positions = balances.net_positions();
    let mut transfers = Vec::new();

    loop {
        // First-strictly-greater keeps the smallest id on ties, since the
        // map iterates in ascending id order.
        let creditor = positions
            .iter()
            .filter(|(_, net)| **net > 0)
            .max_by(|(ida, a), (idb, b)| a.cmp(b).then(idb.cmp(ida)))
            .map(|(id, net)| (id.clone(), *net));
        let debtor = positions
            .iter()
            .filter(|(_, net)| **net < 0)
            .max_by(|(ida, a), (idb, b)| b.cmp(a).then(idb.cmp(ida)))
            .map(|(id, net)| (id.clone(), *net));

        let (Some((creditor_id, credit)), Some((debtor_id, debit))) = (creditor, debtor) else {
            break;
        };

        let moved = credit.min(-debit);
        transfers.push(SuggestedTransfer {
            from_user_id: debtor_id.clone(),
            to_user_id: creditor_id.clone(),
            amount: Money::new(moved, balances.currency),
        });

        adjust(&mut positions, &creditor_id, -moved);
        adjust(&mut positions, &debtor_id, moved);
    }

    debug_assert!(positions.is_empty());
    transfers
}

fn adjust(
    positions: &mut std::collections::BTreeMap<String, i64>,
    user_id: &str,
    delta: i64,
) {
    if let Some(net) = positions.get_mut(user_id) {
        *net += delta;
        if *net == 0 {
            positions.remove(user_id);
        }
    }
}
