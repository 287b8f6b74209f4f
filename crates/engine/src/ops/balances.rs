use uuid::Uuid;

use crate::{
    GroupBalances, LedgerOp, Money, ResultLedger, SuggestedTransfer, balance, simplify,
};

use super::{Ledger, with_tx};

impl Ledger {
    /// Folds the group's expenses into pairwise balances and progress
    /// totals.
    ///
    /// Pure read under one snapshot transaction. The result is a
    /// point-in-time view: a settlement committing right after this returns
    /// makes it stale, and callers must not treat it as a lock.
    pub async fn group_balances(
        &self,
        group_id: Uuid,
        acting_user: &str,
    ) -> ResultLedger<GroupBalances> {
        self.authorize(LedgerOp::ViewGroup { group_id }, acting_user)
            .await?;
        with_tx!(self, |tx| {
            let group = tx.load_group(group_id).await?;
            let expenses = tx.load_group_expenses(group_id).await?;
            balance::aggregate(&group, &expenses)
        })
    }

    /// Signed net between two members: positive means `user_b` owes
    /// `user_a`.
    pub async fn pair_balance(
        &self,
        group_id: Uuid,
        user_a: &str,
        user_b: &str,
        acting_user: &str,
    ) -> ResultLedger<Money> {
        let balances = self.group_balances(group_id, acting_user).await?;
        Ok(balances.net_between(user_a, user_b))
    }

    /// Reduces the group's balances to a minimal transfer plan.
    ///
    /// A suggestion only — it may not match pairwise history and never
    /// rewrites payment records.
    pub async fn simplified_debts(
        &self,
        group_id: Uuid,
        acting_user: &str,
    ) -> ResultLedger<Vec<SuggestedTransfer>> {
        let balances = self.group_balances(group_id, acting_user).await?;
        Ok(simplify::simplify(&balances))
    }
}
