use uuid::Uuid;

use crate::{
    CreateGroupCmd, Group, GroupMember, LedgerError, LedgerOp, ResultLedger,
    split::PERCENT_TOTAL_BP,
};

use super::{Ledger, normalize_required_name, with_tx};

fn validate_member_weights(member: &GroupMember) -> ResultLedger<()> {
    if let Some(bp) = member.default_percent_bp
        && bp > PERCENT_TOTAL_BP
    {
        return Err(LedgerError::InvalidMember(format!(
            "default percentage for {} exceeds 100%",
            member.user_id
        )));
    }
    if member.default_shares == Some(0) {
        return Err(LedgerError::InvalidMember(format!(
            "default shares for {} must be >= 1",
            member.user_id
        )));
    }
    Ok(())
}

impl Ledger {
    /// Creates a group; the acting user becomes owner and first member.
    pub async fn create_group(&self, cmd: CreateGroupCmd) -> ResultLedger<Uuid> {
        let name = normalize_required_name(&cmd.name, "group")?;
        let mut group = Group::new(
            name,
            &cmd.acting_user,
            cmd.currency,
            cmd.default_split,
            cmd.created_at,
        )?;
        for user_id in &cmd.members {
            let user_id = normalize_required_name(user_id, "member")?;
            group.add_member(GroupMember::new(user_id))?;
        }

        let group_id = group.id;
        with_tx!(self, |tx| {
            tx.insert_group(&group).await?;
            Ok(group_id)
        })
    }

    /// Returns a group snapshot, members included.
    pub async fn group(&self, group_id: Uuid, acting_user: &str) -> ResultLedger<Group> {
        self.authorize(LedgerOp::ViewGroup { group_id }, acting_user)
            .await?;
        with_tx!(self, |tx| tx.load_group(group_id).await)
    }

    /// Adds a member or updates an existing member's default weights
    /// (owner-only, enforced by the authorization collaborator).
    pub async fn upsert_member(
        &self,
        group_id: Uuid,
        member: GroupMember,
        acting_user: &str,
    ) -> ResultLedger<()> {
        self.authorize(LedgerOp::ManageMembers { group_id }, acting_user)
            .await?;
        let user_id = normalize_required_name(&member.user_id, "member")?;
        let member = GroupMember {
            user_id,
            ..member
        };
        validate_member_weights(&member)?;

        with_tx!(self, |tx| {
            // Existence check keeps the store's upsert honest about ids.
            tx.load_group(group_id).await?;
            tx.upsert_member(group_id, &member).await
        })
    }

    /// Removes a member (owner-only). The owner cannot be removed, and
    /// neither can a member who still has unpaid shares or unpaid debtors —
    /// that would orphan participant rows into `InconsistentLedger`
    /// territory.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        member_user_id: &str,
        acting_user: &str,
    ) -> ResultLedger<()> {
        self.authorize(LedgerOp::ManageMembers { group_id }, acting_user)
            .await?;

        with_tx!(self, |tx| {
            let group = tx.load_group(group_id).await?;
            if member_user_id == group.owner_id {
                return Err(LedgerError::InvalidMember(
                    "cannot remove the group owner".to_string(),
                ));
            }
            if !group.is_member(member_user_id) {
                return Err(LedgerError::NotFound(member_user_id.to_string()));
            }

            let expenses = tx.load_group_expenses(group_id).await?;
            let has_open_rows = expenses.iter().any(|expense| {
                expense.participants.iter().any(|row| {
                    !row.is_paid
                        && row.user_id != expense.payer_id
                        && (row.user_id == member_user_id || expense.payer_id == member_user_id)
                })
            });
            if has_open_rows {
                return Err(LedgerError::InvalidMember(format!(
                    "{member_user_id} still has unsettled balances"
                )));
            }

            tx.remove_member(group_id, member_user_id).await
        })
    }
}
