//! Membership-backed authorization.
//!
//! Policy: any member views their group, creates expenses in it and settles
//! balances; only the owner manages members; an expense is edited by its
//! payer or the group owner; a share is marked paid by its debtor or the
//! expense payer, and reverted by the payer alone. Unknown ids deny.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, prelude::*};
use uuid::Uuid;

use engine::{AuthorizationCheck, LedgerError, LedgerOp};

use crate::sql::db_err;
use crate::{expenses, group_members, groups};

/// `AuthorizationCheck` implementation reading group membership rows.
#[derive(Clone, Debug)]
pub struct MembershipAuth {
    database: DatabaseConnection,
}

impl MembershipAuth {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    async fn is_member(&self, group_id: Uuid, user_id: &str) -> Result<bool, LedgerError> {
        let row = group_members::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(&self.database)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn is_owner(&self, group_id: Uuid, user_id: &str) -> Result<bool, LedgerError> {
        let group = groups::Entity::find_by_id(group_id.to_string())
            .one(&self.database)
            .await
            .map_err(db_err)?;
        Ok(group.is_some_and(|g| g.owner_id == user_id))
    }

    async fn expense_header(
        &self,
        expense_id: Uuid,
    ) -> Result<Option<expenses::Model>, LedgerError> {
        expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl AuthorizationCheck for MembershipAuth {
    async fn allow(&self, op: &LedgerOp, acting_user: &str) -> Result<bool, LedgerError> {
        match op {
            LedgerOp::ViewGroup { group_id }
            | LedgerOp::CreateExpense { group_id }
            | LedgerOp::SettleAll { group_id } => self.is_member(*group_id, acting_user).await,
            LedgerOp::ManageMembers { group_id } => self.is_owner(*group_id, acting_user).await,
            LedgerOp::EditExpense {
                group_id,
                expense_id,
            } => {
                let Some(header) = self.expense_header(*expense_id).await? else {
                    return Ok(false);
                };
                if header.payer_id == acting_user {
                    return Ok(true);
                }
                self.is_owner(*group_id, acting_user).await
            }
            LedgerOp::MarkPaid {
                expense_id,
                debtor_id,
            } => {
                let Some(header) = self.expense_header(*expense_id).await? else {
                    return Ok(false);
                };
                Ok(acting_user == debtor_id || acting_user == header.payer_id)
            }
            LedgerOp::MarkUnpaid { expense_id } => {
                let Some(header) = self.expense_header(*expense_id).await? else {
                    return Ok(false);
                };
                Ok(acting_user == header.payer_id)
            }
        }
    }
}
