use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, SplitType};

/// A member of a [`Group`], in join order.
///
/// The optional default weights seed the split inputs for a new expense when
/// the caller does not override them; they are **not** consulted by the split
/// calculator itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: String,
    /// Default percentage in basis points (10 000 = 100%).
    pub default_percent_bp: Option<u32>,
    /// Default share count.
    pub default_shares: Option<u32>,
}

impl GroupMember {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            default_percent_bp: None,
            default_shares: None,
        }
    }
}

/// A fixed set of members who share expenses together.
///
/// The member list is ordered (join order) and unique by `user_id`. The
/// group's currency is fixed at creation; every expense and payment inside
/// the group carries it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub owner_id: String,
    pub currency: Currency,
    pub default_split: SplitType,
    pub members: Vec<GroupMember>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Creates a group with the owner as its first member.
    pub fn new(
        name: impl Into<String>,
        owner_id: impl Into<String>,
        currency: Currency,
        default_split: SplitType,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidMember(
                "group name must not be empty".to_string(),
            ));
        }
        let owner_id = owner_id.into();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            owner_id: owner_id.clone(),
            currency,
            default_split,
            members: vec![GroupMember::new(owner_id)],
            created_at,
        })
    }

    #[must_use]
    pub fn member(&self, user_id: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    /// Appends a member, rejecting duplicates.
    pub fn add_member(&mut self, member: GroupMember) -> Result<(), LedgerError> {
        if self.is_member(&member.user_id) {
            return Err(LedgerError::ExistingKey(member.user_id));
        }
        self.members.push(member);
        Ok(())
    }
}
