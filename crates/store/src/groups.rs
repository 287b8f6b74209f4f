use engine::{Currency, Group, LedgerError, SplitType};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub currency: String,
    pub default_split: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.to_string()),
            name: ActiveValue::Set(group.name.clone()),
            owner_id: ActiveValue::Set(group.owner_id.clone()),
            currency: ActiveValue::Set(group.currency.code().to_string()),
            default_split: ActiveValue::Set(group.default_split.as_str().to_string()),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}

/// Builds the domain `Group` from its header row; members are attached by
/// the caller from the `group_members` table.
impl TryFrom<Model> for Group {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound(format!("group {}", model.id)))?,
            name: model.name,
            owner_id: model.owner_id,
            currency: Currency::try_from(model.currency.as_str())?,
            default_split: SplitType::try_from(model.default_split.as_str())?,
            members: Vec::new(),
            created_at: model.created_at,
        })
    }
}
