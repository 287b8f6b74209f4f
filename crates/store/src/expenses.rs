use engine::{Currency, Expense, LedgerError, Money, SplitType};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub total_minor: i64,
    pub currency: String,
    pub split_type: String,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Groups,
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.to_string()),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            total_minor: ActiveValue::Set(expense.total.minor()),
            currency: ActiveValue::Set(expense.total.currency().code().to_string()),
            split_type: ActiveValue::Set(expense.split_type.as_str().to_string()),
            note: ActiveValue::Set(expense.note.clone()),
            created_at: ActiveValue::Set(expense.created_at),
            idempotency_key: ActiveValue::Set(expense.idempotency_key.clone()),
        }
    }
}

/// Builds the domain `Expense` from its header row; participant rows are
/// attached by the caller from the `participants` table.
impl TryFrom<Model> for Expense {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound(format!("expense {}", model.id)))?,
            group_id: Uuid::parse_str(&model.group_id)
                .map_err(|_| LedgerError::NotFound(format!("group {}", model.group_id)))?,
            payer_id: model.payer_id,
            total: Money::new(model.total_minor, currency),
            split_type: SplitType::try_from(model.split_type.as_str())?,
            note: model.note,
            created_at: model.created_at,
            idempotency_key: model.idempotency_key,
            participants: Vec::new(),
        })
    }
}
