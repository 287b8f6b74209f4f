use engine::{Currency, LedgerError, Money, Payment};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: DateTimeUtc,
    pub linked_transfer_id: Option<String>,
    pub amended: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_expenses::Entity")]
    PaymentExpenses,
}

impl Related<super::payment_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            group_id: ActiveValue::Set(payment.group_id.to_string()),
            from_user_id: ActiveValue::Set(payment.from_user_id.clone()),
            to_user_id: ActiveValue::Set(payment.to_user_id.clone()),
            amount_minor: ActiveValue::Set(payment.amount.minor()),
            currency: ActiveValue::Set(payment.amount.currency().code().to_string()),
            created_at: ActiveValue::Set(payment.created_at),
            linked_transfer_id: ActiveValue::Set(
                payment.linked_transfer_id.map(|id| id.to_string()),
            ),
            amended: ActiveValue::Set(payment.amended),
        }
    }
}

/// Builds the domain `Payment` from its header row; the closed-expense set
/// is attached by the caller from the `payment_expenses` table.
impl TryFrom<Model> for Payment {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::NotFound(format!("payment {}", model.id)))?,
            group_id: Uuid::parse_str(&model.group_id)
                .map_err(|_| LedgerError::NotFound(format!("group {}", model.group_id)))?,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount: Money::new(model.amount_minor, currency),
            created_at: model.created_at,
            closed_expense_ids: Vec::new(),
            linked_transfer_id: model
                .linked_transfer_id
                .and_then(|id| Uuid::parse_str(&id).ok()),
            amended: model.amended,
        })
    }
}
