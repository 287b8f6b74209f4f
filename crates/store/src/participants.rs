use engine::{Currency, LedgerError, Money, Participant};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Input order from the split calculator.
    pub position: i32,
    pub amount_owed_minor: i64,
    pub percent_bp: Option<i32>,
    pub shares: Option<i32>,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub linked_payment_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(row: &Participant, position: i32) -> ActiveModel {
    ActiveModel {
        expense_id: ActiveValue::Set(row.expense_id.to_string()),
        user_id: ActiveValue::Set(row.user_id.clone()),
        position: ActiveValue::Set(position),
        amount_owed_minor: ActiveValue::Set(row.amount_owed.minor()),
        percent_bp: ActiveValue::Set(row.percent_bp.map(|bp| bp as i32)),
        shares: ActiveValue::Set(row.shares.map(|s| s as i32)),
        is_paid: ActiveValue::Set(row.is_paid),
        paid_at: ActiveValue::Set(row.paid_at),
        linked_payment_id: ActiveValue::Set(row.linked_payment_id.map(|id| id.to_string())),
    }
}

pub(crate) fn to_domain(model: Model, currency: Currency) -> Result<Participant, LedgerError> {
    Ok(Participant {
        expense_id: Uuid::parse_str(&model.expense_id)
            .map_err(|_| LedgerError::NotFound(format!("expense {}", model.expense_id)))?,
        user_id: model.user_id,
        amount_owed: Money::new(model.amount_owed_minor, currency),
        percent_bp: model.percent_bp.map(|bp| bp as u32),
        shares: model.shares.map(|s| s as u32),
        is_paid: model.is_paid,
        paid_at: model.paid_at,
        linked_payment_id: model
            .linked_payment_id
            .and_then(|id| Uuid::parse_str(&id).ok()),
    })
}
