//! sea-orm implementation of the engine's store contract.
//!
//! `SqlStore` wraps a `DatabaseConnection`; each unit of work is one
//! database transaction (`SqlTx`), committed explicitly and rolled back on
//! drop. Database errors surface as `StoreUnavailable` — the engine decides
//! nothing about retries, and neither does this layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseConnection, DatabaseTransaction, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use engine::{
    Currency, Expense, Group, GroupMember, LedgerError, LedgerStore, LedgerTx, Participant,
    Payment,
};

use crate::{expenses, group_members, groups, participants, payment_expenses, payments};

/// Durable ledger storage backed by sea-orm.
#[derive(Clone, Debug)]
pub struct SqlStore {
    database: DatabaseConnection,
}

impl SqlStore {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

pub(crate) fn db_err(err: DbErr) -> LedgerError {
    LedgerError::StoreUnavailable(err.to_string())
}

fn parse_uuid(value: &str, label: &str) -> Result<Uuid, LedgerError> {
    Uuid::parse_str(value).map_err(|_| LedgerError::NotFound(format!("{label} {value}")))
}

pub struct SqlTx {
    tx: DatabaseTransaction,
}

impl SqlTx {
    async fn expense_from_model(&self, model: expenses::Model) -> Result<Expense, LedgerError> {
        let currency = Currency::try_from(model.currency.as_str())?;
        let mut expense = Expense::try_from(model)?;
        let rows = participants::Entity::find()
            .filter(participants::Column::ExpenseId.eq(expense.id.to_string()))
            .order_by_asc(participants::Column::Position)
            .all(&self.tx)
            .await
            .map_err(db_err)?;
        expense.participants = rows
            .into_iter()
            .map(|row| participants::to_domain(row, currency))
            .collect::<Result<_, _>>()?;
        Ok(expense)
    }
}

#[async_trait]
impl LedgerStore for SqlStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, LedgerError> {
        let tx = self.database.begin().await.map_err(db_err)?;
        Ok(Box::new(SqlTx { tx }))
    }
}

#[async_trait]
impl LedgerTx for SqlTx {
    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await.map_err(db_err)
    }

    async fn load_group(&mut self, group_id: Uuid) -> Result<Group, LedgerError> {
        let model = groups::Entity::find_by_id(group_id.to_string())
            .one(&self.tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;
        let mut group = Group::try_from(model)?;

        let members = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_members::Column::Position)
            .all(&self.tx)
            .await
            .map_err(db_err)?;
        group.members = members.into_iter().map(GroupMember::from).collect();
        Ok(group)
    }

    async fn insert_group(&mut self, group: &Group) -> Result<(), LedgerError> {
        groups::ActiveModel::from(group)
            .insert(&self.tx)
            .await
            .map_err(db_err)?;
        let group_id = group.id.to_string();
        for (position, member) in group.members.iter().enumerate() {
            group_members::active_model(&group_id, member, position as i32)
                .insert(&self.tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn upsert_member(
        &mut self,
        group_id: Uuid,
        member: &GroupMember,
    ) -> Result<(), LedgerError> {
        let key = (group_id.to_string(), member.user_id.clone());
        // Upsert: insert at the end of the join order if missing, otherwise
        // update the default weights in place.
        match group_members::Entity::find_by_id(key)
            .one(&self.tx)
            .await
            .map_err(db_err)?
        {
            Some(existing) => {
                let model =
                    group_members::active_model(&group_id.to_string(), member, existing.position);
                model.update(&self.tx).await.map_err(db_err)?;
            }
            None => {
                let next_position = group_members::Entity::find()
                    .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                    .count(&self.tx)
                    .await
                    .map_err(db_err)?;
                let model = group_members::active_model(
                    &group_id.to_string(),
                    member,
                    next_position as i32,
                );
                model.insert(&self.tx).await.map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn remove_member(&mut self, group_id: Uuid, user_id: &str) -> Result<(), LedgerError> {
        group_members::Entity::delete_by_id((group_id.to_string(), user_id.to_string()))
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load_expense(&mut self, expense_id: Uuid) -> Result<Expense, LedgerError> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::NotFound(format!("expense {expense_id}")))?;
        self.expense_from_model(model).await
    }

    async fn load_participant(
        &mut self,
        expense_id: Uuid,
        user_id: &str,
    ) -> Result<Participant, LedgerError> {
        let expense = self.load_expense(expense_id).await?;
        expense
            .participant(user_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("participant {user_id}")))
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), LedgerError> {
        expenses::ActiveModel::from(expense)
            .insert(&self.tx)
            .await
            .map_err(db_err)?;
        for (position, row) in expense.participants.iter().enumerate() {
            participants::active_model(row, position as i32)
                .insert(&self.tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn update_expense(&mut self, expense: &Expense) -> Result<(), LedgerError> {
        let model = expenses::ActiveModel {
            id: ActiveValue::Set(expense.id.to_string()),
            total_minor: ActiveValue::Set(expense.total.minor()),
            currency: ActiveValue::Set(expense.total.currency().code().to_string()),
            split_type: ActiveValue::Set(expense.split_type.as_str().to_string()),
            note: ActiveValue::Set(expense.note.clone()),
            ..Default::default()
        };
        model.update(&self.tx).await.map_err(db_err)?;
        Ok(())
    }

    async fn replace_participants(
        &mut self,
        expense_id: Uuid,
        rows: &[Participant],
    ) -> Result<(), LedgerError> {
        participants::Entity::delete_many()
            .filter(participants::Column::ExpenseId.eq(expense_id.to_string()))
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        for (position, row) in rows.iter().enumerate() {
            participants::active_model(row, position as i32)
                .insert(&self.tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn delete_expense(&mut self, expense_id: Uuid) -> Result<(), LedgerError> {
        participants::Entity::delete_many()
            .filter(participants::Column::ExpenseId.eq(expense_id.to_string()))
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        let result = expenses::Entity::delete_by_id(expense_id.to_string())
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(LedgerError::NotFound(format!("expense {expense_id}")));
        }
        Ok(())
    }

    async fn load_group_expenses(&mut self, group_id: Uuid) -> Result<Vec<Expense>, LedgerError> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.tx)
            .await
            .map_err(db_err)?;
        let mut result = Vec::with_capacity(models.len());
        for model in models {
            result.push(self.expense_from_model(model).await?);
        }
        Ok(result)
    }

    async fn load_group_expenses_page(
        &mut self,
        group_id: Uuid,
        before: Option<(DateTime<Utc>, Uuid)>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError> {
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id);
        if let Some((created_at, expense_id)) = before {
            query = query.filter(
                Condition::any()
                    .add(expenses::Column::CreatedAt.lt(created_at))
                    .add(
                        Condition::all()
                            .add(expenses::Column::CreatedAt.eq(created_at))
                            .add(expenses::Column::Id.lt(expense_id.to_string())),
                    ),
            );
        }
        let models = query.limit(limit).all(&self.tx).await.map_err(db_err)?;
        let mut result = Vec::with_capacity(models.len());
        for model in models {
            result.push(self.expense_from_model(model).await?);
        }
        Ok(result)
    }

    async fn find_expense_by_idempotency_key(
        &mut self,
        group_id: Uuid,
        key: &str,
    ) -> Result<Option<Uuid>, LedgerError> {
        let model = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expenses::Column::IdempotencyKey.eq(key.to_string()))
            .one(&self.tx)
            .await
            .map_err(db_err)?;
        model
            .map(|m| parse_uuid(&m.id, "expense"))
            .transpose()
    }

    async fn save_participant(
        &mut self,
        row: &Participant,
        expected_paid: bool,
    ) -> Result<(), LedgerError> {
        // Compare-and-swap on is_paid: the row is only written if the paid
        // state the caller read is still current.
        let result = participants::Entity::update_many()
            .col_expr(participants::Column::IsPaid, Expr::value(row.is_paid))
            .col_expr(participants::Column::PaidAt, Expr::value(row.paid_at))
            .col_expr(
                participants::Column::LinkedPaymentId,
                Expr::value(row.linked_payment_id.map(|id| id.to_string())),
            )
            .filter(participants::Column::ExpenseId.eq(row.expense_id.to_string()))
            .filter(participants::Column::UserId.eq(row.user_id.clone()))
            .filter(participants::Column::IsPaid.eq(expected_paid))
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected != 1 {
            return Err(LedgerError::StoreUnavailable(
                "paid-state conflict".to_string(),
            ));
        }
        Ok(())
    }

    async fn append_payment(&mut self, payment: &Payment) -> Result<(), LedgerError> {
        payments::ActiveModel::from(payment)
            .insert(&self.tx)
            .await
            .map_err(db_err)?;
        for expense_id in &payment.closed_expense_ids {
            let model = payment_expenses::ActiveModel {
                payment_id: ActiveValue::Set(payment.id.to_string()),
                expense_id: ActiveValue::Set(expense_id.to_string()),
            };
            model.insert(&self.tx).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn load_payment(&mut self, payment_id: Uuid) -> Result<Payment, LedgerError> {
        let model = payments::Entity::find_by_id(payment_id.to_string())
            .one(&self.tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::NotFound(format!("payment {payment_id}")))?;
        let mut payment = Payment::try_from(model)?;

        let closed = payment_expenses::Entity::find()
            .filter(payment_expenses::Column::PaymentId.eq(payment_id.to_string()))
            .order_by_asc(payment_expenses::Column::ExpenseId)
            .all(&self.tx)
            .await
            .map_err(db_err)?;
        payment.closed_expense_ids = closed
            .into_iter()
            .map(|m| parse_uuid(&m.expense_id, "expense"))
            .collect::<Result<_, _>>()?;
        Ok(payment)
    }

    async fn update_payment_closed_set(
        &mut self,
        payment_id: Uuid,
        closed_expense_ids: &[Uuid],
        amended: bool,
    ) -> Result<(), LedgerError> {
        payment_expenses::Entity::delete_many()
            .filter(payment_expenses::Column::PaymentId.eq(payment_id.to_string()))
            .exec(&self.tx)
            .await
            .map_err(db_err)?;
        for expense_id in closed_expense_ids {
            let model = payment_expenses::ActiveModel {
                payment_id: ActiveValue::Set(payment_id.to_string()),
                expense_id: ActiveValue::Set(expense_id.to_string()),
            };
            model.insert(&self.tx).await.map_err(db_err)?;
        }

        let model = payments::ActiveModel {
            id: ActiveValue::Set(payment_id.to_string()),
            amended: ActiveValue::Set(amended),
            ..Default::default()
        };
        model.update(&self.tx).await.map_err(db_err)?;
        Ok(())
    }
}
