//! Expense API endpoints.

use api_types::expense::{
    ExpenseCreated, ExpenseGet, ExpenseList, ExpenseListResponse, ExpenseNew, ExpenseView,
    ParticipantView, SplitInputView, SplitRecalculate,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{FixedOffset, Utc};
use uuid::Uuid;

use crate::groups::{map_currency, map_split_type, unmap_split_type};
use crate::{ServerError, server::ServerState};
use engine::{CreateExpenseCmd, Expense, RecalculateSplitCmd, SplitInput};
use store::users;

fn map_input(input: SplitInputView) -> SplitInput {
    SplitInput {
        user_id: input.username,
        percent_bp: input.percent_bp,
        shares: input.shares,
        exact_minor: input.exact_minor,
    }
}

fn expense_view(expense: Expense) -> Result<ExpenseView, ServerError> {
    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    Ok(ExpenseView {
        id: expense.id,
        group_id: expense.group_id,
        payer: expense.payer_id,
        total_minor: expense.total.minor(),
        currency: map_currency(expense.total.currency()),
        split_type: map_split_type(expense.split_type),
        note: expense.note,
        created_at: expense.created_at.with_timezone(&utc),
        participants: expense
            .participants
            .into_iter()
            .map(|p| ParticipantView {
                username: p.user_id,
                amount_owed_minor: p.amount_owed.minor(),
                percent_bp: p.percent_bp,
                shares: p.shares,
                is_paid: p.is_paid,
                paid_at: p.paid_at.map(|at| at.with_timezone(&utc)),
                linked_payment_id: p.linked_payment_id,
            })
            .collect(),
    })
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let mut cmd = CreateExpenseCmd::new(
        payload.group_id,
        payload.payer,
        payload.total_minor,
        user.username.clone(),
        payload.occurred_at.with_timezone(&Utc),
    );
    if let Some(split) = payload.split_type {
        cmd = cmd.split_type(unmap_split_type(split));
    }
    for input in payload.participants.unwrap_or_default() {
        cmd = cmd.input(map_input(input));
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let id = state.ledger.create_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(ExpenseCreated { id })))
}

pub async fn get_detail(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseGet>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.ledger.expense(payload.id, &user.username).await?;
    Ok(Json(expense_view(expense)?))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseList>,
) -> Result<Json<ExpenseListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);
    let (expenses, next_cursor) = state
        .ledger
        .list_group_expenses(
            payload.group_id,
            &user.username,
            limit,
            payload.cursor.as_deref(),
        )
        .await?;

    let expenses = expenses
        .into_iter()
        .map(expense_view)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(ExpenseListResponse {
        expenses,
        next_cursor,
    }))
}

pub async fn recalculate(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SplitRecalculate>,
) -> Result<StatusCode, ServerError> {
    state
        .ledger
        .recalculate_split(RecalculateSplitCmd {
            expense_id: id,
            total_minor: payload.total_minor,
            split_type: payload.split_type.map(unmap_split_type),
            inputs: payload.participants.into_iter().map(map_input).collect(),
            acting_user: user.username.clone(),
        })
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.ledger.delete_expense(id, &user.username).await?;
    Ok(StatusCode::OK)
}
