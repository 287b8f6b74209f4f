//! Settlement API endpoints.

use api_types::settlement::{LinkedAccounts, MarkPaid, PaymentCreated, SettleAll, SettleResult};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{MarkPaidCmd, SettleAllCmd, TransferAccounts};
use store::users;

fn map_accounts(accounts: Option<LinkedAccounts>) -> Option<TransferAccounts> {
    accounts.map(|a| TransferAccounts {
        from_account_id: a.from_account_id,
        to_account_id: a.to_account_id,
    })
}

pub async fn mark_paid(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((id, username)): Path<(Uuid, String)>,
    Json(payload): Json<MarkPaid>,
) -> Result<(StatusCode, Json<PaymentCreated>), ServerError> {
    let mut cmd = MarkPaidCmd::new(id, username, user.username.clone(), Utc::now());
    if let Some(accounts) = map_accounts(payload.accounts) {
        cmd = cmd.accounts(accounts);
    }

    let payment_id = state.ledger.mark_participant_paid(cmd).await?;
    Ok((StatusCode::CREATED, Json(PaymentCreated { payment_id })))
}

pub async fn mark_unpaid(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((id, username)): Path<(Uuid, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .ledger
        .mark_participant_unpaid(id, &username, &user.username)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn settle_all(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<SettleAll>,
) -> Result<(StatusCode, Json<SettleResult>), ServerError> {
    let mut cmd = SettleAllCmd::new(
        group_id,
        payload.user_a,
        payload.user_b,
        user.username.clone(),
        Utc::now(),
    );
    if let Some(accounts) = map_accounts(payload.accounts) {
        cmd = cmd.accounts(accounts);
    }

    let payment = state.ledger.settle_all(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(SettleResult {
            payment_id: payment.id,
            from: payment.from_user_id,
            to: payment.to_user_id,
            amount_minor: payment.amount.minor(),
            closed_expense_ids: payment.closed_expense_ids,
        }),
    ))
}
