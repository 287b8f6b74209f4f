//! Balance and settle-plan API endpoints (read-only projections).

use api_types::balance::{BalancesResponse, PairBalanceView};
use api_types::settlement::{SettlePlanResponse, SuggestedTransferView};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::groups::map_currency;
use crate::{ServerError, server::ServerState};
use store::users;

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state.ledger.group_balances(group_id, &user.username).await?;

    Ok(Json(BalancesResponse {
        group_id: balances.group_id,
        currency: map_currency(balances.currency),
        pairs: balances
            .pairs
            .into_iter()
            .map(|pair| PairBalanceView {
                user_a: pair.user_a,
                user_b: pair.user_b,
                net_minor: pair.net.minor(),
                total_historical_minor: pair.total_historical.minor(),
                total_paid_minor: pair.total_paid.minor(),
            })
            .collect(),
    }))
}

pub async fn settle_plan(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<SettlePlanResponse>, ServerError> {
    let balances = state.ledger.group_balances(group_id, &user.username).await?;
    let transfers = engine::simplify::simplify(&balances);

    Ok(Json(SettlePlanResponse {
        group_id,
        currency: map_currency(balances.currency),
        transfers: transfers
            .into_iter()
            .map(|transfer| SuggestedTransferView {
                from: transfer.from_user_id,
                to: transfer.to_user_id,
                amount_minor: transfer.amount.minor(),
            })
            .collect(),
    }))
}
