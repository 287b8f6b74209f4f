//! Group and membership API endpoints.

use api_types::group::{
    GroupCreated, GroupNew, GroupView, MemberUpsert, MemberView, MembersResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{CreateGroupCmd, GroupMember};
use store::users;

pub(crate) fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Jpy => api_types::Currency::Jpy,
    }
}

pub(crate) fn unmap_currency(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Jpy => engine::Currency::Jpy,
    }
}

pub(crate) fn map_split_type(split_type: engine::SplitType) -> api_types::SplitType {
    match split_type {
        engine::SplitType::Equal => api_types::SplitType::Equal,
        engine::SplitType::Percentage => api_types::SplitType::Percentage,
        engine::SplitType::Exact => api_types::SplitType::Exact,
        engine::SplitType::Shares => api_types::SplitType::Shares,
    }
}

pub(crate) fn unmap_split_type(split_type: api_types::SplitType) -> engine::SplitType {
    match split_type {
        api_types::SplitType::Equal => engine::SplitType::Equal,
        api_types::SplitType::Percentage => engine::SplitType::Percentage,
        api_types::SplitType::Exact => engine::SplitType::Exact,
        api_types::SplitType::Shares => engine::SplitType::Shares,
    }
}

fn member_view(member: &GroupMember) -> MemberView {
    MemberView {
        username: member.user_id.clone(),
        default_percent_bp: member.default_percent_bp,
        default_shares: member.default_shares,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let mut cmd = CreateGroupCmd::new(payload.name, user.username.clone(), Utc::now());
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(unmap_currency(currency));
    }
    if let Some(split) = payload.default_split {
        cmd = cmd.default_split(unmap_split_type(split));
    }
    for member in payload.members.unwrap_or_default() {
        cmd = cmd.member(member);
    }

    let id = state.ledger.create_group(cmd).await?;
    Ok((StatusCode::CREATED, Json(GroupCreated { id })))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.ledger.group(group_id, &user.username).await?;

    Ok(Json(GroupView {
        id: group.id,
        name: group.name,
        owner: group.owner_id,
        currency: map_currency(group.currency),
        default_split: map_split_type(group.default_split),
        members: group.members.iter().map(member_view).collect(),
    }))
}

pub async fn list_members(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ServerError> {
    let group = state.ledger.group(group_id, &user.username).await?;
    Ok(Json(MembersResponse {
        members: group.members.iter().map(member_view).collect(),
    }))
}

pub async fn upsert_member(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberUpsert>,
) -> Result<StatusCode, ServerError> {
    let member = GroupMember {
        user_id: payload.username,
        default_percent_bp: payload.default_percent_bp,
        default_shares: payload.default_shares,
    };
    state
        .ledger
        .upsert_member(group_id, member, &user.username)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn remove_member(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((group_id, username)): Path<(Uuid, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .ledger
        .remove_member(group_id, &username, &user.username)
        .await?;
    Ok(StatusCode::OK)
}
