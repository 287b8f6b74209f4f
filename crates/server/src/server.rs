use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{DatabaseConnection, EntityTrait};

use std::sync::Arc;

use crate::{balances, expenses, groups, settlement};
use engine::Ledger;
use store::users;

#[derive(Clone)]
pub struct ServerState {
    pub ledger: Arc<Ledger>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<users::Model> = users::Entity::find_by_id(auth_header.username().to_string())
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = match user {
        Some(user) if user.password == auth_header.password() => user,
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/groups", post(groups::create))
        .route("/groups/{group_id}", get(groups::get))
        .route(
            "/groups/{group_id}/members",
            get(groups::list_members).post(groups::upsert_member),
        )
        .route(
            "/groups/{group_id}/members/{username}",
            axum::routing::delete(groups::remove_member),
        )
        .route("/expenses", post(expenses::create).get(expenses::list))
        .route("/expenses/get", post(expenses::get_detail))
        .route(
            "/expenses/{id}/split",
            axum::routing::patch(expenses::recalculate),
        )
        .route("/expenses/{id}", axum::routing::delete(expenses::delete))
        .route(
            "/expenses/{id}/participants/{username}/pay",
            post(settlement::mark_paid),
        )
        .route(
            "/expenses/{id}/participants/{username}/unpay",
            post(settlement::mark_unpaid),
        )
        .route("/groups/{group_id}/balances", get(balances::get))
        .route("/groups/{group_id}/settle-plan", get(balances::settle_plan))
        .route("/groups/{group_id}/settle", post(settlement::settle_all))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(ledger: Ledger, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(ledger, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    ledger: Ledger,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        ledger: Arc::new(ledger),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    ledger: Ledger,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(ledger, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
