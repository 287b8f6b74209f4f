use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::LedgerError;

use serde::Serialize;
pub use notify::LogNotifier;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod groups;
mod notify;
mod server;
mod settlement;

pub mod types {
    pub mod group {
        pub use api_types::group::{
            GroupCreated, GroupNew, GroupView, MemberUpsert, MemberView, MembersResponse,
        };
    }

    pub mod expense {
        pub use api_types::expense::{
            ExpenseCreated, ExpenseGet, ExpenseList, ExpenseListResponse, ExpenseNew,
            ExpenseView, ParticipantView, SplitInputView, SplitRecalculate,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalancesResponse, PairBalanceView};
    }

    pub mod settlement {
        pub use api_types::settlement::{
            LinkedAccounts, MarkPaid, PaymentCreated, SettleAll, SettlePlanResponse,
            SettleResult, SuggestedTransferView,
        };
    }
}

pub enum ServerError {
    Ledger(LedgerError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_ledger_error(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::ExistingKey(_)
        | LedgerError::AlreadyPaid(_)
        | LedgerError::NotPaid(_)
        | LedgerError::NothingToSettle(_) => StatusCode::CONFLICT,
        LedgerError::InvalidSplit(_)
        | LedgerError::InvalidAmount(_)
        | LedgerError::InvalidMember(_)
        | LedgerError::CurrencyMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::LinkedTransferFailed(_) => StatusCode::BAD_GATEWAY,
        LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::InconsistentLedger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_ledger_error(err: LedgerError) -> String {
    match err {
        LedgerError::InconsistentLedger(detail) => {
            tracing::error!("inconsistent ledger: {detail}");
            "internal server error".to_string()
        }
        LedgerError::StoreUnavailable(detail) => {
            tracing::error!("store unavailable: {detail}");
            "store unavailable".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Ledger(err) => {
                (status_for_ledger_error(&err), message_for_ledger_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}
