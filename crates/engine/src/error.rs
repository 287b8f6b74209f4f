//! The error type shared by every ledger operation.
//!
//! Validation failures (`InvalidSplit`, `NotFound`, `NotAuthorized`) are
//! returned to the caller directly and are never retried. No-op conditions
//! (`AlreadyPaid`, `NotPaid`, `NothingToSettle`) signal that the requested
//! state change has already happened or has nothing to act on; they are not
//! corruption. `StoreUnavailable` is a transactional timeout/conflict from
//! the store collaborator — the engine never retries it itself, so callers
//! can decide without risking duplicate side effects.

use thiserror::Error;

/// Ledger engine errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid split: {0}")]
    InvalidSplit(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid member: {0}")]
    InvalidMember(String),
    #[error("currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("\"{0}\" already present")]
    ExistingKey(String),
    #[error("already paid: {0}")]
    AlreadyPaid(String),
    #[error("not paid: {0}")]
    NotPaid(String),
    #[error("nothing to settle: {0}")]
    NothingToSettle(String),
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("inconsistent ledger: {0}")]
    InconsistentLedger(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("linked transfer failed: {0}")]
    LinkedTransferFailed(String),
}
