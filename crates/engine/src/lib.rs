//! The shared-expense ledger engine.
//!
//! Splits a group expense among participants, tracks who has paid whom,
//! aggregates per-pair net balances, and reduces many pairwise debts into a
//! minimal settlement plan. Storage, authorization, account transfers and
//! notifications are consumed through the traits in [`store`] — the engine
//! owns the money semantics, its collaborators own the infrastructure.

pub use balance::{GroupBalances, PairBalance};
pub use commands::{
    CreateExpenseCmd, CreateGroupCmd, MarkPaidCmd, RecalculateSplitCmd, SettleAllCmd,
    TransferAccounts,
};
pub use currency::Currency;
pub use error::LedgerError;
pub use expense::{Expense, Participant, SplitInput, SplitType};
pub use group::{Group, GroupMember};
pub use money::Money;
pub use ops::{Ledger, LedgerBuilder};
pub use payment::Payment;
pub use simplify::SuggestedTransfer;
pub use split::{PERCENT_EPSILON_BP, PERCENT_TOTAL_BP, split_expense};
pub use store::{
    AccountTransferService, AuthorizationCheck, LedgerEvent, LedgerOp, LedgerStore, LedgerTx,
    Notifier, TransferFailure, TransferRequest,
};

pub mod balance;
mod commands;
mod currency;
mod error;
mod expense;
mod group;
mod money;
mod ops;
mod payment;
pub mod simplify;
mod split;
mod store;

pub type ResultLedger<T> = Result<T, LedgerError>;
