//! sea-orm persistence for the shared-expense ledger.
//!
//! Implements the engine's collaborator contracts: [`SqlStore`] is the
//! `LedgerStore` (one database transaction per unit of work) and
//! [`MembershipAuth`] the `AuthorizationCheck`. The entity modules mirror
//! the migration schema and convert to and from the engine's domain types.

pub use access::MembershipAuth;
pub use sql::{SqlStore, SqlTx};

mod access;
mod sql;

pub mod expenses;
pub mod group_members;
pub mod groups;
pub mod participants;
pub mod payment_expenses;
pub mod payments;
pub mod users;
