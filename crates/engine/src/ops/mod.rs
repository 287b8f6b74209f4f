use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{
    AccountTransferService, AuthorizationCheck, LedgerError, LedgerEvent, LedgerOp, LedgerStore,
    Money, Notifier, ResultLedger, TransferRequest, commands::TransferAccounts,
};

mod balances;
mod expenses;
mod groups;
mod settlement;

/// Run a block inside a store transaction, committing on success and rolling
/// back (via drop) on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut $tx = $self.store.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The shared-expense ledger engine.
///
/// All state lives behind the [`LedgerStore`] collaborator; every mutating
/// operation runs as one transactional unit of work against it, so the
/// balance it reads and the write it performs are atomic. The engine is
/// invoked synchronously per request and has no threading model of its own.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    auth: Arc<dyn AuthorizationCheck>,
    transfers: Option<Arc<dyn AccountTransferService>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Ledger {
    /// Return a builder for `Ledger`. Store and authorization are required;
    /// transfers and notifications are optional collaborators.
    pub fn builder(
        store: Arc<dyn LedgerStore>,
        auth: Arc<dyn AuthorizationCheck>,
    ) -> LedgerBuilder {
        LedgerBuilder {
            store,
            auth,
            transfers: None,
            notifier: None,
        }
    }

    pub(crate) async fn authorize(&self, op: LedgerOp, acting_user: &str) -> ResultLedger<()> {
        if self.auth.allow(&op, acting_user).await? {
            Ok(())
        } else {
            Err(LedgerError::NotAuthorized(format!(
                "{acting_user} may not perform this operation"
            )))
        }
    }

    pub(crate) fn notify(&self, event: LedgerEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(&event);
        }
    }

    /// Requests a linked money movement from the optional transfer
    /// collaborator; a missing service or a collaborator failure is
    /// `LinkedTransferFailed`.
    pub(crate) async fn request_transfer(
        &self,
        accounts: &TransferAccounts,
        amount: Money,
    ) -> ResultLedger<Uuid> {
        let service = self.transfers.as_ref().ok_or_else(|| {
            LedgerError::LinkedTransferFailed(
                "no account transfer service configured".to_string(),
            )
        })?;
        service
            .transfer(TransferRequest {
                from_account_id: accounts.from_account_id,
                to_account_id: accounts.to_account_id,
                amount,
            })
            .await
            .map_err(|failure| LedgerError::LinkedTransferFailed(failure.0))
    }

    /// Compensating action: best-effort reversal of a transfer whose ledger
    /// commit failed. The original error still propagates; a reversal
    /// failure is only logged.
    pub(crate) async fn reverse_transfer(&self, transfer_id: Option<Uuid>) {
        let (Some(id), Some(service)) = (transfer_id, self.transfers.as_ref()) else {
            return;
        };
        if let Err(failure) = service.reverse(id).await {
            tracing::error!("failed to reverse linked transfer {id}: {}", failure.0);
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("transfers", &self.transfers.is_some())
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidMember(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.nfc().collect())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Ledger`.
pub struct LedgerBuilder {
    store: Arc<dyn LedgerStore>,
    auth: Arc<dyn AuthorizationCheck>,
    transfers: Option<Arc<dyn AccountTransferService>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl LedgerBuilder {
    /// Attach the optional account-transfer collaborator.
    #[must_use]
    pub fn transfers(mut self, transfers: Arc<dyn AccountTransferService>) -> LedgerBuilder {
        self.transfers = Some(transfers);
        self
    }

    /// Attach the optional notification sink.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> LedgerBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Ledger`.
    #[must_use]
    pub fn build(self) -> Ledger {
        Ledger {
            store: self.store,
            auth: self.auth,
            transfers: self.transfers,
            notifier: self.notifier,
        }
    }
}
