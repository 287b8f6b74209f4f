use engine::{LedgerEvent, Notifier};

/// Fire-and-forget notifier that writes ledger events to the log.
///
/// Stands in for a real delivery channel; correctness never depends on it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &LedgerEvent) {
        match event {
            LedgerEvent::ExpenseCreated {
                group_id,
                expense_id,
                payer_id,
                total,
            } => {
                tracing::info!("expense {expense_id} created in {group_id}: {payer_id} fronted {total}");
            }
            LedgerEvent::ParticipantPaid {
                expense_id,
                user_id,
                payment_id,
            } => {
                tracing::info!("{user_id} settled their share of {expense_id} (payment {payment_id})");
            }
            LedgerEvent::ParticipantUnpaid {
                expense_id,
                user_id,
            } => {
                tracing::info!("{user_id}'s share of {expense_id} reverted to unpaid");
            }
            LedgerEvent::PairSettled {
                group_id,
                from_user_id,
                to_user_id,
                amount,
                payment_id,
            } => {
                tracing::info!(
                    "{from_user_id} settled {amount} to {to_user_id} in {group_id} (payment {payment_id})"
                );
            }
        }
    }
}
