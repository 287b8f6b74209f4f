//! Settlement operations.
//!
//! These are the only writers of `Participant.is_paid` and the only source
//! of `Payment` rows. Every operation reads the current paid-state and
//! writes the transition inside one store transaction, so two racing
//! settlements over the same pair serialize: the loser re-reads the settled
//! state and fails with a no-op error instead of corrupting totals.
//!
//! When a linked account transfer is requested, the transfer and the ledger
//! change succeed or fail as one unit: the transfer is requested after all
//! validation, and a ledger failure afterwards triggers a compensating
//! reversal.

use uuid::Uuid;

use crate::{
    LedgerError, LedgerEvent, LedgerOp, MarkPaidCmd, Participant, Payment, ResultLedger,
    SettleAllCmd, balance,
};

use super::{Ledger, with_tx};

impl Ledger {
    /// Transitions exactly one participant row from unpaid to paid and
    /// appends the Payment that closed it. Returns the payment id.
    pub async fn mark_participant_paid(&self, cmd: MarkPaidCmd) -> ResultLedger<Uuid> {
        let mut tx = self.store.begin().await?;

        let expense = tx.load_expense(cmd.expense_id).await?;
        if cmd.user_id == expense.payer_id {
            return Err(LedgerError::NothingToSettle(format!(
                "{} fronted this expense and owes themselves nothing",
                cmd.user_id
            )));
        }
        let mut row = expense
            .participant(&cmd.user_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("participant {}", cmd.user_id)))?;
        if row.is_paid {
            return Err(LedgerError::AlreadyPaid(format!(
                "{} already settled this share",
                cmd.user_id
            )));
        }
        self.authorize(
            LedgerOp::MarkPaid {
                expense_id: cmd.expense_id,
                debtor_id: cmd.user_id.clone(),
            },
            &cmd.acting_user,
        )
        .await?;

        let mut payment = Payment::new(
            expense.group_id,
            &cmd.user_id,
            &expense.payer_id,
            row.amount_owed,
            vec![expense.id],
            cmd.at,
        );

        let transfer_id = match &cmd.accounts {
            Some(accounts) => Some(self.request_transfer(accounts, row.amount_owed).await?),
            None => None,
        };
        payment.linked_transfer_id = transfer_id;

        row.is_paid = true;
        row.paid_at = Some(cmd.at);
        row.linked_payment_id = Some(payment.id);

        let payment_id = payment.id;
        let committed = async {
            tx.save_participant(&row, false).await?;
            tx.append_payment(&payment).await?;
            tx.commit().await
        }
        .await;

        match committed {
            Ok(()) => {
                self.notify(LedgerEvent::ParticipantPaid {
                    expense_id: cmd.expense_id,
                    user_id: cmd.user_id,
                    payment_id,
                });
                Ok(payment_id)
            }
            Err(err) => {
                self.reverse_transfer(transfer_id).await;
                Err(err)
            }
        }
    }

    /// Reverts a settled share to unpaid. Payer-only: the creditor forgives
    /// or corrects, the debtor cannot un-pay themselves.
    ///
    /// The Payment that closed the share is never deleted; the expense is
    /// removed from its closed set and the Payment is flagged `amended`,
    /// keeping the history independently auditable.
    pub async fn mark_participant_unpaid(
        &self,
        expense_id: Uuid,
        user_id: &str,
        acting_user: &str,
    ) -> ResultLedger<()> {
        with_tx!(self, |tx| {
            let expense = tx.load_expense(expense_id).await?;
            let mut row = expense
                .participant(user_id)
                .cloned()
                .ok_or_else(|| LedgerError::NotFound(format!("participant {user_id}")))?;
            if !row.is_paid {
                return Err(LedgerError::NotPaid(format!(
                    "{user_id} has not settled this share"
                )));
            }
            if acting_user != expense.payer_id {
                return Err(LedgerError::NotAuthorized(
                    "only the payer can revert a settled share".to_string(),
                ));
            }
            self.authorize(LedgerOp::MarkUnpaid { expense_id }, acting_user)
                .await?;

            let payment_id = row.linked_payment_id.take();
            row.is_paid = false;
            row.paid_at = None;
            tx.save_participant(&row, true).await?;

            if let Some(payment_id) = payment_id {
                let payment = tx.load_payment(payment_id).await?;
                let closed: Vec<Uuid> = payment
                    .closed_expense_ids
                    .iter()
                    .copied()
                    .filter(|id| *id != expense_id)
                    .collect();
                tx.update_payment_closed_set(payment_id, &closed, true)
                    .await?;
            }

            Ok(())
        })?;

        self.notify(LedgerEvent::ParticipantUnpaid {
            expense_id,
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    /// Settles the whole net position between two members.
    ///
    /// Recomputes the pair balance from current state, closes every unpaid
    /// row between the pair (both directions — afterwards the recomputed
    /// balance is zero, which is what makes an immediate second call fail
    /// `NothingToSettle` instead of double-charging), and records one
    /// Payment from the net debtor to the net creditor whose amount is the
    /// net actually settled, not the gross sum.
    pub async fn settle_all(&self, cmd: SettleAllCmd) -> ResultLedger<Payment> {
        if cmd.user_a == cmd.user_b {
            return Err(LedgerError::NothingToSettle(
                "cannot settle a member against themselves".to_string(),
            ));
        }
        self.authorize(
            LedgerOp::SettleAll {
                group_id: cmd.group_id,
            },
            &cmd.acting_user,
        )
        .await?;

        let mut tx = self.store.begin().await?;

        let group = tx.load_group(cmd.group_id).await?;
        for user in [&cmd.user_a, &cmd.user_b] {
            if !group.is_member(user) {
                return Err(LedgerError::NotFound(user.clone()));
            }
        }

        let expenses = tx.load_group_expenses(cmd.group_id).await?;
        let balances = balance::aggregate(&group, &expenses)?;
        let net = balances.net_between(&cmd.user_a, &cmd.user_b);
        if net.is_zero() {
            return Err(LedgerError::NothingToSettle(format!(
                "{} and {} are even",
                cmd.user_a, cmd.user_b
            )));
        }
        // net positive means user_b owes user_a.
        let (debtor, creditor) = if net.is_positive() {
            (cmd.user_b.clone(), cmd.user_a.clone())
        } else {
            (cmd.user_a.clone(), cmd.user_b.clone())
        };

        let mut rows: Vec<Participant> = Vec::new();
        for expense in &expenses {
            for row in &expense.participants {
                let between_pair = (expense.payer_id == creditor && row.user_id == debtor)
                    || (expense.payer_id == debtor && row.user_id == creditor);
                if between_pair && !row.is_paid && row.user_id != expense.payer_id {
                    rows.push(row.clone());
                }
            }
        }

        let mut payment = Payment::new(
            cmd.group_id,
            &debtor,
            &creditor,
            net.abs(),
            rows.iter().map(|row| row.expense_id).collect(),
            cmd.at,
        );

        let transfer_id = match &cmd.accounts {
            Some(accounts) => Some(self.request_transfer(accounts, net.abs()).await?),
            None => None,
        };
        payment.linked_transfer_id = transfer_id;

        for row in &mut rows {
            row.is_paid = true;
            row.paid_at = Some(cmd.at);
            row.linked_payment_id = Some(payment.id);
        }

        let committed = async {
            for row in &rows {
                tx.save_participant(row, false).await?;
            }
            tx.append_payment(&payment).await?;
            tx.commit().await
        }
        .await;

        match committed {
            Ok(()) => {
                self.notify(LedgerEvent::PairSettled {
                    group_id: cmd.group_id,
                    from_user_id: payment.from_user_id.clone(),
                    to_user_id: payment.to_user_id.clone(),
                    amount: payment.amount,
                    payment_id: payment.id,
                });
                Ok(payment)
            }
            Err(err) => {
                self.reverse_transfer(transfer_id).await;
                Err(err)
            }
        }
    }

}
