use super::ledger::DepositLedger;
use super::locks::RecordLocks;
use crate::domain::money::Money;
use crate::domain::penalty::{GatewayPayment, PaymentMethod, RentalPenalty, RentalPenaltyId};
use crate::domain::ports::{ClockRef, RentalPenaltyStoreRef};
use crate::domain::rental::RentalId;
use crate::error::{ErrorKind, Result, SettlementError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Sole mutator of a penalty's payment fields.
pub struct PenaltySettlement {
    penalties: RentalPenaltyStoreRef,
    ledger: Arc<DepositLedger>,
    clock: ClockRef,
    locks: RecordLocks<RentalPenaltyId>,
}

impl PenaltySettlement {
    pub fn new(
        penalties: RentalPenaltyStoreRef,
        ledger: Arc<DepositLedger>,
        clock: ClockRef,
    ) -> Self {
        Self {
            penalties,
            ledger,
            clock,
            locks: RecordLocks::new(),
        }
    }

    pub async fn get(&self, id: RentalPenaltyId) -> Result<RentalPenalty> {
        self.penalties
            .get(id)
            .await?
            .ok_or(SettlementError::PenaltyNotFound(id))
    }

    pub async fn list_for_rental(&self, rental_id: RentalId) -> Result<Vec<RentalPenalty>> {
        self.penalties.list_for_rental(rental_id).await
    }

    /// Applies `payment_amount` to an outstanding penalty.
    ///
    /// With `use_deposit` the deposit is drawn first, up to its available
    /// balance; whatever it cannot cover is recorded as a direct payment
    /// through `method`. A payment larger than the outstanding balance is
    /// rejected whole.
    pub async fn settle(
        &self,
        id: RentalPenaltyId,
        payment_amount: Money,
        method: PaymentMethod,
        use_deposit: bool,
        note: Option<String>,
    ) -> Result<RentalPenalty> {
        if !payment_amount.is_positive() {
            return Err(SettlementError::InvalidAmount(payment_amount));
        }
        let _guard = self.locks.lock(&id).await;
        let mut penalty = self.get(id).await?;
        let outstanding = penalty.ensure_payable()?;
        if payment_amount > outstanding {
            return Err(SettlementError::OverPayment {
                outstanding,
                offered: payment_amount,
            });
        }

        let mut draw = None;
        if use_deposit {
            match self.ledger.find_by_rental(penalty.rental_id).await? {
                Some(deposit) => match self.ledger.debit_up_to(deposit.id, payment_amount).await {
                    Ok(result) => {
                        if result.debited < payment_amount {
                            let err = SettlementError::InsufficientDeposit {
                                available: result.debited,
                                requested: payment_amount,
                            };
                            warn!(penalty = %id, error = %err, "remainder taken as direct payment");
                        }
                        if result.debited.is_positive() {
                            draw = Some((deposit.id, result.debited));
                        }
                    }
                    Err(err) if matches!(err.kind(), ErrorKind::State | ErrorKind::Integrity) => {
                        warn!(
                            penalty = %id,
                            error = %err,
                            "deposit not drawn, taking direct payment"
                        );
                    }
                    Err(err) => return Err(err),
                },
                None => warn!(penalty = %id, "no deposit for rental, taking direct payment"),
            }
        }

        let from_deposit = draw.map_or(Money::ZERO, |(_, debited)| debited);
        let direct = payment_amount - from_deposit;
        let stored = match penalty.apply(from_deposit, direct, method, self.clock.now()) {
            Ok(()) => {
                if note.is_some() {
                    penalty.note = note;
                }
                self.penalties.store(penalty.clone()).await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = stored {
            if let Some((deposit_id, debited)) = draw {
                // A deposit closed in the meantime keeps the draw; it needs
                // manual reconciliation and the write failure is still reported.
                if let Err(undo) = self.ledger.reverse_debit(deposit_id, debited).await {
                    error!(
                        penalty = %id,
                        deposit = %deposit_id,
                        amount = %debited,
                        error = %undo,
                        "deposit draw could not be reversed"
                    );
                }
            }
            return Err(err);
        }

        info!(
            penalty = %id,
            %from_deposit,
            %direct,
            outstanding = %penalty.outstanding(),
            status = ?penalty.status,
            "penalty payment applied"
        );
        Ok(penalty)
    }

    /// Records money the gateway captured for a penalty, once per order.
    ///
    /// The gateway has already taken the payment, so nothing here refuses
    /// it: whatever the penalty no longer needs (it was paid down, settled or
    /// waived after the order was sized) is returned as the excess owed back
    /// to the customer. Repeating the call for the same order changes nothing
    /// and returns the same excess.
    pub async fn settle_from_gateway(
        &self,
        id: RentalPenaltyId,
        amount: Money,
        order_id: &str,
    ) -> Result<Money> {
        let _guard = self.locks.lock(&id).await;
        let mut penalty = self.get(id).await?;
        if let Some(applied) = penalty.gateway_payment(order_id) {
            debug!(penalty = %id, order = %order_id, "gateway order already applied");
            return Ok(amount.saturating_sub(applied));
        }

        let applied = match penalty.ensure_payable() {
            Ok(outstanding) => amount.min(outstanding),
            Err(err) => {
                warn!(penalty = %id, order = %order_id, error = %err, "gateway payment not needed");
                Money::ZERO
            }
        };
        let excess = amount.saturating_sub(applied);
        if !applied.is_positive() {
            return Ok(excess);
        }

        penalty.apply(
            Money::ZERO,
            applied,
            PaymentMethod::Gateway,
            self.clock.now(),
        )?;
        penalty.gateway_payments.push(GatewayPayment {
            order_id: order_id.to_string(),
            amount: applied,
        });
        penalty.note = Some(format!("gateway order {order_id}"));
        self.penalties.store(penalty.clone()).await?;

        if excess.is_positive() {
            warn!(
                penalty = %id,
                order = %order_id,
                %applied,
                %excess,
                "gateway payment exceeded balance"
            );
        }
        info!(
            penalty = %id,
            order = %order_id,
            %applied,
            outstanding = %penalty.outstanding(),
            status = ?penalty.status,
            "gateway payment applied"
        );
        Ok(excess)
    }

    /// Forgives a penalty nothing has been collected against.
    pub async fn waive(
        &self,
        id: RentalPenaltyId,
        reason: Option<String>,
    ) -> Result<RentalPenalty> {
        let _guard = self.locks.lock(&id).await;
        let mut penalty = self.get(id).await?;
        penalty.waive(reason)?;
        self.penalties.store(penalty.clone()).await?;
        info!(penalty = %id, "penalty waived");
        Ok(penalty)
    }
}
