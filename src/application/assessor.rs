use super::catalog::PenaltyCatalog;
use super::ledger::DepositLedger;
use crate::domain::money::Money;
use crate::domain::penalty::{PaymentMethod, PenaltyId, RentalPenalty};
use crate::domain::ports::{ClockRef, RentalPenaltyStoreRef, RentalStoreRef};
use crate::domain::rental::{RentalId, RentalStatus};
use crate::error::{ErrorKind, Result, SettlementError};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Creates charges against rentals, drawing on the deposit when asked to.
pub struct PenaltyAssessor {
    rentals: RentalStoreRef,
    penalties: RentalPenaltyStoreRef,
    catalog: Arc<PenaltyCatalog>,
    ledger: Arc<DepositLedger>,
    clock: ClockRef,
}

impl PenaltyAssessor {
    pub fn new(
        rentals: RentalStoreRef,
        penalties: RentalPenaltyStoreRef,
        catalog: Arc<PenaltyCatalog>,
        ledger: Arc<DepositLedger>,
        clock: ClockRef,
    ) -> Self {
        Self {
            rentals,
            penalties,
            catalog,
            ledger,
            clock,
        }
    }

    /// Assesses a charge of `amount` for the catalog violation `penalty_id`.
    ///
    /// With `use_deposit_first`, as much of the charge as the deposit can cover
    /// is drawn immediately. A short or empty deposit never fails the
    /// assessment; the remainder simply stays outstanding.
    pub async fn assess(
        &self,
        rental_id: RentalId,
        penalty_id: PenaltyId,
        amount: Money,
        description: impl Into<String>,
        use_deposit_first: bool,
    ) -> Result<RentalPenalty> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let rental = self
            .rentals
            .get(rental_id)
            .await?
            .ok_or(SettlementError::RentalNotFound(rental_id))?;
        if rental.status == RentalStatus::Cancelled {
            return Err(SettlementError::RentalCancelled(rental_id));
        }
        let entry = self.catalog.get(penalty_id).await?;
        if !entry.is_active {
            return Err(SettlementError::CatalogEntryInactive(penalty_id));
        }

        let mut description = description.into();
        if description.trim().is_empty() {
            description = entry.description.clone();
        }
        let now = self.clock.now();
        let mut penalty = RentalPenalty::new(
            self.penalties.next_id().await?,
            rental_id,
            penalty_id,
            amount,
            description,
            now,
        );

        let mut draw = None;
        if use_deposit_first
            && let Some(deposit) = self.ledger.find_by_rental(rental_id).await?
        {
            match self.ledger.debit_up_to(deposit.id, amount).await {
                Ok(result) if result.debited.is_positive() => {
                    penalty.apply(result.debited, Money::ZERO, PaymentMethod::Deposit, now)?;
                    draw = Some((deposit.id, result.debited));
                }
                Ok(_) => {}
                Err(err) if matches!(err.kind(), ErrorKind::State | ErrorKind::Integrity) => {
                    warn!(rental = %rental_id, error = %err, "deposit not drawn for penalty");
                }
                Err(err) => return Err(err),
            }
        }

        if let Err(err) = self.penalties.store(penalty.clone()).await {
            if let Some((deposit_id, debited)) = draw {
                // A deposit closed in the meantime keeps the draw; it needs
                // manual reconciliation and the write failure is still reported.
                if let Err(undo) = self.ledger.reverse_debit(deposit_id, debited).await {
                    error!(
                        rental = %rental_id,
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
            penalty = %penalty.id,
            rental = %rental_id,
            %amount,
            from_deposit = %penalty.deposit_used_amount,
            status = ?penalty.status,
            "penalty assessed"
        );
        Ok(penalty)
    }
}
