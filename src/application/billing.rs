use crate::domain::deposit::DepositStatus;
use crate::domain::money::Money;
use crate::domain::penalty::{PenaltyStatus, RentalPenaltyId};
use crate::domain::ports::{DepositStoreRef, RentalPenaltyStoreRef, RentalStoreRef};
use crate::domain::rental::{RentalId, RentalStatus};
use crate::error::{Result, SettlementError};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PenaltyLine {
    pub id: RentalPenaltyId,
    pub description: String,
    pub amount: Money,
    pub status: PenaltyStatus,
    pub paid_amount: Money,
    pub deposit_used_amount: Money,
}

/// Financial statement for one rental.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RentalBill {
    pub rental_id: RentalId,
    pub status: RentalStatus,
    pub rental_cost: Money,
    /// Total reserved on the deposit, zero without one.
    pub deposit_amount: Money,
    /// Sum of every charge that was not waived.
    pub penalty_amount: Money,
    pub total_amount: Money,
    /// Still owed on non-waived penalties.
    pub outstanding_amount: Money,
    /// What goes back to the customer; `None` without an open deposit.
    pub refund_amount: Option<Money>,
    pub penalties: Vec<PenaltyLine>,
}

/// Read-only composition of rental, deposit and penalties.
pub struct BillAggregator {
    rentals: RentalStoreRef,
    deposits: DepositStoreRef,
    penalties: RentalPenaltyStoreRef,
}

impl BillAggregator {
    pub fn new(
        rentals: RentalStoreRef,
        deposits: DepositStoreRef,
        penalties: RentalPenaltyStoreRef,
    ) -> Self {
        Self {
            rentals,
            deposits,
            penalties,
        }
    }

    pub async fn build_bill(&self, rental_id: RentalId) -> Result<RentalBill> {
        let rental = self
            .rentals
            .get(rental_id)
            .await?
            .ok_or(SettlementError::RentalNotFound(rental_id))?;
        let deposit = self.deposits.find_by_rental(rental_id).await?;
        let charges = self.penalties.list_for_rental(rental_id).await?;

        let billable: Vec<_> = charges
            .iter()
            .filter(|p| p.status != PenaltyStatus::Waived)
            .collect();
        let penalty_amount: Money = billable.iter().map(|p| p.amount).sum();
        let outstanding_amount: Money = billable.iter().map(|p| p.outstanding()).sum();

        let deposit_amount = deposit.as_ref().map_or(Money::ZERO, |d| d.amount);
        let refund_amount = deposit
            .as_ref()
            .filter(|d| matches!(d.status, DepositStatus::Held | DepositStatus::PartiallyUsed))
            .map(|d| d.amount.saturating_sub(penalty_amount));

        Ok(RentalBill {
            rental_id,
            status: rental.status,
            rental_cost: rental.total_cost,
            deposit_amount,
            penalty_amount,
            total_amount: rental.total_cost + penalty_amount,
            outstanding_amount,
            refund_amount,
            penalties: charges
                .into_iter()
                .map(|p| PenaltyLine {
                    id: p.id,
                    description: p.description,
                    amount: p.amount,
                    status: p.status,
                    paid_amount: p.paid_amount,
                    deposit_used_amount: p.deposit_used_amount,
                })
                .collect(),
        })
    }
}
