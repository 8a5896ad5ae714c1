use super::money::Money;
use super::rental::{RentalId, numeric_id};
use crate::error::SettlementError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

numeric_id!(
    /// Identifier of a penalty catalog entry.
    PenaltyId
);
numeric_id!(
    /// Identifier of a charge assessed against a rental.
    RentalPenaltyId
);

/// A configured violation type and its standard fine.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Penalty {
    pub id: PenaltyId,
    /// Case-sensitive key, unique among active entries.
    pub violation_type: String,
    pub description: String,
    pub amount: Money,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyStatus {
    Pending,
    Settled,
    OffsetFromDeposit,
    Waived,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Gateway,
    Deposit,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "gateway" | "vnpay" => Ok(Self::Gateway),
            "deposit" => Ok(Self::Deposit),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

/// Part of a gateway order applied to a penalty.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct GatewayPayment {
    pub order_id: String,
    pub amount: Money,
}

/// A charge assessed against a specific rental.
///
/// `paid_amount + deposit_used_amount` never exceeds `amount`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RentalPenalty {
    pub id: RentalPenaltyId,
    pub rental_id: RentalId,
    pub penalty_id: PenaltyId,
    /// Charged amount; may differ from the catalog rate.
    pub amount: Money,
    pub description: String,
    pub status: PenaltyStatus,
    /// Cumulative cash and gateway payments.
    pub paid_amount: Money,
    /// Cumulative amount drawn from the rental's deposit.
    pub deposit_used_amount: Money,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Gateway orders applied so far; a callback is applied once per order.
    #[serde(default)]
    pub gateway_payments: Vec<GatewayPayment>,
}

impl RentalPenalty {
    pub fn new(
        id: RentalPenaltyId,
        rental_id: RentalId,
        penalty_id: PenaltyId,
        amount: Money,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rental_id,
            penalty_id,
            amount,
            description,
            status: PenaltyStatus::Pending,
            paid_amount: Money::ZERO,
            deposit_used_amount: Money::ZERO,
            payment_method: None,
            note: None,
            created_at,
            paid_at: None,
            gateway_payments: Vec::new(),
        }
    }

    pub fn outstanding(&self) -> Money {
        self.amount - self.paid_amount - self.deposit_used_amount
    }

    /// Errors unless the penalty can still take payments.
    pub fn ensure_payable(&self) -> Result<Money, SettlementError> {
        if self.status == PenaltyStatus::Waived {
            return Err(SettlementError::PenaltyWaived(self.id));
        }
        let outstanding = self.outstanding();
        if !outstanding.is_positive() {
            return Err(SettlementError::AlreadySettled(self.id));
        }
        Ok(outstanding)
    }

    /// Applies a deposit draw and a direct payment in one step.
    ///
    /// Rejects the whole application if it would exceed the outstanding
    /// balance; nothing is changed in that case.
    pub fn apply(
        &mut self,
        from_deposit: Money,
        direct: Money,
        method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<(), SettlementError> {
        let outstanding = self.ensure_payable()?;
        if from_deposit.is_negative() {
            return Err(SettlementError::InvalidAmount(from_deposit));
        }
        if direct.is_negative() {
            return Err(SettlementError::InvalidAmount(direct));
        }
        let offered = from_deposit + direct;
        if offered > outstanding {
            return Err(SettlementError::OverPayment {
                outstanding,
                offered,
            });
        }

        self.deposit_used_amount += from_deposit;
        self.paid_amount += direct;
        if direct.is_positive() {
            self.payment_method = Some(method);
        } else if from_deposit.is_positive() {
            self.payment_method = Some(PaymentMethod::Deposit);
        }

        if self.outstanding().is_zero() {
            self.paid_at = Some(at);
            self.status = if self.paid_amount.is_zero() {
                PenaltyStatus::OffsetFromDeposit
            } else {
                PenaltyStatus::Settled
            };
        }
        Ok(())
    }

    /// Amount already applied from gateway order `order_id`, if any.
    pub fn gateway_payment(&self, order_id: &str) -> Option<Money> {
        self.gateway_payments
            .iter()
            .find(|p| p.order_id == order_id)
            .map(|p| p.amount)
    }

    /// Forgives the charge. Only possible before anything was collected.
    pub fn waive(&mut self, reason: Option<String>) -> Result<(), SettlementError> {
        self.ensure_payable()?;
        if self.paid_amount.is_positive() || self.deposit_used_amount.is_positive() {
            return Err(SettlementError::PenaltyNotWaivable(self.id));
        }
        self.status = PenaltyStatus::Waived;
        if reason.is_some() {
            self.note = reason;
        }
        Ok(())
    }
}
