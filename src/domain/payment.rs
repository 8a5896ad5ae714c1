use super::money::Money;
use super::penalty::RentalPenaltyId;
use super::rental::RentalId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOrderStatus {
    Initiated,
    Success,
    Failed,
}

/// What a confirmed payment pays for.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentPurpose {
    /// Opens the rental's deposit.
    Deposit { rental_id: RentalId },
    /// Settles an assessed penalty.
    Penalty { rental_penalty_id: RentalPenaltyId },
    /// Rental fee; no ledger effect.
    RentalCharge { rental_id: RentalId },
}

/// An order sent to the payment gateway, keyed by the gateway's `vnp_TxnRef`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentOrder {
    pub order_id: String,
    pub purpose: PaymentPurpose,
    pub amount: Money,
    /// Address of the customer who initiated the payment.
    pub ip_address: String,
    pub status: PaymentOrderStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Gateway-side transaction number, once reported.
    pub gateway_transaction_no: Option<String>,
    /// Last response code reported by the gateway.
    pub response_code: Option<String>,
    /// Captured by the gateway but not applied, because the purpose no
    /// longer needed it. Owed back to the customer.
    #[serde(default)]
    pub excess_amount: Money,
}

impl PaymentOrder {
    pub fn is_final(&self) -> bool {
        self.status != PaymentOrderStatus::Initiated
    }
}
