use super::money::Money;
use super::rental::{RentalId, UserId, numeric_id};
use crate::error::SettlementError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

numeric_id!(DepositId);

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Held,
    PartiallyUsed,
    Refunded,
    Forfeited,
}

impl DepositStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded | Self::Forfeited)
    }
}

/// A refundable hold of funds against a single rental.
///
/// Only `amount` and `used_amount` are stored; the available balance is
/// always derived from them so the two can never drift apart.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Deposit {
    pub id: DepositId,
    pub rental_id: RentalId,
    pub user_id: UserId,
    /// Total reserved.
    pub amount: Money,
    /// Cumulative amount drawn against penalties.
    pub used_amount: Money,
    pub status: DepositStatus,
    pub payment_date: DateTime<Utc>,
    pub refund_date: Option<DateTime<Utc>>,
    /// Reason recorded on refund or forfeiture.
    pub refund_reason: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Gateway order that paid the deposit in, if it came through the gateway.
    #[serde(default)]
    pub payment_ref: Option<String>,
}

impl Deposit {
    pub fn new(
        id: DepositId,
        rental_id: RentalId,
        user_id: UserId,
        amount: Money,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            rental_id,
            user_id,
            amount,
            used_amount: Money::ZERO,
            status: DepositStatus::Held,
            payment_date: paid_at,
            refund_date: None,
            refund_reason: None,
            last_used_at: None,
            payment_ref: None,
        }
    }

    pub fn available_amount(&self) -> Money {
        self.amount.saturating_sub(self.used_amount)
    }

    fn ensure_open(&self) -> Result<(), SettlementError> {
        if self.status.is_terminal() {
            Err(SettlementError::DepositTerminal {
                id: self.id,
                status: self.status,
            })
        } else {
            Ok(())
        }
    }

    /// Draws `amount` from the available balance. All or nothing.
    pub fn debit(&mut self, amount: Money, at: DateTime<Utc>) -> Result<(), SettlementError> {
        self.ensure_open()?;
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let available = self.available_amount();
        if amount > available {
            return Err(SettlementError::InsufficientDeposit {
                available,
                requested: amount,
            });
        }
        self.used_amount += amount;
        self.last_used_at = Some(at);
        self.status = DepositStatus::PartiallyUsed;
        Ok(())
    }

    /// Gives back a draw whose follow-up write failed.
    ///
    /// A closed deposit keeps the balances it was closed with; the payout
    /// was computed from them.
    pub(crate) fn reverse_debit(&mut self, amount: Money) -> Result<(), SettlementError> {
        self.ensure_open()?;
        self.used_amount = self.used_amount.saturating_sub(amount);
        if self.used_amount.is_zero() && self.status == DepositStatus::PartiallyUsed {
            self.status = DepositStatus::Held;
        }
        Ok(())
    }

    /// Closes the deposit in the customer's favour and returns the amount owed back.
    pub fn refund(
        &mut self,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Money, SettlementError> {
        self.ensure_open()?;
        self.status = DepositStatus::Refunded;
        self.refund_date = Some(at);
        self.refund_reason = reason;
        Ok(self.available_amount())
    }

    /// Closes the deposit in the operator's favour and returns the amount kept.
    pub fn forfeit(&mut self, reason: String, at: DateTime<Utc>) -> Result<Money, SettlementError> {
        self.ensure_open()?;
        self.status = DepositStatus::Forfeited;
        self.refund_date = Some(at);
        self.refund_reason = Some(reason);
        Ok(self.available_amount())
    }
}
