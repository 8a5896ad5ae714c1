use super::locks::RecordLocks;
use crate::domain::deposit::{Deposit, DepositId};
use crate::domain::money::Money;
use crate::domain::ports::{ClockRef, DepositStoreRef};
use crate::domain::rental::{RentalId, UserId};
use crate::error::{Result, SettlementError};
use tracing::{debug, info, warn};

/// Outcome of a successful draw against a deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct DebitResult {
    /// The deposit as stored after the draw.
    pub deposit: Deposit,
    /// Amount actually drawn. Zero only for `debit_up_to` on an empty deposit.
    pub debited: Money,
}

/// Sole mutator of deposit balances.
///
/// Every mutation loads the deposit, validates and writes it back while
/// holding that deposit's lock, so concurrent draws can never both observe
/// the same available balance.
pub struct DepositLedger {
    deposits: DepositStoreRef,
    clock: ClockRef,
    locks: RecordLocks<DepositId>,
    openings: RecordLocks<RentalId>,
}

impl DepositLedger {
    pub fn new(deposits: DepositStoreRef, clock: ClockRef) -> Self {
        Self {
            deposits,
            clock,
            locks: RecordLocks::new(),
            openings: RecordLocks::new(),
        }
    }

    /// Creates a Held deposit for a rental whose deposit payment cleared.
    pub async fn open(
        &self,
        rental_id: RentalId,
        user_id: UserId,
        amount: Money,
    ) -> Result<Deposit> {
        self.open_with_ref(rental_id, user_id, amount, None).await
    }

    /// Opens the deposit paid by gateway order `order_id`.
    ///
    /// Repeating the call for the same order returns the deposit it already
    /// opened, so a redelivered callback cannot fail on its own earlier effect.
    pub async fn open_for_order(
        &self,
        rental_id: RentalId,
        user_id: UserId,
        amount: Money,
        order_id: &str,
    ) -> Result<Deposit> {
        self.open_with_ref(rental_id, user_id, amount, Some(order_id))
            .await
    }

    async fn open_with_ref(
        &self,
        rental_id: RentalId,
        user_id: UserId,
        amount: Money,
        payment_ref: Option<&str>,
    ) -> Result<Deposit> {
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let _guard = self.openings.lock(&rental_id).await;
        if let Some(existing) = self.deposits.find_by_rental(rental_id).await? {
            if payment_ref.is_some() && existing.payment_ref.as_deref() == payment_ref {
                debug!(
                    deposit = %existing.id,
                    rental = %rental_id,
                    "deposit already opened by this order"
                );
                return Ok(existing);
            }
            return Err(SettlementError::DuplicateDeposit(rental_id));
        }

        let id = self.deposits.next_id().await?;
        let mut deposit = Deposit::new(id, rental_id, user_id, amount, self.clock.now());
        deposit.payment_ref = payment_ref.map(str::to_string);
        self.deposits.store(deposit.clone()).await?;
        info!(deposit = %id, rental = %rental_id, %amount, "deposit opened");
        Ok(deposit)
    }

    pub async fn get(&self, id: DepositId) -> Result<Deposit> {
        self.deposits
            .get(id)
            .await?
            .ok_or(SettlementError::DepositNotFound(id))
    }

    pub async fn find_by_rental(&self, rental_id: RentalId) -> Result<Option<Deposit>> {
        self.deposits.find_by_rental(rental_id).await
    }

    /// Draws exactly `amount`, or nothing at all.
    pub async fn debit(&self, id: DepositId, amount: Money) -> Result<DebitResult> {
        let _guard = self.locks.lock(&id).await;
        let mut deposit = self.get(id).await?;
        if let Err(err) = deposit.debit(amount, self.clock.now()) {
            if matches!(err, SettlementError::InsufficientDeposit { .. }) {
                warn!(
                    deposit = %id,
                    %amount,
                    available = %deposit.available_amount(),
                    "deposit draw refused"
                );
            }
            return Err(err);
        }
        self.deposits.store(deposit.clone()).await?;
        info!(deposit = %id, %amount, available = %deposit.available_amount(), "deposit debited");
        Ok(DebitResult {
            deposit,
            debited: amount,
        })
    }

    /// Draws as much of `max` as the available balance allows.
    pub async fn debit_up_to(&self, id: DepositId, max: Money) -> Result<DebitResult> {
        let _guard = self.locks.lock(&id).await;
        let mut deposit = self.get(id).await?;
        let draw = max.min(deposit.available_amount());
        if !draw.is_positive() {
            if deposit.status.is_terminal() {
                return Err(SettlementError::DepositTerminal {
                    id,
                    status: deposit.status,
                });
            }
            debug!(deposit = %id, "nothing available to draw");
            return Ok(DebitResult {
                deposit,
                debited: Money::ZERO,
            });
        }
        deposit.debit(draw, self.clock.now())?;
        self.deposits.store(deposit.clone()).await?;
        info!(deposit = %id, amount = %draw, requested = %max, "deposit debited");
        Ok(DebitResult {
            deposit,
            debited: draw,
        })
    }

    /// Undoes a draw whose dependent write failed. Refused once the deposit
    /// is refunded or forfeited.
    pub(crate) async fn reverse_debit(&self, id: DepositId, amount: Money) -> Result<()> {
        let _guard = self.locks.lock(&id).await;
        let mut deposit = self.get(id).await?;
        deposit.reverse_debit(amount)?;
        self.deposits.store(deposit).await?;
        warn!(deposit = %id, %amount, "deposit draw reversed");
        Ok(())
    }

    /// Closes the deposit and releases the available balance to the customer.
    ///
    /// The payout itself is made by the caller; the ledger only records it.
    pub async fn refund(&self, id: DepositId, reason: Option<String>) -> Result<Deposit> {
        let _guard = self.locks.lock(&id).await;
        let mut deposit = self.get(id).await?;
        let released = deposit.refund(reason, self.clock.now())?;
        self.deposits.store(deposit.clone()).await?;
        info!(deposit = %id, amount = %released, "deposit refunded");
        Ok(deposit)
    }

    /// Closes the deposit and keeps the available balance.
    pub async fn forfeit(&self, id: DepositId, reason: impl Into<String>) -> Result<Deposit> {
        let _guard = self.locks.lock(&id).await;
        let mut deposit = self.get(id).await?;
        let kept = deposit.forfeit(reason.into(), self.clock.now())?;
        self.deposits.store(deposit.clone()).await?;
        info!(deposit = %id, amount = %kept, "deposit forfeited");
        Ok(deposit)
    }
}
