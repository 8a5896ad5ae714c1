use crate::domain::deposit::{DepositId, DepositStatus};
use crate::domain::money::Money;
use crate::domain::penalty::{PenaltyId, RentalPenaltyId};
use crate::domain::rental::{RentalId, RentalStatus};
use thiserror::Error;

/// Broad classes of failure, so the request layer can map errors to
/// user-visible responses without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before anything was touched.
    Validation,
    /// The record is in a state that forbids the operation.
    State,
    /// Not enough deposit funds; callers fall back to another payment method.
    Integrity,
    /// Missing or invalid gateway signature. Always fails closed.
    Security,
    NotFound,
    /// Storage or configuration failures.
    Internal,
}

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("invalid rental interval: end {end} is not after start {start}")]
    InvalidInterval {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },
    #[error("invalid daily rate: {0}")]
    InvalidRate(Money),
    #[error("invalid amount: {0}")]
    InvalidAmount(Money),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("violation type {0:?} already has an active catalog entry")]
    DuplicateViolationType(String),
    #[error("rental {0} already exists")]
    DuplicateRental(RentalId),
    #[error("rental {0} already has a deposit")]
    DuplicateDeposit(RentalId),
    #[error("payment order {0} already exists")]
    DuplicateOrder(String),

    #[error("deposit {id} is {status:?} and can no longer change")]
    DepositTerminal {
        id: DepositId,
        status: DepositStatus,
    },
    #[error("rental penalty {0} is already settled")]
    AlreadySettled(RentalPenaltyId),
    #[error("rental penalty {0} was waived")]
    PenaltyWaived(RentalPenaltyId),
    #[error("rental penalty {0} cannot be waived once payments were applied")]
    PenaltyNotWaivable(RentalPenaltyId),
    #[error("payment of {offered} exceeds outstanding balance {outstanding}")]
    OverPayment { outstanding: Money, offered: Money },
    #[error("rental {id} is {status:?}, cannot {action}")]
    InvalidRentalState {
        id: RentalId,
        status: RentalStatus,
        action: &'static str,
    },
    #[error("rental {0} is cancelled")]
    RentalCancelled(RentalId),
    #[error("penalty catalog entry {0} is inactive")]
    CatalogEntryInactive(PenaltyId),

    #[error("insufficient deposit: available {available}, requested {requested}")]
    InsufficientDeposit { available: Money, requested: Money },

    #[error("invalid gateway signature")]
    InvalidSignature,
    #[error("gateway amount {reported} does not match order amount {expected}")]
    AmountMismatch { expected: Money, reported: Money },

    #[error("rental {0} not found")]
    RentalNotFound(RentalId),
    #[error("deposit {0} not found")]
    DepositNotFound(DepositId),
    #[error("no deposit held for rental {0}")]
    NoDepositForRental(RentalId),
    #[error("penalty catalog entry {0} not found")]
    CatalogEntryNotFound(PenaltyId),
    #[error("rental penalty {0} not found")]
    PenaltyNotFound(RentalPenaltyId),
    #[error("payment order {0} not found")]
    OrderNotFound(String),

    #[error("malformed gateway callback: {0}")]
    MalformedCallback(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        use SettlementError::*;
        match self {
            InvalidInterval { .. }
            | InvalidRate(_)
            | InvalidAmount(_)
            | InvalidInput(_)
            | DuplicateViolationType(_)
            | DuplicateRental(_)
            | DuplicateDeposit(_)
            | DuplicateOrder(_)
            | MalformedCallback(_) => ErrorKind::Validation,
            DepositTerminal { .. }
            | AlreadySettled(_)
            | PenaltyWaived(_)
            | PenaltyNotWaivable(_)
            | OverPayment { .. }
            | InvalidRentalState { .. }
            | RentalCancelled(_)
            | CatalogEntryInactive(_) => ErrorKind::State,
            InsufficientDeposit { .. } => ErrorKind::Integrity,
            InvalidSignature | AmountMismatch { .. } => ErrorKind::Security,
            RentalNotFound(_)
            | DepositNotFound(_)
            | NoDepositForRental(_)
            | CatalogEntryNotFound(_)
            | PenaltyNotFound(_)
            | OrderNotFound(_) => ErrorKind::NotFound,
            Config(_) | Storage(_) | Csv(_) | Io(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kinds() {
        let insufficient = SettlementError::InsufficientDeposit {
            available: Money::new(dec!(10)),
            requested: Money::new(dec!(20)),
        };
        assert_eq!(insufficient.kind(), ErrorKind::Integrity);
        assert_eq!(
            SettlementError::InvalidSignature.kind(),
            ErrorKind::Security
        );
        assert_eq!(
            SettlementError::AlreadySettled(RentalPenaltyId(1)).kind(),
            ErrorKind::State
        );
        assert_eq!(
            SettlementError::RentalNotFound(RentalId(9)).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SettlementError::OverPayment {
            outstanding: Money::new(dec!(200000)),
            offered: Money::new(dec!(250000)),
        };
        assert_eq!(
            err.to_string(),
            "payment of 250000.00 exceeds outstanding balance 200000.00"
        );
    }
}
