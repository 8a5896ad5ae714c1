use super::money::Money;
use crate::error::SettlementError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use numeric_id;

numeric_id!(
    /// Identifier of a rental, assigned by the booking system.
    RentalId
);
numeric_id!(UserId);
numeric_id!(StationId);

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A rental as seen by the settlement engine.
///
/// `daily_rate` is the vehicle price captured when the rental was booked, so
/// later catalog changes never alter the cost of an existing rental.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Rental {
    pub id: RentalId,
    /// Vehicle code (plate or fleet number).
    pub vehicle: String,
    pub customer: UserId,
    pub pickup_station: Option<StationId>,
    pub return_station: Option<StationId>,
    pub start_at: DateTime<Utc>,
    /// Planned end while Pending, `None` while Active, actual return once Completed.
    pub end_at: Option<DateTime<Utc>>,
    pub status: RentalStatus,
    pub daily_rate: Money,
    pub total_cost: Money,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    fn transition_error(&self, action: &'static str) -> SettlementError {
        SettlementError::InvalidRentalState {
            id: self.id,
            status: self.status,
            action,
        }
    }

    /// Vehicle handed to the customer: Pending -> Active.
    pub fn check_out(
        &mut self,
        at: DateTime<Utc>,
        station: Option<StationId>,
    ) -> Result<(), SettlementError> {
        if self.status != RentalStatus::Pending {
            return Err(self.transition_error("check out"));
        }
        self.status = RentalStatus::Active;
        self.start_at = at;
        self.end_at = None;
        if station.is_some() {
            self.pickup_station = station;
        }
        Ok(())
    }

    /// Vehicle returned: Active -> Completed with the final cost.
    pub fn check_in(
        &mut self,
        at: DateTime<Utc>,
        station: Option<StationId>,
        total_cost: Money,
    ) -> Result<(), SettlementError> {
        if self.status != RentalStatus::Active {
            return Err(self.transition_error("check in"));
        }
        self.status = RentalStatus::Completed;
        self.end_at = Some(at);
        self.return_station = station;
        self.total_cost = total_cost;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), SettlementError> {
        if self.status.is_terminal() {
            return Err(self.transition_error("cancel"));
        }
        self.status = RentalStatus::Cancelled;
        Ok(())
    }
}
