//! Rental cost calculation.

use super::money::Money;
use crate::error::SettlementError;
use chrono::{DateTime, Utc};
use serde::Serialize;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct RentalQuote {
    pub days: u32,
    pub cost: Money,
}

/// Computes billable days and total cost for a rental interval.
///
/// Every started 24-hour period is billed as a full day, with a minimum of one.
pub fn calculate(
    daily_rate: Money,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<RentalQuote, SettlementError> {
    if end <= start {
        return Err(SettlementError::InvalidInterval { start, end });
    }
    if !daily_rate.is_positive() {
        return Err(SettlementError::InvalidRate(daily_rate));
    }

    let elapsed = (end - start).num_milliseconds();
    let days = (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    let days = u32::try_from(days.max(1))
        .map_err(|_| SettlementError::InvalidInterval { start, end })?;

    Ok(RentalQuote {
        days,
        cost: daily_rate.times(days),
    })
}
