use super::locks::RecordLocks;
use crate::domain::money::Money;
use crate::domain::ports::{ClockRef, RentalStoreRef};
use crate::domain::pricing;
use crate::domain::rental::{Rental, RentalId, RentalStatus, StationId, UserId};
use crate::error::{Result, SettlementError};
use chrono::{DateTime, Utc};
use tracing::info;

/// A confirmed booking handed over by the reservation system.
#[derive(Debug, Clone)]
pub struct NewRental {
    pub id: RentalId,
    pub vehicle: String,
    pub customer: UserId,
    pub pickup_station: Option<StationId>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// The vehicle's current per-day price; captured on the rental.
    pub daily_rate: Money,
}

/// Rental status transitions that affect money: booking, check-out,
/// check-in and cancellation.
pub struct RentalService {
    rentals: RentalStoreRef,
    clock: ClockRef,
    locks: RecordLocks<RentalId>,
}

impl RentalService {
    pub fn new(rentals: RentalStoreRef, clock: ClockRef) -> Self {
        Self {
            rentals,
            clock,
            locks: RecordLocks::new(),
        }
    }

    pub async fn get(&self, id: RentalId) -> Result<Rental> {
        self.rentals
            .get(id)
            .await?
            .ok_or(SettlementError::RentalNotFound(id))
    }

    pub async fn all(&self) -> Result<Vec<Rental>> {
        self.rentals.get_all().await
    }

    /// Records a confirmed booking as Pending with its quoted total cost.
    pub async fn book(&self, request: NewRental) -> Result<Rental> {
        let quote = pricing::calculate(request.daily_rate, request.start_at, request.end_at)?;

        let _guard = self.locks.lock(&request.id).await;
        if self.rentals.get(request.id).await?.is_some() {
            return Err(SettlementError::DuplicateRental(request.id));
        }
        let rental = Rental {
            id: request.id,
            vehicle: request.vehicle,
            customer: request.customer,
            pickup_station: request.pickup_station,
            return_station: None,
            start_at: request.start_at,
            end_at: Some(request.end_at),
            status: RentalStatus::Pending,
            daily_rate: request.daily_rate,
            total_cost: quote.cost,
            created_at: self.clock.now(),
        };
        self.rentals.store(rental.clone()).await?;
        info!(rental = %rental.id, days = quote.days, cost = %quote.cost, "rental booked");
        Ok(rental)
    }

    /// Hands the vehicle over; the rental clock starts at `at` (now if `None`).
    pub async fn check_out(
        &self,
        id: RentalId,
        at: Option<DateTime<Utc>>,
        station: Option<StationId>,
    ) -> Result<Rental> {
        let _guard = self.locks.lock(&id).await;
        let mut rental = self.get(id).await?;
        rental.check_out(at.unwrap_or_else(|| self.clock.now()), station)?;
        self.rentals.store(rental.clone()).await?;
        info!(rental = %id, "rental checked out");
        Ok(rental)
    }

    /// Takes the vehicle back and bills the actual interval.
    pub async fn check_in(
        &self,
        id: RentalId,
        at: Option<DateTime<Utc>>,
        station: Option<StationId>,
    ) -> Result<Rental> {
        let _guard = self.locks.lock(&id).await;
        let mut rental = self.get(id).await?;
        if rental.status != RentalStatus::Active {
            return Err(SettlementError::InvalidRentalState {
                id,
                status: rental.status,
                action: "check in",
            });
        }
        let returned_at = at.unwrap_or_else(|| self.clock.now());
        let quote = pricing::calculate(rental.daily_rate, rental.start_at, returned_at)?;
        rental.check_in(returned_at, station, quote.cost)?;
        self.rentals.store(rental.clone()).await?;
        info!(rental = %id, days = quote.days, cost = %quote.cost, "rental completed");
        Ok(rental)
    }

    pub async fn cancel(&self, id: RentalId) -> Result<Rental> {
        let _guard = self.locks.lock(&id).await;
        let mut rental = self.get(id).await?;
        rental.cancel()?;
        self.rentals.store(rental.clone()).await?;
        info!(rental = %id, "rental cancelled");
        Ok(rental)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::ManualClock;
    use crate::infrastructure::in_memory::InMemoryRentalStore;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn service() -> (RentalService, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let service = RentalService::new(
            Arc::new(InMemoryRentalStore::new()),
            Arc::new(ManualClock::new(start)),
        );
        (service, start)
    }

    fn booking(start: DateTime<Utc>) -> NewRental {
        NewRental {
            id: RentalId(1),
            vehicle: "VF8-0001".to_string(),
            customer: UserId(5),
            pickup_station: Some(StationId(1)),
            start_at: start,
            end_at: start + Duration::days(2),
            daily_rate: Money::from_major(500_000),
        }
    }

    #[tokio::test]
    async fn test_book_quotes_total_cost() {
        let (service, start) = service();
        let rental = service.book(booking(start)).await.unwrap();
        assert_eq!(rental.status, RentalStatus::Pending);
        assert_eq!(rental.total_cost, Money::from_major(1_000_000));

        let duplicate = service.book(booking(start)).await;
        assert!(matches!(duplicate, Err(SettlementError::DuplicateRental(_))));
    }

    #[tokio::test]
    async fn test_book_rejects_bad_interval() {
        let (service, start) = service();
        let mut request = booking(start);
        request.end_at = start;
        assert!(matches!(
            service.book(request).await,
            Err(SettlementError::InvalidInterval { .. })
        ));
        assert!(service.get(RentalId(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_check_in_bills_actual_days() {
        let (service, start) = service();
        service.book(booking(start)).await.unwrap();
        service
            .check_out(RentalId(1), Some(start), None)
            .await
            .unwrap();

        let returned = start + Duration::days(3) + Duration::hours(2);
        let rental = service
            .check_in(RentalId(1), Some(returned), Some(StationId(4)))
            .await
            .unwrap();
        assert_eq!(rental.status, RentalStatus::Completed);
        assert_eq!(rental.total_cost, Money::from_major(2_000_000));
        assert_eq!(rental.return_station, Some(StationId(4)));
    }

    #[tokio::test]
    async fn test_cancelled_rental_cannot_check_out() {
        let (service, start) = service();
        service.book(booking(start)).await.unwrap();
        service.cancel(RentalId(1)).await.unwrap();
        assert!(matches!(
            service.check_out(RentalId(1), None, None).await,
            Err(SettlementError::InvalidRentalState { .. })
        ));
    }
}
