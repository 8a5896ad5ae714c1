//! Narrow storage contracts the engine depends on.
//!
//! Each store is a keyed get/put; the application layer serializes writes to
//! a single record, so implementations need no transactional logic of their own.

use super::deposit::{Deposit, DepositId};
use super::payment::PaymentOrder;
use super::penalty::{Penalty, PenaltyId, RentalPenalty, RentalPenaltyId};
use super::rental::{Rental, RentalId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait RentalStore: Send + Sync {
    async fn store(&self, rental: Rental) -> Result<()>;
    async fn get(&self, id: RentalId) -> Result<Option<Rental>>;
    async fn get_all(&self) -> Result<Vec<Rental>>;
}

#[async_trait]
pub trait DepositStore: Send + Sync {
    async fn next_id(&self) -> Result<DepositId>;
    async fn store(&self, deposit: Deposit) -> Result<()>;
    async fn get(&self, id: DepositId) -> Result<Option<Deposit>>;
    async fn find_by_rental(&self, rental_id: RentalId) -> Result<Option<Deposit>>;
}

#[async_trait]
pub trait PenaltyCatalogStore: Send + Sync {
    async fn next_id(&self) -> Result<PenaltyId>;
    async fn store(&self, penalty: Penalty) -> Result<()>;
    async fn get(&self, id: PenaltyId) -> Result<Option<Penalty>>;
    async fn find_active(&self, violation_type: &str) -> Result<Option<Penalty>>;
}

#[async_trait]
pub trait RentalPenaltyStore: Send + Sync {
    async fn next_id(&self) -> Result<RentalPenaltyId>;
    async fn store(&self, penalty: RentalPenalty) -> Result<()>;
    async fn get(&self, id: RentalPenaltyId) -> Result<Option<RentalPenalty>>;
    /// All charges for a rental, oldest first.
    async fn list_for_rental(&self, rental_id: RentalId) -> Result<Vec<RentalPenalty>>;
}

#[async_trait]
pub trait PaymentOrderStore: Send + Sync {
    async fn store(&self, order: PaymentOrder) -> Result<()>;
    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>>;
}

/// Source of "now" for every timestamp the engine writes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type RentalStoreRef = Arc<dyn RentalStore>;
pub type DepositStoreRef = Arc<dyn DepositStore>;
pub type PenaltyCatalogStoreRef = Arc<dyn PenaltyCatalogStore>;
pub type RentalPenaltyStoreRef = Arc<dyn RentalPenaltyStore>;
pub type PaymentOrderStoreRef = Arc<dyn PaymentOrderStore>;
pub type ClockRef = Arc<dyn Clock>;

/// The full set of stores the engine is wired with.
#[derive(Clone)]
pub struct Stores {
    pub rentals: RentalStoreRef,
    pub deposits: DepositStoreRef,
    pub catalog: PenaltyCatalogStoreRef,
    pub penalties: RentalPenaltyStoreRef,
    pub orders: PaymentOrderStoreRef,
}
