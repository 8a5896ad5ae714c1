use crate::domain::deposit::{Deposit, DepositId};
use crate::domain::payment::PaymentOrder;
use crate::domain::penalty::{Penalty, PenaltyId, RentalPenalty, RentalPenaltyId};
use crate::domain::ports::{
    DepositStore, PaymentOrderStore, PenaltyCatalogStore, RentalPenaltyStore, RentalStore, Stores,
};
use crate::domain::rental::{Rental, RentalId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Hands out increasing ids starting at 1, like a database identity column.
#[derive(Clone)]
struct Sequence(Arc<AtomicU64>);

impl Default for Sequence {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(1)))
    }
}

impl Sequence {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A thread-safe in-memory store for rentals.
///
/// Uses `Arc<RwLock<HashMap<..>>>` to allow shared concurrent access.
/// Ideal for testing, replaying command files, or embedding without a database.
#[derive(Default, Clone)]
pub struct InMemoryRentalStore {
    rentals: Arc<RwLock<HashMap<RentalId, Rental>>>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RentalStore for InMemoryRentalStore {
    async fn store(&self, rental: Rental) -> Result<()> {
        let mut rentals = self.rentals.write().await;
        rentals.insert(rental.id, rental);
        Ok(())
    }

    async fn get(&self, id: RentalId) -> Result<Option<Rental>> {
        let rentals = self.rentals.read().await;
        Ok(rentals.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Rental>> {
        let rentals = self.rentals.read().await;
        let mut all: Vec<Rental> = rentals.values().cloned().collect();
        all.sort_by_key(|r| r.id);
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDepositStore {
    deposits: Arc<RwLock<HashMap<DepositId, Deposit>>>,
    ids: Sequence,
}

impl InMemoryDepositStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn next_id(&self) -> Result<DepositId> {
        Ok(DepositId(self.ids.next()))
    }

    async fn store(&self, deposit: Deposit) -> Result<()> {
        let mut deposits = self.deposits.write().await;
        deposits.insert(deposit.id, deposit);
        Ok(())
    }

    async fn get(&self, id: DepositId) -> Result<Option<Deposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits.get(&id).cloned())
    }

    async fn find_by_rental(&self, rental_id: RentalId) -> Result<Option<Deposit>> {
        let deposits = self.deposits.read().await;
        let found = deposits.values().find(|d| d.rental_id == rental_id);
        Ok(found.cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPenaltyCatalogStore {
    entries: Arc<RwLock<HashMap<PenaltyId, Penalty>>>,
    ids: Sequence,
}

impl InMemoryPenaltyCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PenaltyCatalogStore for InMemoryPenaltyCatalogStore {
    async fn next_id(&self) -> Result<PenaltyId> {
        Ok(PenaltyId(self.ids.next()))
    }

    async fn store(&self, penalty: Penalty) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(penalty.id, penalty);
        Ok(())
    }

    async fn get(&self, id: PenaltyId) -> Result<Option<Penalty>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id).cloned())
    }

    async fn find_active(&self, violation_type: &str) -> Result<Option<Penalty>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|p| p.is_active && p.violation_type == violation_type)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRentalPenaltyStore {
    penalties: Arc<RwLock<HashMap<RentalPenaltyId, RentalPenalty>>>,
    ids: Sequence,
}

impl InMemoryRentalPenaltyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RentalPenaltyStore for InMemoryRentalPenaltyStore {
    async fn next_id(&self) -> Result<RentalPenaltyId> {
        Ok(RentalPenaltyId(self.ids.next()))
    }

    async fn store(&self, penalty: RentalPenalty) -> Result<()> {
        let mut penalties = self.penalties.write().await;
        penalties.insert(penalty.id, penalty);
        Ok(())
    }

    async fn get(&self, id: RentalPenaltyId) -> Result<Option<RentalPenalty>> {
        let penalties = self.penalties.read().await;
        Ok(penalties.get(&id).cloned())
    }

    async fn list_for_rental(&self, rental_id: RentalId) -> Result<Vec<RentalPenalty>> {
        let penalties = self.penalties.read().await;
        let mut found: Vec<RentalPenalty> = penalties
            .values()
            .filter(|p| p.rental_id == rental_id)
            .cloned()
            .collect();
        found.sort_by_key(|p| (p.created_at, p.id));
        Ok(found)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPaymentOrderStore {
    orders: Arc<RwLock<HashMap<String, PaymentOrder>>>,
}

impl InMemoryPaymentOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentOrderStore for InMemoryPaymentOrderStore {
    async fn store(&self, order: PaymentOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).cloned())
    }
}

impl Stores {
    /// Fresh, empty in-memory stores for every entity.
    pub fn in_memory() -> Self {
        Self {
            rentals: Arc::new(InMemoryRentalStore::new()),
            deposits: Arc::new(InMemoryDepositStore::new()),
            catalog: Arc::new(InMemoryPenaltyCatalogStore::new()),
            penalties: Arc::new(InMemoryRentalPenaltyStore::new()),
            orders: Arc::new(InMemoryPaymentOrderStore::new()),
        }
    }
}
