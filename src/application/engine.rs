use super::assessor::PenaltyAssessor;
use super::billing::{BillAggregator, RentalBill};
use super::catalog::PenaltyCatalog;
use super::ledger::DepositLedger;
use super::payments::PaymentGateway;
use super::rentals::RentalService;
use super::settlement::PenaltySettlement;
use crate::config::GatewayConfig;
use crate::domain::ports::{ClockRef, Stores};
use crate::error::Result;
use std::sync::Arc;

/// The main entry point of the settlement engine.
///
/// `SettlementEngine` wires every service over one set of stores and one
/// clock. It is cheap to share behind an `Arc`; all services take `&self`
/// and serialize per record internally, so request handlers can call it
/// concurrently.
pub struct SettlementEngine {
    rentals: RentalService,
    catalog: Arc<PenaltyCatalog>,
    ledger: Arc<DepositLedger>,
    assessor: PenaltyAssessor,
    settlement: Arc<PenaltySettlement>,
    billing: BillAggregator,
    payments: PaymentGateway,
}

impl SettlementEngine {
    /// Creates a new `SettlementEngine`.
    ///
    /// # Arguments
    ///
    /// * `stores` - Storage ports for every entity the engine reads or writes.
    /// * `clock` - Source of the timestamps written on records.
    /// * `gateway` - Merchant settings used to sign and verify gateway traffic.
    pub fn new(stores: Stores, clock: ClockRef, gateway: GatewayConfig) -> Self {
        let catalog = Arc::new(PenaltyCatalog::new(stores.catalog.clone()));
        let ledger = Arc::new(DepositLedger::new(stores.deposits.clone(), clock.clone()));
        let settlement = Arc::new(PenaltySettlement::new(
            stores.penalties.clone(),
            ledger.clone(),
            clock.clone(),
        ));
        let assessor = PenaltyAssessor::new(
            stores.rentals.clone(),
            stores.penalties.clone(),
            catalog.clone(),
            ledger.clone(),
            clock.clone(),
        );
        let billing = BillAggregator::new(
            stores.rentals.clone(),
            stores.deposits.clone(),
            stores.penalties.clone(),
        );
        let payments = PaymentGateway::new(
            stores.orders.clone(),
            stores.rentals.clone(),
            ledger.clone(),
            settlement.clone(),
            gateway,
            clock.clone(),
        );

        Self {
            rentals: RentalService::new(stores.rentals, clock),
            catalog,
            ledger,
            assessor,
            settlement,
            billing,
            payments,
        }
    }

    pub fn rentals(&self) -> &RentalService {
        &self.rentals
    }

    pub fn catalog(&self) -> &PenaltyCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &DepositLedger {
        &self.ledger
    }

    pub fn assessor(&self) -> &PenaltyAssessor {
        &self.assessor
    }

    pub fn settlement(&self) -> &PenaltySettlement {
        &self.settlement
    }

    pub fn billing(&self) -> &BillAggregator {
        &self.billing
    }

    pub fn payments(&self) -> &PaymentGateway {
        &self.payments
    }

    /// Bills for every known rental, ordered by rental id.
    pub async fn bills(&self) -> Result<Vec<RentalBill>> {
        let mut bills = Vec::new();
        for rental in self.rentals.all().await? {
            bills.push(self.billing.build_bill(rental.id).await?);
        }
        Ok(bills)
    }
}
