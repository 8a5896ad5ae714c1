use super::locks::RecordLocks;
use crate::domain::money::Money;
use crate::domain::penalty::{Penalty, PenaltyId};
use crate::domain::ports::PenaltyCatalogStoreRef;
use crate::error::{Result, SettlementError};
use tracing::info;

/// Configured violation types and their standard fines.
pub struct PenaltyCatalog {
    catalog: PenaltyCatalogStoreRef,
    // Registration is keyed by violation type, not by id.
    registrations: RecordLocks<String>,
}

impl PenaltyCatalog {
    pub fn new(catalog: PenaltyCatalogStoreRef) -> Self {
        Self {
            catalog,
            registrations: RecordLocks::new(),
        }
    }

    pub async fn register(
        &self,
        violation_type: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
    ) -> Result<Penalty> {
        let violation_type = violation_type.into();
        if violation_type.trim().is_empty() {
            return Err(SettlementError::InvalidInput(
                "violation type must not be blank".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(SettlementError::InvalidAmount(amount));
        }

        let _guard = self.registrations.lock(&violation_type).await;
        if self.catalog.find_active(&violation_type).await?.is_some() {
            return Err(SettlementError::DuplicateViolationType(violation_type));
        }
        let penalty = Penalty {
            id: self.catalog.next_id().await?,
            violation_type,
            description: description.into(),
            amount,
            is_active: true,
        };
        self.catalog.store(penalty.clone()).await?;
        info!(
            penalty = %penalty.id,
            violation = %penalty.violation_type,
            amount = %penalty.amount,
            "catalog entry registered"
        );
        Ok(penalty)
    }

    /// Retires an entry so its violation type can be registered again.
    pub async fn deactivate(&self, id: PenaltyId) -> Result<Penalty> {
        let mut penalty = self.get(id).await?;
        let _guard = self.registrations.lock(&penalty.violation_type).await;
        penalty.is_active = false;
        self.catalog.store(penalty.clone()).await?;
        info!(penalty = %id, "catalog entry deactivated");
        Ok(penalty)
    }

    pub async fn get(&self, id: PenaltyId) -> Result<Penalty> {
        self.catalog
            .get(id)
            .await?
            .ok_or(SettlementError::CatalogEntryNotFound(id))
    }

    pub async fn find_active(&self, violation_type: &str) -> Result<Option<Penalty>> {
        self.catalog.find_active(violation_type).await
    }
}
