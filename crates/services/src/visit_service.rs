use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;
use storage::repository::VisitRepository;
use tour_core::model::{StoreCatalog, StoreId, VisitLedger};

use crate::Clock;
use crate::error::VisitServiceError;

/// Reads and mutates the visit ledger.
#[derive(Clone)]
pub struct VisitService {
    clock: Clock,
    visits: Arc<dyn VisitRepository>,
}

impl VisitService {
    #[must_use]
    pub fn new(clock: Clock, visits: Arc<dyn VisitRepository>) -> Self {
        Self { clock, visits }
    }

    /// Current ledger in the order stores were marked.
    ///
    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn visited(&self) -> Result<VisitLedger, VisitServiceError> {
        Ok(self.visits.load_ledger().await?)
    }

    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn is_visited(&self, store_id: &StoreId) -> Result<bool, VisitServiceError> {
        Ok(self.visits.load_ledger().await?.is_visited(store_id))
    }

    /// Flip the visited state of a store and return the new state.
    ///
    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn toggle(&self, store_id: &StoreId) -> Result<bool, VisitServiceError> {
        let visited = !self.is_visited(store_id).await?;
        self.visits
            .set_visited(store_id, visited, self.clock.now())
            .await?;
        tracing::debug!(store = %store_id, visited, "toggled visit");
        Ok(visited)
    }

    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn set_visited(
        &self,
        store_id: &StoreId,
        visited: bool,
    ) -> Result<(), VisitServiceError> {
        self.visits
            .set_visited(store_id, visited, self.clock.now())
            .await?;
        Ok(())
    }

    /// Rewrite retired store ids in the ledger using the catalog's legacy
    /// mapping. Returns how many entries changed; the ledger is only written
    /// back when something did.
    ///
    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn migrate_legacy_ids(
        &self,
        catalog: &StoreCatalog,
    ) -> Result<usize, VisitServiceError> {
        let mapping = catalog.legacy_id_mapping();
        if mapping.is_empty() {
            return Ok(0);
        }

        let mut ledger = self.visits.load_ledger().await?;
        let migrated = ledger.remap(mapping);
        if migrated > 0 {
            self.visits.replace_ledger(&ledger, self.clock.now()).await?;
            tracing::info!(migrated, "migrated legacy store ids");
        }
        Ok(migrated)
    }

    /// Mark up to `count` randomly chosen unvisited catalog stores as visited.
    /// Returns how many were marked.
    ///
    /// # Errors
    ///
    /// Returns `VisitServiceError::Storage` if repository access fails.
    pub async fn mark_random(
        &self,
        catalog: &StoreCatalog,
        count: usize,
    ) -> Result<usize, VisitServiceError> {
        let ledger = self.visits.load_ledger().await?;
        let mut candidates: Vec<&StoreId> = catalog
            .stores()
            .iter()
            .map(|store| store.id())
            .filter(|id| !ledger.is_visited(id))
            .collect();
        candidates.shuffle(&mut rng());
        candidates.truncate(count);

        let now = self.clock.now();
        for store_id in &candidates {
            self.visits.set_visited(store_id, true, now).await?;
        }
        tracing::info!(marked = candidates.len(), "marked random stores visited");
        Ok(candidates.len())
    }
}
