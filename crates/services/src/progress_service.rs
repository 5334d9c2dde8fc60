use std::sync::Arc;

use storage::repository::{FavoriteRepository, VisitRepository};
use tour_core::model::{Favorites, StoreCatalog, VisitLedger};
use tour_core::progress::{AchievementsSummary, ProgressCalculator};

use crate::error::ProgressServiceError;

/// One consistent read of the user's state, paired with the catalog.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    catalog: Arc<StoreCatalog>,
    ledger: VisitLedger,
    favorites: Favorites,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(catalog: Arc<StoreCatalog>, ledger: VisitLedger, favorites: Favorites) -> Self {
        Self {
            catalog,
            ledger,
            favorites,
        }
    }

    /// Calculator answering every progress query against this snapshot.
    #[must_use]
    pub fn calculator(&self) -> ProgressCalculator<'_> {
        ProgressCalculator::new(&self.catalog, &self.ledger, &self.favorites)
    }

    #[must_use]
    pub fn catalog(&self) -> &StoreCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn ledger(&self) -> &VisitLedger {
        &self.ledger
    }

    #[must_use]
    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }
}

/// Builds progress snapshots from the repositories.
#[derive(Clone)]
pub struct ProgressService {
    catalog: Arc<StoreCatalog>,
    visits: Arc<dyn VisitRepository>,
    favorites: Arc<dyn FavoriteRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        catalog: Arc<StoreCatalog>,
        visits: Arc<dyn VisitRepository>,
        favorites: Arc<dyn FavoriteRepository>,
    ) -> Self {
        Self {
            catalog,
            visits,
            favorites,
        }
    }

    /// Read the ledger and favorites once.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot, ProgressServiceError> {
        let ledger = self.visits.load_ledger().await?;
        let favorites = self.favorites.load_favorites().await?;
        tracing::debug!(
            visited = ledger.len(),
            favorite_prefectures = favorites.favorite_prefectures().len(),
            favorite_areas = favorites.favorite_area_keys().len(),
            "progress snapshot"
        );
        Ok(ProgressSnapshot::new(
            Arc::clone(&self.catalog),
            ledger,
            favorites,
        ))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn achievements(&self) -> Result<AchievementsSummary, ProgressServiceError> {
        let snapshot = self.snapshot().await?;
        Ok(snapshot.calculator().achievements_summary())
    }
}
