use std::sync::Arc;

use storage::repository::{META_APP_VERSION, MetaRepository, Storage};
use tour_core::model::{APP_VERSION, StoreCatalog};

use crate::Clock;
use crate::backup_service::BackupService;
use crate::error::AppServicesError;
use crate::favorite_service::FavoriteService;
use crate::progress_service::ProgressService;
use crate::visit_service::VisitService;

/// Assembles app-facing services over one storage backend and catalog.
#[derive(Clone)]
pub struct AppServices {
    first_run: bool,
    catalog: Arc<StoreCatalog>,
    visits: Arc<VisitService>,
    favorites: Arc<FavoriteService>,
    progress: Arc<ProgressService>,
    backup: Arc<BackupService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or version bookkeeping fails.
    pub async fn new_sqlite(
        db_url: &str,
        catalog: Arc<StoreCatalog>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::new(storage, catalog, clock).await
    }

    /// Build services over an existing storage bundle.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the stored app version cannot be
    /// read or written.
    pub async fn new(
        storage: Storage,
        catalog: Arc<StoreCatalog>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let first_run = record_app_version(storage.meta.as_ref()).await?;

        let visits = Arc::new(VisitService::new(clock, Arc::clone(&storage.visits)));
        let favorites = Arc::new(FavoriteService::new(Arc::clone(&storage.favorites)));
        let progress = Arc::new(ProgressService::new(
            Arc::clone(&catalog),
            Arc::clone(&storage.visits),
            Arc::clone(&storage.favorites),
        ));
        let backup = Arc::new(BackupService::new(
            clock,
            Arc::clone(&storage.visits),
            Arc::clone(&storage.favorites),
            Arc::clone(&storage.meta),
        ));

        Ok(Self {
            first_run,
            catalog,
            visits,
            favorites,
            progress,
            backup,
        })
    }

    /// True when this storage had never recorded an app version before.
    #[must_use]
    pub fn first_run(&self) -> bool {
        self.first_run
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<StoreCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn visits(&self) -> Arc<VisitService> {
        Arc::clone(&self.visits)
    }

    #[must_use]
    pub fn favorites(&self) -> Arc<FavoriteService> {
        Arc::clone(&self.favorites)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn backup(&self) -> Arc<BackupService> {
        Arc::clone(&self.backup)
    }
}

async fn record_app_version(meta: &dyn MetaRepository) -> Result<bool, AppServicesError> {
    match meta.get_meta(META_APP_VERSION).await? {
        Some(stored) if stored == APP_VERSION => Ok(false),
        Some(stored) => {
            tracing::info!(from = %stored, to = APP_VERSION, "upgrading stored app version");
            meta.set_meta(META_APP_VERSION, APP_VERSION).await?;
            Ok(false)
        }
        None => {
            tracing::info!(version = APP_VERSION, "first run, recording app version");
            meta.set_meta(META_APP_VERSION, APP_VERSION).await?;
            Ok(true)
        }
    }
}
