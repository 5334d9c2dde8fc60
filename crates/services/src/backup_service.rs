use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::repository::{
    FavoriteRepository, META_APP_VERSION, META_LAST_UPDATE, MetaRepository, VisitRepository,
};
use tour_core::model::{BackupDocument, Favorites, VisitLedger};

use crate::Clock;
use crate::error::BackupServiceError;

/// What an import replaced. Counts are `None` for lists the document omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub visited: Option<usize>,
    pub favorite_areas: Option<usize>,
    pub favorite_prefectures: Option<usize>,
    pub version: Option<String>,
}

/// Counts and timestamps describing what is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub visited: usize,
    pub favorite_prefectures: usize,
    pub favorite_areas: usize,
    pub app_version: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub first_visit: Option<DateTime<Utc>>,
    pub latest_visit: Option<DateTime<Utc>>,
}

/// Exports, imports and clears the user's ledger and favorites.
#[derive(Clone)]
pub struct BackupService {
    clock: Clock,
    visits: Arc<dyn VisitRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    meta: Arc<dyn MetaRepository>,
}

impl BackupService {
    #[must_use]
    pub fn new(
        clock: Clock,
        visits: Arc<dyn VisitRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        meta: Arc<dyn MetaRepository>,
    ) -> Self {
        Self {
            clock,
            visits,
            favorites,
            meta,
        }
    }

    /// Serialize the full ledger and favorites as a pretty JSON backup.
    ///
    /// # Errors
    ///
    /// Returns `BackupServiceError::Storage` if repository access fails.
    /// Returns `BackupServiceError::Backup` if serialization fails.
    pub async fn export(&self) -> Result<String, BackupServiceError> {
        let ledger = self.visits.load_ledger().await?;
        let favorites = self.favorites.load_favorites().await?;
        let json = BackupDocument::capture(&ledger, &favorites, self.clock.now()).to_json()?;
        tracing::info!(visited = ledger.len(), "exported backup");
        Ok(json)
    }

    /// Replace state with the lists carried by `json`.
    ///
    /// Lists missing from the document are left as they are. The ledger, the
    /// favorites and the last-update marker are written in that order, each in
    /// its own transaction; a failure stops the sequence, so the marker only
    /// moves once both lists are stored.
    ///
    /// # Errors
    ///
    /// Returns `BackupServiceError::Backup` for malformed or empty documents;
    /// nothing is written in that case.
    /// Returns `BackupServiceError::Storage` if repository access fails.
    pub async fn import(&self, json: &str) -> Result<ImportOutcome, BackupServiceError> {
        let document = BackupDocument::from_json(json)?;

        let mut ledger = self.visits.load_ledger().await?;
        let mut favorites = self.favorites.load_favorites().await?;
        document.apply(&mut ledger, &mut favorites);

        let now = self.clock.now();
        if document.visited.is_some() {
            self.visits.replace_ledger(&ledger, now).await?;
        }
        if document.favorite_areas.is_some() || document.favorite_prefectures.is_some() {
            self.favorites.replace_favorites(&favorites).await?;
        }
        self.touch(now).await?;

        let outcome = ImportOutcome {
            visited: document.visited.as_ref().map(|_| ledger.len()),
            favorite_areas: document
                .favorite_areas
                .as_ref()
                .map(|_| favorites.favorite_area_keys().len()),
            favorite_prefectures: document
                .favorite_prefectures
                .as_ref()
                .map(|_| favorites.favorite_prefectures().len()),
            version: document.version,
        };
        tracing::info!(?outcome, "imported backup");
        Ok(outcome)
    }

    /// Drop every visit and favorite.
    ///
    /// # Errors
    ///
    /// Returns `BackupServiceError::Storage` if repository access fails.
    pub async fn clear_all(&self) -> Result<(), BackupServiceError> {
        let now = self.clock.now();
        self.visits.replace_ledger(&VisitLedger::new(), now).await?;
        self.favorites
            .replace_favorites(&Favorites::default())
            .await?;
        self.touch(now).await?;
        tracing::info!("cleared all visits and favorites");
        Ok(())
    }

    /// Summarize the stored ledger, favorites and bookkeeping metadata.
    ///
    /// # Errors
    ///
    /// Returns `BackupServiceError::Storage` if repository access fails.
    pub async fn info(&self) -> Result<StorageInfo, BackupServiceError> {
        let visits = self.visits.list_visits().await?;
        let favorites = self.favorites.load_favorites().await?;
        Ok(StorageInfo {
            visited: visits.len(),
            favorite_prefectures: favorites.favorite_prefectures().len(),
            favorite_areas: favorites.favorite_area_keys().len(),
            app_version: self.meta.get_meta(META_APP_VERSION).await?,
            last_update: self.last_update().await?,
            first_visit: visits.iter().map(|visit| visit.visited_at).min(),
            latest_visit: visits.iter().map(|visit| visit.visited_at).max(),
        })
    }

    /// When the last import or clear happened, if ever.
    ///
    /// An unparsable stored value reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns `BackupServiceError::Storage` if repository access fails.
    pub async fn last_update(&self) -> Result<Option<DateTime<Utc>>, BackupServiceError> {
        let raw = self.meta.get_meta(META_LAST_UPDATE).await?;
        Ok(raw.and_then(|value| match DateTime::parse_from_rfc3339(&value) {
            Ok(at) => Some(at.with_timezone(&Utc)),
            Err(err) => {
                tracing::warn!(%value, %err, "ignoring malformed last update timestamp");
                None
            }
        }))
    }

    async fn touch(&self, at: DateTime<Utc>) -> Result<(), BackupServiceError> {
        self.meta
            .set_meta(META_LAST_UPDATE, &at.to_rfc3339())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Duration;
    use storage::repository::{Storage, StorageError};
    use tour_core::model::{AreaKey, BackupError, PrefectureId, StoreId};
    use tour_core::time::{fixed_clock, fixed_now};

    fn service(storage: &Storage) -> BackupService {
        BackupService::new(
            fixed_clock(),
            Arc::clone(&storage.visits),
            Arc::clone(&storage.favorites),
            Arc::clone(&storage.meta),
        )
    }

    #[tokio::test]
    async fn export_then_import_restores_state() {
        let source = Storage::in_memory();
        source
            .visits
            .set_visited(&StoreId::new("s1"), true, fixed_now())
            .await
            .unwrap();
        source
            .favorites
            .set_favorite_prefecture(&PrefectureId::new("kyoto"), true)
            .await
            .unwrap();
        let json = service(&source).export().await.unwrap();

        let target = Storage::in_memory();
        let backup = service(&target);
        let outcome = backup.import(&json).await.unwrap();

        assert_eq!(outcome.visited, Some(1));
        assert_eq!(outcome.favorite_prefectures, Some(1));
        assert_eq!(outcome.favorite_areas, Some(0));
        assert_eq!(
            target.visits.load_ledger().await.unwrap(),
            source.visits.load_ledger().await.unwrap()
        );
        assert_eq!(backup.last_update().await.unwrap(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn rejected_import_writes_nothing() {
        let storage = Storage::in_memory();
        let backup = service(&storage);

        let err = backup.import(r#"{"version": "1.0.0"}"#).await.unwrap_err();
        assert!(matches!(err, BackupServiceError::Backup(BackupError::Empty)));
        assert!(backup.last_update().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_all_empties_everything() {
        let storage = Storage::in_memory();
        storage
            .visits
            .set_visited(&StoreId::new("s1"), true, fixed_now())
            .await
            .unwrap();
        let backup = service(&storage);
        backup.clear_all().await.unwrap();

        assert!(storage.visits.load_ledger().await.unwrap().is_empty());
        assert_eq!(
            storage.favorites.load_favorites().await.unwrap(),
            Favorites::default()
        );
        assert!(backup.last_update().await.unwrap().is_some());
    }

    struct RejectingFavorites;

    #[async_trait]
    impl FavoriteRepository for RejectingFavorites {
        async fn load_favorites(&self) -> Result<Favorites, StorageError> {
            Ok(Favorites::default())
        }

        async fn set_favorite_prefecture(
            &self,
            _prefecture_id: &PrefectureId,
            _favorite: bool,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }

        async fn set_favorite_area(
            &self,
            _key: &AreaKey,
            _favorite: bool,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }

        async fn replace_favorites(&self, _favorites: &Favorites) -> Result<(), StorageError> {
            Err(StorageError::Connection("read-only".into()))
        }
    }

    #[tokio::test]
    async fn failed_favorites_write_leaves_last_update_alone() {
        let storage = Storage::in_memory();
        let backup = BackupService::new(
            fixed_clock(),
            Arc::clone(&storage.visits),
            Arc::new(RejectingFavorites),
            Arc::clone(&storage.meta),
        );

        let err = backup
            .import(r#"{"visited": ["s1"], "favoritePrefectures": ["osaka"]}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, BackupServiceError::Storage(_)));
        assert!(backup.last_update().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn info_reports_counts_version_and_visit_span() {
        let storage = Storage::in_memory();
        storage.meta.set_meta(META_APP_VERSION, "1.0.0").await.unwrap();
        storage
            .visits
            .set_visited(&StoreId::new("s1"), true, fixed_now())
            .await
            .unwrap();
        storage
            .visits
            .set_visited(&StoreId::new("s2"), true, fixed_now() + Duration::days(3))
            .await
            .unwrap();
        storage
            .favorites
            .set_favorite_prefecture(&PrefectureId::new("kyoto"), true)
            .await
            .unwrap();
        let backup = service(&storage);

        let info = backup.info().await.unwrap();
        assert_eq!(info.visited, 2);
        assert_eq!(info.favorite_prefectures, 1);
        assert_eq!(info.favorite_areas, 0);
        assert_eq!(info.app_version.as_deref(), Some("1.0.0"));
        assert_eq!(info.first_visit, Some(fixed_now()));
        assert_eq!(info.latest_visit, Some(fixed_now() + Duration::days(3)));
        assert!(info.last_update.is_none());

        backup.clear_all().await.unwrap();
        let info = backup.info().await.unwrap();
        assert_eq!((info.visited, info.first_visit), (0, None));
        assert_eq!(info.last_update, Some(fixed_now()));
    }

    #[tokio::test]
    async fn malformed_last_update_reads_as_none() {
        let storage = Storage::in_memory();
        storage.meta.set_meta(META_LAST_UPDATE, "yesterday").await.unwrap();
        assert!(service(&storage).last_update().await.unwrap().is_none());
    }
}
