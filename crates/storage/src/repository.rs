use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tour_core::model::{AreaKey, Favorites, PrefectureId, StoreId, VisitLedger};

/// Metadata key holding the app version that last wrote the store.
pub const META_APP_VERSION: &str = "app_version";
/// Metadata key holding the RFC 3339 timestamp of the last bulk change.
pub const META_LAST_UPDATE: &str = "last_update";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for one visited store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub store_id: StoreId,
    pub visited_at: DateTime<Utc>,
}

/// Repository contract for the visit ledger.
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// List visits in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the visits cannot be read.
    async fn list_visits(&self) -> Result<Vec<VisitRecord>, StorageError>;

    /// Record or clear a visit. Marking an already-visited store keeps its
    /// original timestamp and position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the change cannot be stored.
    async fn set_visited(
        &self,
        store_id: &StoreId,
        visited: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Replace the whole ledger, stamping every entry with `at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be stored.
    async fn replace_ledger(
        &self,
        ledger: &VisitLedger,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Load the ledger as a set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the visits cannot be read.
    async fn load_ledger(&self) -> Result<VisitLedger, StorageError> {
        let visits = self.list_visits().await?;
        Ok(visits.into_iter().map(|visit| visit.store_id).collect())
    }
}

/// Repository contract for favorite prefectures and areas.
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if favorites cannot be read.
    async fn load_favorites(&self) -> Result<Favorites, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the change cannot be stored.
    async fn set_favorite_prefecture(
        &self,
        prefecture_id: &PrefectureId,
        favorite: bool,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the change cannot be stored.
    async fn set_favorite_area(&self, key: &AreaKey, favorite: bool) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if favorites cannot be stored.
    async fn replace_favorites(&self, favorites: &Favorites) -> Result<(), StorageError>;
}

/// Small key/value store for app-level metadata.
#[async_trait]
pub trait MetaRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be read.
    async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    visits: Arc<Mutex<Vec<VisitRecord>>>,
    favorites: Arc<Mutex<Favorites>>,
    meta: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl VisitRepository for InMemoryRepository {
    async fn list_visits(&self) -> Result<Vec<VisitRecord>, StorageError> {
        let guard = self.visits.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn set_visited(
        &self,
        store_id: &StoreId,
        visited: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.visits.lock().map_err(poisoned)?;
        let existing = guard.iter().position(|visit| &visit.store_id == store_id);
        match (visited, existing) {
            (true, None) => guard.push(VisitRecord {
                store_id: store_id.clone(),
                visited_at: at,
            }),
            (false, Some(idx)) => {
                guard.remove(idx);
            }
            _ => {}
        }
        Ok(())
    }

    async fn replace_ledger(
        &self,
        ledger: &VisitLedger,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.visits.lock().map_err(poisoned)?;
        *guard = ledger
            .iter()
            .map(|store_id| VisitRecord {
                store_id: store_id.clone(),
                visited_at: at,
            })
            .collect();
        Ok(())
    }
}

#[async_trait]
impl FavoriteRepository for InMemoryRepository {
    async fn load_favorites(&self) -> Result<Favorites, StorageError> {
        let guard = self.favorites.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    async fn set_favorite_prefecture(
        &self,
        prefecture_id: &PrefectureId,
        favorite: bool,
    ) -> Result<(), StorageError> {
        let mut guard = self.favorites.lock().map_err(poisoned)?;
        if guard.is_favorite_prefecture(prefecture_id) != favorite {
            guard.toggle_prefecture(prefecture_id.clone());
        }
        Ok(())
    }

    async fn set_favorite_area(&self, key: &AreaKey, favorite: bool) -> Result<(), StorageError> {
        let mut guard = self.favorites.lock().map_err(poisoned)?;
        if guard.is_favorite_area(key) != favorite {
            guard.toggle_area(key.clone());
        }
        Ok(())
    }

    async fn replace_favorites(&self, favorites: &Favorites) -> Result<(), StorageError> {
        let mut guard = self.favorites.lock().map_err(poisoned)?;
        *guard = favorites.clone();
        Ok(())
    }
}

#[async_trait]
impl MetaRepository for InMemoryRepository {
    async fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.meta.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.meta.lock().map_err(poisoned)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub visits: Arc<dyn VisitRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub meta: Arc<dyn MetaRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let visits: Arc<dyn VisitRepository> = Arc::new(repo.clone());
        let favorites: Arc<dyn FavoriteRepository> = Arc::new(repo.clone());
        let meta: Arc<dyn MetaRepository> = Arc::new(repo);
        Self {
            visits,
            favorites,
            meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tour_core::model::AreaId;
    use tour_core::time::fixed_now;

    #[tokio::test]
    async fn marking_twice_keeps_first_visit() {
        let repo = InMemoryRepository::new();
        let id = StoreId::new("s1");
        repo.set_visited(&id, true, fixed_now()).await.unwrap();
        repo.set_visited(&id, true, fixed_now() + chrono::Duration::days(1))
            .await
            .unwrap();

        let visits = repo.list_visits().await.unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].visited_at, fixed_now());
    }

    #[tokio::test]
    async fn unmark_removes_visit() {
        let repo = InMemoryRepository::new();
        let id = StoreId::new("s1");
        repo.set_visited(&id, true, fixed_now()).await.unwrap();
        repo.set_visited(&id, false, fixed_now()).await.unwrap();
        assert!(repo.load_ledger().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_ledger_keeps_order() {
        let repo = InMemoryRepository::new();
        let ledger: VisitLedger = ["b", "a"].into_iter().map(StoreId::new).collect();
        repo.replace_ledger(&ledger, fixed_now()).await.unwrap();
        assert_eq!(repo.load_ledger().await.unwrap(), ledger);
    }

    #[tokio::test]
    async fn favorites_set_is_idempotent() {
        let repo = InMemoryRepository::new();
        let key = AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("shibuya"));
        repo.set_favorite_area(&key, true).await.unwrap();
        repo.set_favorite_area(&key, true).await.unwrap();
        repo.set_favorite_prefecture(&PrefectureId::new("osaka"), true)
            .await
            .unwrap();

        let favorites = repo.load_favorites().await.unwrap();
        assert_eq!(favorites.favorite_area_keys(), [key]);
        assert_eq!(favorites.favorite_prefectures(), [PrefectureId::new("osaka")]);
    }

    #[tokio::test]
    async fn meta_round_trips() {
        let storage = Storage::in_memory();
        assert!(storage.meta.get_meta(META_APP_VERSION).await.unwrap().is_none());
        storage.meta.set_meta(META_APP_VERSION, "1.0.0").await.unwrap();
        assert_eq!(
            storage.meta.get_meta(META_APP_VERSION).await.unwrap().as_deref(),
            Some("1.0.0")
        );
    }
}
