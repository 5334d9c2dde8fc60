use std::sync::Arc;

use storage::repository::FavoriteRepository;
use tour_core::model::{AreaKey, Favorites, PrefectureId};

use crate::error::FavoriteServiceError;

/// Reads and toggles favorite prefectures and areas.
#[derive(Clone)]
pub struct FavoriteService {
    favorites: Arc<dyn FavoriteRepository>,
}

impl FavoriteService {
    #[must_use]
    pub fn new(favorites: Arc<dyn FavoriteRepository>) -> Self {
        Self { favorites }
    }

    /// # Errors
    ///
    /// Returns `FavoriteServiceError::Storage` if repository access fails.
    pub async fn favorites(&self) -> Result<Favorites, FavoriteServiceError> {
        Ok(self.favorites.load_favorites().await?)
    }

    /// Returns the new favorite state.
    ///
    /// # Errors
    ///
    /// Returns `FavoriteServiceError::Storage` if repository access fails.
    pub async fn toggle_prefecture(
        &self,
        prefecture_id: &PrefectureId,
    ) -> Result<bool, FavoriteServiceError> {
        let favorite = !self
            .favorites
            .load_favorites()
            .await?
            .is_favorite_prefecture(prefecture_id);
        self.favorites
            .set_favorite_prefecture(prefecture_id, favorite)
            .await?;
        tracing::debug!(prefecture = %prefecture_id, favorite, "toggled favorite prefecture");
        Ok(favorite)
    }

    /// Returns the new favorite state.
    ///
    /// # Errors
    ///
    /// Returns `FavoriteServiceError::Storage` if repository access fails.
    pub async fn toggle_area(&self, key: &AreaKey) -> Result<bool, FavoriteServiceError> {
        let favorite = !self.favorites.load_favorites().await?.is_favorite_area(key);
        self.favorites.set_favorite_area(key, favorite).await?;
        tracing::debug!(area = %key, favorite, "toggled favorite area");
        Ok(favorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::Storage;
    use tour_core::model::AreaId;

    #[tokio::test]
    async fn toggles_keep_insertion_order() {
        let service = FavoriteService::new(Storage::in_memory().favorites);
        let kyoto = PrefectureId::new("kyoto");
        let osaka = PrefectureId::new("osaka");

        assert!(service.toggle_prefecture(&kyoto).await.unwrap());
        assert!(service.toggle_prefecture(&osaka).await.unwrap());
        assert_eq!(
            service.favorites().await.unwrap().favorite_prefectures(),
            [kyoto.clone(), osaka.clone()]
        );

        assert!(!service.toggle_prefecture(&kyoto).await.unwrap());
        assert_eq!(
            service.favorites().await.unwrap().favorite_prefectures(),
            [osaka]
        );
    }

    #[tokio::test]
    async fn area_toggle_round_trips() {
        let service = FavoriteService::new(Storage::in_memory().favorites);
        let key = AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("shibuya"));
        assert!(service.toggle_area(&key).await.unwrap());
        assert!(service.favorites().await.unwrap().is_favorite_area(&key));
        assert!(!service.toggle_area(&key).await.unwrap());
        assert!(service.favorites().await.unwrap().favorite_area_keys().is_empty());
    }
}
