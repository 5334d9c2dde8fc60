use tour_core::model::{AreaKey, Favorites, PrefectureId};

use super::SqliteRepository;
use super::mapping::{conn, map_area_key_row, map_prefecture_row};
use crate::repository::{FavoriteRepository, StorageError};

#[async_trait::async_trait]
impl FavoriteRepository for SqliteRepository {
    async fn load_favorites(&self) -> Result<Favorites, StorageError> {
        let prefecture_rows =
            sqlx::query("SELECT prefecture_id FROM favorite_prefectures ORDER BY rowid ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
        let area_rows = sqlx::query("SELECT area_key FROM favorite_areas ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let prefectures = prefecture_rows
            .iter()
            .map(map_prefecture_row)
            .collect::<Result<Vec<_>, _>>()?;
        let areas = area_rows
            .iter()
            .map(map_area_key_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Favorites::new(prefectures, areas))
    }

    async fn set_favorite_prefecture(
        &self,
        prefecture_id: &PrefectureId,
        favorite: bool,
    ) -> Result<(), StorageError> {
        let query = if favorite {
            "INSERT INTO favorite_prefectures (prefecture_id) VALUES (?1) ON CONFLICT(prefecture_id) DO NOTHING"
        } else {
            "DELETE FROM favorite_prefectures WHERE prefecture_id = ?1"
        };
        sqlx::query(query)
            .bind(prefecture_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn set_favorite_area(&self, key: &AreaKey, favorite: bool) -> Result<(), StorageError> {
        let query = if favorite {
            "INSERT INTO favorite_areas (area_key) VALUES (?1) ON CONFLICT(area_key) DO NOTHING"
        } else {
            "DELETE FROM favorite_areas WHERE area_key = ?1"
        };
        sqlx::query(query)
            .bind(key.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn replace_favorites(&self, favorites: &Favorites) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM favorite_prefectures")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM favorite_areas")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for prefecture_id in favorites.favorite_prefectures() {
            sqlx::query("INSERT INTO favorite_prefectures (prefecture_id) VALUES (?1)")
                .bind(prefecture_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        for key in favorites.favorite_area_keys() {
            sqlx::query("INSERT INTO favorite_areas (area_key) VALUES (?1)")
                .bind(key.to_string())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
