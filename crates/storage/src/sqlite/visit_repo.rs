use chrono::{DateTime, Utc};
use tour_core::model::{StoreId, VisitLedger};

use super::SqliteRepository;
use super::mapping::{conn, map_visit_row};
use crate::repository::{StorageError, VisitRecord, VisitRepository};

#[async_trait::async_trait]
impl VisitRepository for SqliteRepository {
    async fn list_visits(&self) -> Result<Vec<VisitRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT store_id, visited_at
            FROM visited_stores
            ORDER BY rowid ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_visit_row).collect()
    }

    async fn set_visited(
        &self,
        store_id: &StoreId,
        visited: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if visited {
            sqlx::query(
                r"
                INSERT INTO visited_stores (store_id, visited_at)
                VALUES (?1, ?2)
                ON CONFLICT(store_id) DO NOTHING
                ",
            )
            .bind(store_id.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        } else {
            sqlx::query("DELETE FROM visited_stores WHERE store_id = ?1")
                .bind(store_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(conn)?;
        }
        Ok(())
    }

    async fn replace_ledger(
        &self,
        ledger: &VisitLedger,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM visited_stores")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for store_id in ledger.iter() {
            sqlx::query(
                r"
                INSERT INTO visited_stores (store_id, visited_at)
                VALUES (?1, ?2)
                ",
            )
            .bind(store_id.as_str())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
