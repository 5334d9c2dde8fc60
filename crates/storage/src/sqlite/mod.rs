use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{FavoriteRepository, MetaRepository, Storage, VisitRepository};

mod favorite_repo;
mod mapping;
mod meta_repo;
mod migrate;
mod visit_repo;

/// Ledger, favorites and metadata kept in one `SQLite` database.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A CLI invocation rarely needs more than one writer and one reader.
const POOL_SIZE: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

impl SqliteRepository {
    /// Open the database at `database_url` and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the pool cannot connect, a connection
    /// pragma fails, or a schema migration fails.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_SIZE)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        tracing::debug!(url = database_url, "visit database ready");
        Ok(repo)
    }

    /// Apply any schema versions not yet recorded. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration query fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` whose three repositories share one `SQLite` pool.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        let visits: Arc<dyn VisitRepository> = Arc::new(repo.clone());
        let favorites: Arc<dyn FavoriteRepository> = Arc::new(repo.clone());
        let meta: Arc<dyn MetaRepository> = Arc::new(repo);
        Ok(Self {
            visits,
            favorites,
            meta,
        })
    }
}
