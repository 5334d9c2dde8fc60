//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tour_core::model::{BackupError, CatalogError};

/// Errors emitted while locating and parsing the store catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogSourceError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors emitted by `VisitService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VisitServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FavoriteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FavoriteServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BackupService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackupServiceError {
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
