#![forbid(unsafe_code)]

pub mod app_services;
pub mod backup_service;
pub mod catalog_source;
pub mod error;
pub mod favorite_service;
pub mod progress_service;
pub mod visit_service;

pub use tour_core::Clock;

pub use app_services::AppServices;
pub use backup_service::{BackupService, ImportOutcome, StorageInfo};
pub use catalog_source::CatalogSource;
pub use error::{
    AppServicesError, BackupServiceError, CatalogSourceError, FavoriteServiceError,
    ProgressServiceError, VisitServiceError,
};
pub use favorite_service::FavoriteService;
pub use progress_service::{ProgressService, ProgressSnapshot};
pub use visit_service::VisitService;
