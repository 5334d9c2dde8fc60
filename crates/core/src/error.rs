use thiserror::Error;

use crate::model::{BackupError, CatalogError, ParseIdError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
}
