use std::fmt;
use std::path::PathBuf;

use reqwest::Client;
use tour_core::model::StoreCatalog;
use url::Url;

use crate::error::CatalogSourceError;

/// Where the store catalog document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Url(Url),
}

impl CatalogSource {
    /// Interpret `raw` as an `http(s)://` URL or, failing that, a file path.
    ///
    /// # Errors
    ///
    /// Returns `CatalogSourceError::InvalidUrl` when `raw` has an http scheme
    /// but does not parse as a URL.
    pub fn parse(raw: &str) -> Result<Self, CatalogSourceError> {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Url(Url::parse(trimmed)?));
        }
        Ok(Self::File(PathBuf::from(trimmed)))
    }

    /// Fetch and parse the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogSourceError::Io` for unreadable files,
    /// `CatalogSourceError::Http`/`HttpStatus` for failed downloads and
    /// `CatalogSourceError::Catalog` when the document does not validate.
    pub async fn load(&self) -> Result<StoreCatalog, CatalogSourceError> {
        let json = match self {
            Self::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                CatalogSourceError::Io {
                    path: path.clone(),
                    source,
                }
            })?,
            Self::Url(url) => fetch(url).await?,
        };

        let catalog = StoreCatalog::from_json(&json)?;
        tracing::info!(
            source = %self,
            stores = catalog.stores().len(),
            prefectures = catalog.prefectures().len(),
            regions = catalog.regions().len(),
            version = catalog.data_version().unwrap_or("unversioned"),
            "store catalog loaded"
        );
        Ok(catalog)
    }
}

async fn fetch(url: &Url) -> Result<String, CatalogSourceError> {
    let response = Client::new().get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogSourceError::HttpStatus(status));
    }
    Ok(response.text().await?)
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}
