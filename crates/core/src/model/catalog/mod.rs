mod document;
mod types;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::model::ids::{AreaId, PrefectureId, RegionId, StoreId};
use crate::model::prefectures::is_known_prefecture;

use document::CatalogDocument;
pub use types::{Area, Coordinates, Prefecture, Region, Store};

/// Maps retired store ids to their replacements.
pub type LegacyIdMapping = HashMap<StoreId, StoreId>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("malformed catalog document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("store at index {index} has no id")]
    MissingStoreId { index: usize },

    #[error("store {store} is missing `{field}`")]
    MissingStoreField { store: StoreId, field: &'static str },

    #[error("duplicate store id: {0}")]
    DuplicateStore(StoreId),

    #[error("duplicate prefecture id: {0}")]
    DuplicatePrefecture(PrefectureId),

    #[error("unknown prefecture id: {0}")]
    UnknownPrefecture(PrefectureId),

    #[error("region {region} references prefecture {prefecture} missing from the catalog")]
    RegionReferencesUnknownPrefecture {
        region: RegionId,
        prefecture: PrefectureId,
    },

    #[error("prefecture {0} belongs to more than one region")]
    DuplicateRegionMembership(PrefectureId),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Immutable tree of regions → prefectures → areas, plus the flat store list.
///
/// Loaded once per session. Construction validates the structural invariants
/// the progress calculator relies on; store-level foreign keys that point
/// nowhere are tolerated (such stores only count toward overall progress).
#[derive(Debug, Clone)]
pub struct StoreCatalog {
    regions: Vec<Region>,
    prefectures: Vec<Prefecture>,
    prefecture_index: HashMap<PrefectureId, usize>,
    stores: Vec<Store>,
    store_index: HashMap<StoreId, usize>,
    data_version: Option<String>,
    legacy_ids: LegacyIdMapping,
}

impl StoreCatalog {
    /// Build a validated catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a prefecture id is outside the fixed set or
    /// repeated, if a region references a prefecture the catalog lacks, if a
    /// prefecture is claimed by two regions, or if store ids collide.
    pub fn new(
        regions: Vec<Region>,
        prefectures: Vec<Prefecture>,
        stores: Vec<Store>,
    ) -> Result<Self, CatalogError> {
        let mut prefecture_index = HashMap::with_capacity(prefectures.len());
        for (idx, prefecture) in prefectures.iter().enumerate() {
            if !is_known_prefecture(prefecture.id()) {
                return Err(CatalogError::UnknownPrefecture(prefecture.id().clone()));
            }
            if prefecture_index.insert(prefecture.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicatePrefecture(prefecture.id().clone()));
            }
        }

        let mut claimed: HashSet<&PrefectureId> = HashSet::new();
        for region in &regions {
            for prefecture_id in region.prefecture_ids() {
                if !prefecture_index.contains_key(prefecture_id) {
                    return Err(CatalogError::RegionReferencesUnknownPrefecture {
                        region: region.id().clone(),
                        prefecture: prefecture_id.clone(),
                    });
                }
                if !claimed.insert(prefecture_id) {
                    return Err(CatalogError::DuplicateRegionMembership(prefecture_id.clone()));
                }
            }
        }
        for prefecture in &prefectures {
            if !claimed.contains(prefecture.id()) {
                tracing::warn!(prefecture = %prefecture.id(), "prefecture belongs to no region");
            }
        }

        let mut store_index = HashMap::with_capacity(stores.len());
        for (idx, store) in stores.iter().enumerate() {
            if store_index.insert(store.id().clone(), idx).is_some() {
                return Err(CatalogError::DuplicateStore(store.id().clone()));
            }
            match prefecture_index.get(store.prefecture_id()) {
                None => tracing::warn!(
                    store = %store.id(),
                    prefecture = %store.prefecture_id(),
                    "store references a prefecture missing from the catalog"
                ),
                Some(&p) if prefectures[p].area(store.area_id()).is_none() => tracing::warn!(
                    store = %store.id(),
                    area = %store.area_id(),
                    "store references an area missing from its prefecture"
                ),
                Some(_) => {}
            }
        }

        Ok(Self {
            regions,
            prefectures,
            prefecture_index,
            stores,
            store_index,
            data_version: None,
            legacy_ids: HashMap::new(),
        })
    }

    /// Parse and validate a catalog JSON document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` if the document is not valid JSON or lacks
    /// `regions`, `prefectures` or `stores`, and any validation error from
    /// [`StoreCatalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let mut document: CatalogDocument = serde_json::from_str(json)?;
        let data_version = document.data_version();
        let legacy_ids = document.take_legacy_ids();

        let regions = document
            .regions
            .0
            .into_iter()
            .map(|(id, region)| region.into_region(id))
            .collect();
        let prefectures = document
            .prefectures
            .0
            .into_iter()
            .map(|(id, prefecture)| prefecture.into_prefecture(id))
            .collect();
        let stores = document
            .stores
            .into_iter()
            .enumerate()
            .map(|(index, store)| store.into_store(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut catalog = Self::new(regions, prefectures, stores)?;
        catalog.data_version = data_version;
        catalog.legacy_ids = legacy_ids;
        Ok(catalog)
    }

    /// Regions in declaration order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Prefectures in declaration order.
    #[must_use]
    pub fn prefectures(&self) -> &[Prefecture] {
        &self.prefectures
    }

    #[must_use]
    pub fn prefecture(&self, id: &PrefectureId) -> Option<&Prefecture> {
        self.prefecture_index
            .get(id)
            .map(|&idx| &self.prefectures[idx])
    }

    #[must_use]
    pub fn area(&self, prefecture_id: &PrefectureId, area_id: &AreaId) -> Option<&Area> {
        self.prefecture(prefecture_id)
            .and_then(|prefecture| prefecture.area(area_id))
    }

    #[must_use]
    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    #[must_use]
    pub fn store(&self, id: &StoreId) -> Option<&Store> {
        self.store_index.get(id).map(|&idx| &self.stores[idx])
    }

    #[must_use]
    pub fn contains_store(&self, id: &StoreId) -> bool {
        self.store_index.contains_key(id)
    }

    /// Stores whose area is one of the prefecture's declared areas. A store
    /// naming an unknown area belongs to no prefecture.
    pub fn stores_in_prefecture<'a>(
        &'a self,
        prefecture_id: &'a PrefectureId,
    ) -> impl Iterator<Item = &'a Store> + 'a {
        let prefecture = self.prefecture(prefecture_id);
        self.stores.iter().filter(move |store| {
            store.prefecture_id() == prefecture_id
                && prefecture.is_some_and(|p| p.area(store.area_id()).is_some())
        })
    }

    pub fn stores_in_area<'a>(
        &'a self,
        prefecture_id: &'a PrefectureId,
        area_id: &'a AreaId,
    ) -> impl Iterator<Item = &'a Store> + 'a {
        self.stores_in_prefecture(prefecture_id)
            .filter(move |store| store.area_id() == area_id)
    }

    #[must_use]
    pub fn data_version(&self) -> Option<&str> {
        self.data_version.as_deref()
    }

    #[must_use]
    pub fn legacy_id_mapping(&self) -> &LegacyIdMapping {
        &self.legacy_ids
    }
}
