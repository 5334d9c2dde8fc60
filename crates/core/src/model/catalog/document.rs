//! Wire shape of the catalog JSON document.
//!
//! Two store layouts exist in the wild: the flat one
//! (`{id, name, address, prefectureId, areaId, coordinates}`) and an older
//! nested one (`{storeInfo: {...}, location: {...}}`). Both are resolved here
//! into the canonical [`Store`]; nothing past this module branches on layout.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::Deserialize;
use serde::de::{MapAccess, Visitor};

use super::CatalogError;
use super::types::{Area, Coordinates, Prefecture, Region, Store};
use crate::model::ids::{AreaId, PrefectureId, RegionId, StoreId};

/// JSON object read as an ordered list of entries.
pub(crate) struct Entries<T>(pub(crate) Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogDocument {
    pub(crate) regions: Entries<RegionDocument>,
    pub(crate) prefectures: Entries<PrefectureDocument>,
    pub(crate) stores: Vec<StoreDocument>,
    #[serde(default)]
    pub(crate) metadata: Option<MetadataDocument>,
    #[serde(default)]
    pub(crate) migration_support: Option<MigrationDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegionDocument {
    name: String,
    #[serde(alias = "prefectures", default)]
    prefecture_ids: Vec<String>,
}

#[derive(Deserialize)]
pub(crate) struct PrefectureDocument {
    name: String,
    #[serde(default)]
    areas: Entries<AreaDocument>,
}

#[derive(Deserialize)]
pub(crate) struct AreaDocument {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreDocument {
    id: Option<String>,
    name: Option<String>,
    address: Option<String>,
    #[serde(alias = "prefecture")]
    prefecture_id: Option<String>,
    #[serde(alias = "area")]
    area_id: Option<String>,
    coordinates: Option<serde_json::Value>,
    store_info: Option<StoreInfoDocument>,
    location: Option<LocationDocument>,
}

#[derive(Deserialize)]
pub(crate) struct StoreInfoDocument {
    id: Option<String>,
    name: Option<String>,
    branch: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LocationDocument {
    prefecture: Option<String>,
    area: Option<String>,
    address: Option<String>,
    coordinates: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CoordinatesDocument {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetadataDocument {
    #[serde(default)]
    data_version: Option<DataVersionDocument>,
}

#[derive(Deserialize)]
pub(crate) struct DataVersionDocument {
    current: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MigrationDocument {
    #[serde(default)]
    legacy_id_mapping: HashMap<String, LegacyIdDocument>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LegacyIdDocument {
    new_id: String,
}

impl RegionDocument {
    pub(crate) fn into_region(self, id: String) -> Region {
        Region::new(
            RegionId::new(id),
            self.name,
            self.prefecture_ids
                .into_iter()
                .map(PrefectureId::new)
                .collect(),
        )
    }
}

impl PrefectureDocument {
    pub(crate) fn into_prefecture(self, id: String) -> Prefecture {
        let areas = self
            .areas
            .0
            .into_iter()
            .map(|(area_id, area)| Area::new(AreaId::new(area_id), area.name))
            .collect();
        Prefecture::new(PrefectureId::new(id), self.name, areas)
    }
}

impl StoreDocument {
    /// Resolve either layout into a canonical store. `index` is the position
    /// in the `stores` list, used for error reporting when the id is missing.
    pub(crate) fn into_store(self, index: usize) -> Result<Store, CatalogError> {
        let info = self.store_info;
        let location = self.location;

        let id = info
            .as_ref()
            .and_then(|info| info.id.clone())
            .or(self.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(CatalogError::MissingStoreId { index })?;

        let name = info
            .as_ref()
            .and_then(|info| info.name.clone().or_else(|| info.branch.clone()))
            .or(self.name)
            .unwrap_or_else(|| id.clone());

        let address = location
            .as_ref()
            .and_then(|loc| loc.address.clone())
            .or_else(|| info.as_ref().and_then(|info| info.address.clone()))
            .or(self.address)
            .unwrap_or_default();

        let prefecture_id = location
            .as_ref()
            .and_then(|loc| loc.prefecture.clone())
            .or(self.prefecture_id)
            .ok_or_else(|| CatalogError::MissingStoreField {
                store: StoreId::new(id.clone()),
                field: "prefectureId",
            })?;

        let area_id = location
            .as_ref()
            .and_then(|loc| loc.area.clone())
            .or(self.area_id)
            .ok_or_else(|| CatalogError::MissingStoreField {
                store: StoreId::new(id.clone()),
                field: "areaId",
            })?;

        let raw_coordinates = location
            .and_then(|loc| loc.coordinates)
            .or(self.coordinates);
        let coordinates = raw_coordinates.and_then(|value| parse_coordinates(&id, value));

        Ok(Store::new(
            StoreId::new(id),
            name,
            address,
            PrefectureId::new(prefecture_id),
            AreaId::new(area_id),
            coordinates,
        ))
    }
}

fn parse_coordinates(store_id: &str, value: serde_json::Value) -> Option<Coordinates> {
    if value.is_null() {
        return None;
    }
    let parsed = serde_json::from_value::<CoordinatesDocument>(value)
        .ok()
        .and_then(|doc| Coordinates::new(doc.lat, doc.lng));
    if parsed.is_none() {
        tracing::debug!(store = store_id, "discarding invalid coordinates");
    }
    parsed
}

impl CatalogDocument {
    pub(crate) fn data_version(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.data_version.as_ref())
            .and_then(|version| version.current.clone())
    }

    pub(crate) fn take_legacy_ids(&mut self) -> HashMap<StoreId, StoreId> {
        self.migration_support
            .take()
            .map(|support| {
                support
                    .legacy_id_mapping
                    .into_iter()
                    .map(|(old, entry)| (StoreId::new(old), StoreId::new(entry.new_id)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
