use serde::Serialize;

use crate::model::ids::{AreaId, PrefectureId, RegionId, StoreId};

/// Geographic position of a store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Build coordinates, returning `None` when either component is out of range.
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// One physical shop location, in its canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    id: StoreId,
    name: String,
    address: String,
    prefecture_id: PrefectureId,
    area_id: AreaId,
    coordinates: Option<Coordinates>,
}

impl Store {
    #[must_use]
    pub fn new(
        id: StoreId,
        name: impl Into<String>,
        address: impl Into<String>,
        prefecture_id: PrefectureId,
        area_id: AreaId,
        coordinates: Option<Coordinates>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            prefecture_id,
            area_id,
            coordinates,
        }
    }

    #[must_use]
    pub fn id(&self) -> &StoreId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn prefecture_id(&self) -> &PrefectureId {
        &self.prefecture_id
    }

    #[must_use]
    pub fn area_id(&self) -> &AreaId {
        &self.area_id
    }

    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }
}

/// A navigation bucket inside a prefecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Area {
    id: AreaId,
    name: String,
}

impl Area {
    #[must_use]
    pub fn new(id: AreaId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &AreaId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefecture {
    id: PrefectureId,
    name: String,
    areas: Vec<Area>,
}

impl Prefecture {
    #[must_use]
    pub fn new(id: PrefectureId, name: impl Into<String>, areas: Vec<Area>) -> Self {
        Self {
            id,
            name: name.into(),
            areas,
        }
    }

    #[must_use]
    pub fn id(&self) -> &PrefectureId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Areas in catalog order.
    #[must_use]
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    #[must_use]
    pub fn area(&self, id: &AreaId) -> Option<&Area> {
        self.areas.iter().find(|area| area.id() == id)
    }
}

/// Display grouping of prefectures (e.g. Kanto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    id: RegionId,
    name: String,
    prefecture_ids: Vec<PrefectureId>,
}

impl Region {
    #[must_use]
    pub fn new(id: RegionId, name: impl Into<String>, prefecture_ids: Vec<PrefectureId>) -> Self {
        Self {
            id,
            name: name.into(),
            prefecture_ids,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RegionId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn prefecture_ids(&self) -> &[PrefectureId] {
        &self.prefecture_ids
    }
}
