use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tour_core::model::{AreaKey, PrefectureId, StoreId};

use crate::repository::{StorageError, VisitRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn non_empty(field: &'static str, raw: String) -> Result<String, StorageError> {
    if raw.trim().is_empty() {
        return Err(StorageError::Serialization(format!("empty {field}")));
    }
    Ok(raw)
}

pub(crate) fn map_visit_row(row: &SqliteRow) -> Result<VisitRecord, StorageError> {
    let store_id = non_empty("store_id", row.try_get("store_id").map_err(ser)?)?;
    Ok(VisitRecord {
        store_id: StoreId::new(store_id),
        visited_at: row.try_get("visited_at").map_err(ser)?,
    })
}

pub(crate) fn map_prefecture_row(row: &SqliteRow) -> Result<PrefectureId, StorageError> {
    let id = non_empty("prefecture_id", row.try_get("prefecture_id").map_err(ser)?)?;
    Ok(PrefectureId::new(id))
}

pub(crate) fn map_area_key_row(row: &SqliteRow) -> Result<AreaKey, StorageError> {
    let raw: String = row.try_get("area_key").map_err(ser)?;
    raw.parse::<AreaKey>()
        .map_err(|e| StorageError::Serialization(format!("{e}: {raw}")))
}
