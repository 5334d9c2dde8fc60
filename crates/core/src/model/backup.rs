use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::ids::{AreaKey, PrefectureId, StoreId};
use crate::model::ledger::{Favorites, VisitLedger};

/// Version stamped into exported backups.
pub const APP_VERSION: &str = "1.0.0";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackupError {
    #[error("backup is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("backup contains no visited stores, favorite areas or favorite prefectures")]
    Empty,
}

/// Portable snapshot of the user's ledger and favorites.
///
/// Every list is optional on import so partial backups only replace what they
/// carry. `favorites` is accepted as the older name of `favoriteAreas`, and
/// favorite-area keys that do not parse are dropped rather than failing the
/// whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visited: Option<Vec<StoreId>>,
    #[serde(
        default,
        alias = "favorites",
        deserialize_with = "lenient_area_keys",
        skip_serializing_if = "Option::is_none"
    )]
    pub favorite_areas: Option<Vec<AreaKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_prefectures: Option<Vec<PrefectureId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn lenient_area_keys<'de, D>(deserializer: D) -> Result<Option<Vec<AreaKey>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Vec<String>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let keys = raw
        .into_iter()
        .filter_map(|key| match key.parse::<AreaKey>() {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "dropping unreadable favorite area");
                None
            }
        })
        .collect();
    Ok(Some(keys))
}

impl BackupDocument {
    /// Capture the full ledger and favorites.
    #[must_use]
    pub fn capture(ledger: &VisitLedger, favorites: &Favorites, at: DateTime<Utc>) -> Self {
        Self {
            visited: Some(ledger.iter().cloned().collect()),
            favorite_areas: Some(favorites.favorite_area_keys().to_vec()),
            favorite_prefectures: Some(favorites.favorite_prefectures().to_vec()),
            version: Some(APP_VERSION.to_string()),
            timestamp: Some(at),
        }
    }

    /// Parse and validate an exported document.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Json` for malformed input and `BackupError::Empty`
    /// when none of the three lists is present.
    pub fn from_json(json: &str) -> Result<Self, BackupError> {
        let document: Self = serde_json::from_str(json)?;
        if document.visited.is_none()
            && document.favorite_areas.is_none()
            && document.favorite_prefectures.is_none()
        {
            return Err(BackupError::Empty);
        }
        Ok(document)
    }

    /// Serialize as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, BackupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply the lists this document carries; absent lists are left untouched.
    pub fn apply(&self, ledger: &mut VisitLedger, favorites: &mut Favorites) {
        if let Some(visited) = &self.visited {
            *ledger = visited.iter().cloned().collect();
        }
        if let Some(areas) = &self.favorite_areas {
            favorites.set_areas(areas.iter().cloned());
        }
        if let Some(prefectures) = &self.favorite_prefectures {
            favorites.set_prefectures(prefectures.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::AreaId;
    use crate::time::fixed_now;

    #[test]
    fn capture_then_apply_restores_state() {
        let ledger: VisitLedger = ["s1", "s2"].into_iter().map(StoreId::new).collect();
        let favorites = Favorites::new(
            [PrefectureId::new("osaka")],
            [AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("shibuya"))],
        );
        let json = BackupDocument::capture(&ledger, &favorites, fixed_now())
            .to_json()
            .unwrap();

        let document = BackupDocument::from_json(&json).unwrap();
        let mut restored_ledger = VisitLedger::new();
        let mut restored_favorites = Favorites::default();
        document.apply(&mut restored_ledger, &mut restored_favorites);

        assert_eq!(restored_ledger, ledger);
        assert_eq!(restored_favorites, favorites);
        assert_eq!(document.version.as_deref(), Some(APP_VERSION));
    }

    #[test]
    fn accepts_legacy_favorites_key() {
        let document = BackupDocument::from_json(r#"{"favorites": ["kyoto_gion"]}"#).unwrap();
        assert_eq!(
            document.favorite_areas,
            Some(vec![AreaKey::new(PrefectureId::new("kyoto"), AreaId::new("gion"))])
        );
        assert!(document.visited.is_none());
    }

    #[test]
    fn unreadable_area_keys_do_not_sink_the_import() {
        let document = BackupDocument::from_json(
            r#"{"visited": ["o1", "o2"], "favoriteAreas": ["tokyo", "osaka_umeda", "_x"]}"#,
        )
        .unwrap();

        assert_eq!(
            document.visited,
            Some(vec![StoreId::new("o1"), StoreId::new("o2")])
        );
        assert_eq!(
            document.favorite_areas,
            Some(vec![AreaKey::new(PrefectureId::new("osaka"), AreaId::new("umeda"))])
        );
    }

    #[test]
    fn all_unreadable_area_keys_still_count_as_present() {
        let mut favorites = Favorites::new(
            Vec::<PrefectureId>::new(),
            [AreaKey::new(PrefectureId::new("kyoto"), AreaId::new("gion"))],
        );
        let mut ledger = VisitLedger::new();
        BackupDocument::from_json(r#"{"favoriteAreas": ["tokyo"]}"#)
            .unwrap()
            .apply(&mut ledger, &mut favorites);

        assert!(favorites.favorite_area_keys().is_empty());
    }

    #[test]
    fn partial_document_leaves_other_lists_alone() {
        let mut ledger: VisitLedger = [StoreId::new("keep")].into_iter().collect();
        let mut favorites = Favorites::new([PrefectureId::new("tokyo")], Vec::<AreaKey>::new());
        BackupDocument::from_json(r#"{"favoritePrefectures": ["osaka"]}"#)
            .unwrap()
            .apply(&mut ledger, &mut favorites);

        assert!(ledger.is_visited(&StoreId::new("keep")));
        assert_eq!(favorites.favorite_prefectures(), [PrefectureId::new("osaka")]);
    }

    #[test]
    fn rejects_document_without_lists() {
        let err = BackupDocument::from_json(r#"{"version": "1.0.0"}"#).unwrap_err();
        assert!(matches!(err, BackupError::Empty));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = BackupDocument::from_json("not json").unwrap_err();
        assert!(matches!(err, BackupError::Json(_)));
    }
}
