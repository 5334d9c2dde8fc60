mod backup;
pub mod catalog;
mod ids;
mod ledger;
pub mod prefectures;

pub use backup::{APP_VERSION, BackupDocument, BackupError};
pub use catalog::{
    Area, CatalogError, Coordinates, LegacyIdMapping, Prefecture, Region, Store, StoreCatalog,
};
pub use ids::{AreaId, AreaKey, ParseIdError, PrefectureId, RegionId, StoreId};
pub use ledger::{Favorites, VisitLedger};
pub use prefectures::{PREFECTURE_COUNT, PREFECTURE_IDS};
