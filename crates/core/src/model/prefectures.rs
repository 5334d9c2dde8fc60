//! The fixed universe of Japanese prefectures.

use crate::model::ids::PrefectureId;

/// Number of prefectures; the divisor for prefecture completion.
pub const PREFECTURE_COUNT: u32 = 47;

/// Romanized prefecture ids in JIS X 0401 order.
pub const PREFECTURE_IDS: [&str; PREFECTURE_COUNT as usize] = [
    "hokkaido", "aomori", "iwate", "miyagi", "akita", "yamagata", "fukushima",
    "ibaraki", "tochigi", "gunma", "saitama", "chiba", "tokyo", "kanagawa",
    "niigata", "toyama", "ishikawa", "fukui", "yamanashi", "nagano",
    "gifu", "shizuoka", "aichi", "mie",
    "shiga", "kyoto", "osaka", "hyogo", "nara", "wakayama",
    "tottori", "shimane", "okayama", "hiroshima", "yamaguchi",
    "tokushima", "kagawa", "ehime", "kochi",
    "fukuoka", "saga", "nagasaki", "kumamoto", "oita", "miyazaki", "kagoshima", "okinawa",
];

/// Returns true if the id names one of the 47 prefectures.
#[must_use]
pub fn is_known_prefecture(id: &PrefectureId) -> bool {
    PREFECTURE_IDS.contains(&id.as_str())
}
