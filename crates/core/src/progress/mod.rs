//! Completion statistics over a store catalog and a visit ledger.
//!
//! Everything here is recomputed from scratch on each call: callers re-run a
//! query after mutating the ledger instead of relying on cached results.

mod badge;
mod calculator;

use serde::Serialize;

use crate::model::{PrefectureId, RegionId};

pub use badge::{Badge, VisitCountBadge, VisitTier};
pub use calculator::ProgressCalculator;

/// Round-half-up percentage of `part / whole`, computed in integers.
///
/// Returns 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    let rounded = (part * 200 + whole) / (whole * 2);
    // part <= whole keeps this within 0..=100
    u8::try_from(rounded).unwrap_or(100)
}

/// Visited/total counts with derived percentage and badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    visited: u32,
    total: u32,
    percentage: u8,
    badge: Badge,
}

impl Progress {
    pub const ZERO: Self = Self {
        visited: 0,
        total: 0,
        percentage: 0,
        badge: Badge::None,
    };

    #[must_use]
    pub fn new(visited: u32, total: u32) -> Self {
        let percentage = percentage(visited, total);
        Self {
            visited,
            total,
            percentage,
            badge: Badge::for_percentage(percentage),
        }
    }

    #[must_use]
    pub fn visited(&self) -> u32 {
        self.visited
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn badge(&self) -> Badge {
        self.badge
    }
}

/// Progress of one region, summed over its prefectures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionProgress {
    pub id: RegionId,
    pub name: String,
    pub prefecture_ids: Vec<PrefectureId>,
    #[serde(flatten)]
    pub progress: Progress,
}

/// Progress entry for a favorite prefecture or area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedProgress {
    /// Prefecture id, or the `prefecture_area` key for areas.
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub progress: Progress,
}

/// How many of the 47 prefectures are fully visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionProgress {
    pub completed: u32,
    pub total: u32,
    pub percentage: u8,
    pub badge: Badge,
}

impl CompletionProgress {
    #[must_use]
    pub fn new(completed: u32, total: u32) -> Self {
        let percentage = percentage(completed, total);
        Self {
            completed,
            total,
            percentage,
            badge: Badge::for_percentage(percentage),
        }
    }
}

/// Per-prefecture entry for choropleth-style display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefectureMapEntry {
    pub id: PrefectureId,
    pub name: String,
    #[serde(flatten)]
    pub progress: Progress,
    /// 0 for untouched, 1 for complete, otherwise at least 0.1.
    pub fill_opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsSummary {
    pub overall: Progress,
    pub prefecture_completion: CompletionProgress,
    pub visit_count_badge: VisitCountBadge,
    pub favorite_prefectures: Vec<NamedProgress>,
    pub favorite_areas: Vec<NamedProgress>,
    pub regional: Vec<RegionProgress>,
}
