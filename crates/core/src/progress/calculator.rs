use crate::model::prefectures::PREFECTURE_COUNT;
use crate::model::{AreaId, AreaKey, Favorites, PrefectureId, Store, StoreCatalog, VisitLedger};

use super::{
    AchievementsSummary, CompletionProgress, NamedProgress, PrefectureMapEntry, Progress,
    RegionProgress, VisitCountBadge,
};

const UNKNOWN_PREFECTURE: &str = "Unknown Prefecture";
const UNKNOWN_AREA: &str = "Unknown Area";
const REPORT_FAVORITE_AREAS: usize = 3;

/// Read-only view combining a catalog with one snapshot of the user's state.
///
/// Lookups with ids the catalog does not know resolve to [`Progress::ZERO`];
/// none of these methods fail.
#[derive(Debug, Clone, Copy)]
pub struct ProgressCalculator<'a> {
    catalog: &'a StoreCatalog,
    ledger: &'a VisitLedger,
    favorites: &'a Favorites,
}

impl<'a> ProgressCalculator<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a StoreCatalog,
        ledger: &'a VisitLedger,
        favorites: &'a Favorites,
    ) -> Self {
        Self {
            catalog,
            ledger,
            favorites,
        }
    }

    fn tally<'s>(&self, stores: impl Iterator<Item = &'s Store>) -> Progress {
        let (visited, total) = stores.fold((0u32, 0u32), |(visited, total), store| {
            let hit = u32::from(self.ledger.is_visited(store.id()));
            (visited.saturating_add(hit), total.saturating_add(1))
        });
        Progress::new(visited, total)
    }

    /// Ledger entries that no longer name a catalog store are not counted.
    #[must_use]
    pub fn overall_progress(&self) -> Progress {
        self.tally(self.catalog.stores().iter())
    }

    #[must_use]
    pub fn prefecture_progress(&self, prefecture_id: &PrefectureId) -> Progress {
        if self.catalog.prefecture(prefecture_id).is_none() {
            return Progress::ZERO;
        }
        self.tally(self.catalog.stores_in_prefecture(prefecture_id))
    }

    #[must_use]
    pub fn area_progress(&self, prefecture_id: &PrefectureId, area_id: &AreaId) -> Progress {
        if self.catalog.area(prefecture_id, area_id).is_none() {
            return Progress::ZERO;
        }
        self.tally(self.catalog.stores_in_area(prefecture_id, area_id))
    }

    /// One entry per region, in declaration order.
    #[must_use]
    pub fn regional_progress(&self) -> Vec<RegionProgress> {
        self.catalog
            .regions()
            .iter()
            .map(|region| {
                let (visited, total) = region.prefecture_ids().iter().fold(
                    (0u32, 0u32),
                    |(visited, total), prefecture_id| {
                        let progress = self.prefecture_progress(prefecture_id);
                        (
                            visited.saturating_add(progress.visited()),
                            total.saturating_add(progress.total()),
                        )
                    },
                );
                RegionProgress {
                    id: region.id().clone(),
                    name: region.name().to_string(),
                    prefecture_ids: region.prefecture_ids().to_vec(),
                    progress: Progress::new(visited, total),
                }
            })
            .collect()
    }

    /// Prefectures at 100%, out of the fixed 47.
    #[must_use]
    pub fn prefecture_completion_progress(&self) -> CompletionProgress {
        let completed = self
            .catalog
            .prefectures()
            .iter()
            .filter(|prefecture| self.prefecture_progress(prefecture.id()).percentage() == 100)
            .count();
        CompletionProgress::new(
            u32::try_from(completed).unwrap_or(PREFECTURE_COUNT),
            PREFECTURE_COUNT,
        )
    }

    #[must_use]
    pub fn favorite_prefectures_progress(&self) -> Vec<NamedProgress> {
        self.favorites
            .favorite_prefectures()
            .iter()
            .map(|prefecture_id| NamedProgress {
                key: prefecture_id.to_string(),
                name: self.prefecture_name(prefecture_id).to_string(),
                progress: self.prefecture_progress(prefecture_id),
            })
            .collect()
    }

    #[must_use]
    pub fn favorite_areas_progress(&self) -> Vec<NamedProgress> {
        self.favorites
            .favorite_area_keys()
            .iter()
            .map(|key: &AreaKey| NamedProgress {
                key: key.to_string(),
                name: self.area_name(key.prefecture_id(), key.area_id()),
                progress: self.area_progress(key.prefecture_id(), key.area_id()),
            })
            .collect()
    }

    /// Badge keyed off the number of visited catalog stores.
    #[must_use]
    pub fn visit_count_badge(&self) -> VisitCountBadge {
        VisitCountBadge::from_count(self.overall_progress().visited())
    }

    #[must_use]
    pub fn prefecture_name(&self, prefecture_id: &PrefectureId) -> &'a str {
        self.catalog
            .prefecture(prefecture_id)
            .map_or(UNKNOWN_PREFECTURE, |prefecture| prefecture.name())
    }

    /// `"{prefecture} {area}"`, or a placeholder when either is unknown.
    #[must_use]
    pub fn area_name(&self, prefecture_id: &PrefectureId, area_id: &AreaId) -> String {
        self.catalog
            .prefecture(prefecture_id)
            .and_then(|prefecture| {
                prefecture
                    .area(area_id)
                    .map(|area| format!("{} {}", prefecture.name(), area.name()))
            })
            .unwrap_or_else(|| UNKNOWN_AREA.to_string())
    }

    #[must_use]
    pub fn achievements_summary(&self) -> AchievementsSummary {
        AchievementsSummary {
            overall: self.overall_progress(),
            prefecture_completion: self.prefecture_completion_progress(),
            visit_count_badge: self.visit_count_badge(),
            favorite_prefectures: self.favorite_prefectures_progress(),
            favorite_areas: self.favorite_areas_progress(),
            regional: self.regional_progress(),
        }
    }

    /// One entry per catalog prefecture, in catalog order.
    #[must_use]
    pub fn prefecture_map_data(&self) -> Vec<PrefectureMapEntry> {
        self.catalog
            .prefectures()
            .iter()
            .map(|prefecture| {
                let progress = self.prefecture_progress(prefecture.id());
                PrefectureMapEntry {
                    id: prefecture.id().clone(),
                    name: prefecture.name().to_string(),
                    progress,
                    fill_opacity: fill_opacity(progress.percentage()),
                }
            })
            .collect()
    }

    /// Plain-text achievements card.
    #[must_use]
    pub fn progress_report(&self) -> String {
        let overall = self.overall_progress();
        let completion = self.prefecture_completion_progress();
        let visit_badge = self.visit_count_badge();

        let mut lines = vec![
            format!(
                "全店舗: {}/{} ({}%)",
                overall.visited(),
                overall.total(),
                overall.percentage()
            ),
            format!(
                "都道府県制覇: {}/{}県",
                completion.completed, completion.total
            ),
            match visit_badge {
                VisitCountBadge::Earned(tier) => {
                    format!("{} {}バッジ獲得", tier.icon(), tier.label())
                }
                VisitCountBadge::None { .. } => visit_badge.label(),
            },
        ];

        let favorite_areas = self.favorite_areas_progress();
        if !favorite_areas.is_empty() {
            lines.push(String::new());
            lines.push("マイエリア:".to_string());
            lines.extend(favorite_areas.iter().take(REPORT_FAVORITE_AREAS).map(|area| {
                format!(
                    "{}: {}/{} ({}%)",
                    area.name,
                    area.progress.visited(),
                    area.progress.total(),
                    area.progress.percentage()
                )
            }));
        }

        lines.join("\n")
    }
}

fn fill_opacity(percentage: u8) -> f32 {
    match percentage {
        0 => 0.0,
        100 => 1.0,
        p => (f32::from(p) / 100.0).max(0.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Area, Prefecture, Region, RegionId, StoreId};
    use crate::progress::{Badge, VisitTier};

    fn store(id: &str, prefecture: &str, area: &str) -> Store {
        Store::new(
            StoreId::new(id),
            format!("Store {id}"),
            "",
            PrefectureId::new(prefecture),
            AreaId::new(area),
            None,
        )
    }

    /// tokyo: 10 stores (6 in shibuya, 4 in shinjuku); osaka: 5 stores in umeda.
    fn catalog() -> StoreCatalog {
        let prefectures = vec![
            Prefecture::new(
                PrefectureId::new("tokyo"),
                "東京都",
                vec![
                    Area::new(AreaId::new("shibuya"), "渋谷区"),
                    Area::new(AreaId::new("shinjuku"), "新宿区"),
                ],
            ),
            Prefecture::new(
                PrefectureId::new("osaka"),
                "大阪府",
                vec![Area::new(AreaId::new("umeda"), "梅田")],
            ),
        ];
        let regions = vec![
            Region::new(RegionId::new("kanto"), "関東", vec![PrefectureId::new("tokyo")]),
            Region::new(RegionId::new("kansai"), "関西", vec![PrefectureId::new("osaka")]),
        ];
        let mut stores = Vec::new();
        for i in 0..10 {
            let area = if i < 6 { "shibuya" } else { "shinjuku" };
            stores.push(store(&format!("t{i}"), "tokyo", area));
        }
        for i in 0..5 {
            stores.push(store(&format!("o{i}"), "osaka", "umeda"));
        }
        StoreCatalog::new(regions, prefectures, stores).unwrap()
    }

    fn ledger(ids: &[&str]) -> VisitLedger {
        ids.iter().map(|id| StoreId::new(*id)).collect()
    }

    fn worked_example_ledger() -> VisitLedger {
        ledger(&["t0", "t1", "t2", "t3", "t4", "t5", "o0", "o1", "o2", "o3", "o4"])
    }

    #[test]
    fn worked_example() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.overall_progress(), Progress::new(11, 15));
        assert_eq!(calc.overall_progress().percentage(), 73);

        let osaka = calc.prefecture_progress(&PrefectureId::new("osaka"));
        assert_eq!((osaka.visited(), osaka.total(), osaka.percentage()), (5, 5, 100));

        let completion = calc.prefecture_completion_progress();
        assert_eq!(completion.completed, 1);
        assert_eq!(completion.total, 47);
        assert_eq!(completion.percentage, 2);
    }

    #[test]
    fn empty_ledger_reports_zero_and_starter_distance() {
        let catalog = catalog();
        let ledger = VisitLedger::new();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.overall_progress().percentage(), 0);
        assert_eq!(calc.visit_count_badge(), VisitCountBadge::None { remaining: 50 });
    }

    #[test]
    fn unknown_ids_resolve_to_zero() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.prefecture_progress(&PrefectureId::new("hokkaido")), Progress::ZERO);
        assert_eq!(
            calc.area_progress(&PrefectureId::new("tokyo"), &AreaId::new("ginza")),
            Progress::ZERO
        );
        assert_eq!(
            calc.area_progress(&PrefectureId::new("kyoto"), &AreaId::new("gion")),
            Progress::ZERO
        );
    }

    #[test]
    fn area_progress_filters_by_area() {
        let catalog = catalog();
        let ledger = ledger(&["t0", "t6"]);
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let shibuya = calc.area_progress(&PrefectureId::new("tokyo"), &AreaId::new("shibuya"));
        assert_eq!((shibuya.visited(), shibuya.total()), (1, 6));
        let shinjuku = calc.area_progress(&PrefectureId::new("tokyo"), &AreaId::new("shinjuku"));
        assert_eq!((shinjuku.visited(), shinjuku.total(), shinjuku.percentage()), (1, 4, 25));
    }

    #[test]
    fn stale_ledger_entries_are_ignored() {
        let catalog = catalog();
        let ledger = ledger(&["t0", "closed-store"]);
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.overall_progress().visited(), 1);
    }

    #[test]
    fn dangling_store_counts_only_overall() {
        let mut stores: Vec<Store> = catalog().stores().to_vec();
        stores.push(store("ghost", "kyoto", "gion"));
        let base = catalog();
        let catalog = StoreCatalog::new(
            base.regions().to_vec(),
            base.prefectures().to_vec(),
            stores,
        )
        .unwrap();
        let ledger = ledger(&["ghost"]);
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.overall_progress(), Progress::new(1, 16));
        assert_eq!(calc.prefecture_progress(&PrefectureId::new("kyoto")), Progress::ZERO);
        let regional_visited: u32 = calc
            .regional_progress()
            .iter()
            .map(|r| r.progress.visited())
            .sum();
        assert_eq!(regional_visited, 0);
    }

    #[test]
    fn store_in_unknown_area_counts_only_overall() {
        let prefectures = vec![Prefecture::new(
            PrefectureId::new("osaka"),
            "大阪府",
            vec![Area::new(AreaId::new("umeda"), "梅田")],
        )];
        let regions = vec![Region::new(
            RegionId::new("kansai"),
            "関西",
            vec![PrefectureId::new("osaka")],
        )];
        let stores = vec![
            store("o1", "osaka", "umeda"),
            store("ghost", "osaka", "nowhere"),
        ];
        let catalog = StoreCatalog::new(regions, prefectures, stores).unwrap();
        let ledger = ledger(&["o1"]);
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let osaka = PrefectureId::new("osaka");
        assert_eq!(calc.overall_progress(), Progress::new(1, 2));
        assert_eq!(calc.prefecture_progress(&osaka), Progress::new(1, 1));
        assert_eq!(calc.prefecture_progress(&osaka).percentage(), 100);
        assert_eq!(calc.regional_progress()[0].progress, Progress::new(1, 1));
        assert_eq!(calc.prefecture_completion_progress().completed, 1);
        assert_eq!(calc.prefecture_map_data()[0].progress, Progress::new(1, 1));
        assert_eq!(
            calc.area_progress(&osaka, &AreaId::new("nowhere")),
            Progress::ZERO
        );
    }

    #[test]
    fn regional_progress_follows_declaration_order_and_sums() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let regions = calc.regional_progress();
        let ids: Vec<_> = regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["kanto", "kansai"]);
        assert_eq!(regions[0].progress, Progress::new(6, 10));
        assert_eq!(regions[1].progress, Progress::new(5, 5));

        let summed: u32 = regions.iter().map(|r| r.progress.visited()).sum();
        assert_eq!(summed, calc.overall_progress().visited());
    }

    #[test]
    fn zero_store_prefecture_never_completes() {
        let base = catalog();
        let mut prefectures = base.prefectures().to_vec();
        prefectures.push(Prefecture::new(PrefectureId::new("tottori"), "鳥取県", vec![]));
        let catalog =
            StoreCatalog::new(Vec::new(), prefectures, base.stores().to_vec()).unwrap();
        let ledger = worked_example_ledger();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.prefecture_progress(&PrefectureId::new("tottori")), Progress::ZERO);
        assert_eq!(calc.prefecture_completion_progress().completed, 1);
    }

    #[test]
    fn favorites_keep_set_order_and_names() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::new(
            [PrefectureId::new("osaka"), PrefectureId::new("hokkaido")],
            [
                AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("shinjuku")),
                AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("ginza")),
            ],
        );
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let prefectures = calc.favorite_prefectures_progress();
        assert_eq!(prefectures[0].key, "osaka");
        assert_eq!(prefectures[0].name, "大阪府");
        assert_eq!(prefectures[0].progress.badge(), Badge::Complete);
        assert_eq!(prefectures[1].name, "Unknown Prefecture");
        assert_eq!(prefectures[1].progress, Progress::ZERO);

        let areas = calc.favorite_areas_progress();
        assert_eq!(areas[0].key, "tokyo_shinjuku");
        assert_eq!(areas[0].name, "東京都 新宿区");
        assert_eq!(areas[0].progress, Progress::new(0, 4));
        assert_eq!(areas[1].name, "Unknown Area");
    }

    #[test]
    fn repeated_queries_are_identical() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.overall_progress(), calc.overall_progress());
        assert_eq!(calc.achievements_summary(), calc.achievements_summary());
    }

    #[test]
    fn visit_badge_counts_visits_not_percentage() {
        let stores: Vec<Store> = (0..60).map(|i| store(&format!("s{i}"), "tokyo", "x")).collect();
        let prefectures = vec![Prefecture::new(
            PrefectureId::new("tokyo"),
            "東京都",
            vec![Area::new(AreaId::new("x"), "X")],
        )];
        let catalog = StoreCatalog::new(Vec::new(), prefectures, stores).unwrap();
        let ledger: VisitLedger = (0..55).map(|i| StoreId::new(format!("s{i}"))).collect();
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        assert_eq!(calc.visit_count_badge().tier(), Some(VisitTier::Starter));
    }

    #[test]
    fn map_data_opacity() {
        let catalog = catalog();
        let ledger = ledger(&["o0", "o1", "o2", "o3", "o4"]);
        let favorites = Favorites::default();
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let map = calc.prefecture_map_data();
        assert_eq!(map[0].id, PrefectureId::new("tokyo"));
        assert!(map[0].fill_opacity.abs() < f32::EPSILON);
        assert!((map[1].fill_opacity - 1.0).abs() < f32::EPSILON);
        assert!((fill_opacity(5) - 0.1).abs() < f32::EPSILON);
        assert!((fill_opacity(60) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn report_lists_top_favorite_areas() {
        let catalog = catalog();
        let ledger = worked_example_ledger();
        let favorites = Favorites::new(
            Vec::<PrefectureId>::new(),
            [AreaKey::new(PrefectureId::new("tokyo"), AreaId::new("shibuya"))],
        );
        let calc = ProgressCalculator::new(&catalog, &ledger, &favorites);

        let report = calc.progress_report();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines[0], "全店舗: 11/15 (73%)");
        assert_eq!(lines[1], "都道府県制覇: 1/47県");
        assert_eq!(lines[2], "スターターまであと39店舗");
        assert_eq!(lines[4], "マイエリア:");
        assert_eq!(lines[5], "東京都 渋谷区: 6/6 (100%)");
    }
}
