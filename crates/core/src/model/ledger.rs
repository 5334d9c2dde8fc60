use std::collections::HashSet;

use crate::model::catalog::LegacyIdMapping;
use crate::model::ids::{AreaKey, PrefectureId, StoreId};

/// Insertion-ordered set. Order matters for export and favorite listings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderedSet<T: std::hash::Hash + Eq + Clone> {
    items: Vec<T>,
    index: HashSet<T>,
}

impl<T: std::hash::Hash + Eq + Clone> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::new(),
        }
    }
}

impl<T: std::hash::Hash + Eq + Clone> OrderedSet<T> {
    fn contains(&self, item: &T) -> bool {
        self.index.contains(item)
    }

    fn insert(&mut self, item: T) -> bool {
        if self.index.insert(item.clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    fn remove(&mut self, item: &T) -> bool {
        if self.index.remove(item) {
            self.items.retain(|existing| existing != item);
            true
        } else {
            false
        }
    }

    fn toggle(&mut self, item: T) -> bool {
        if self.contains(&item) {
            self.remove(&item);
            false
        } else {
            self.insert(item);
            true
        }
    }
}

impl<T: std::hash::Hash + Eq + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

//
// ─── VISIT LEDGER ──────────────────────────────────────────────────────────────
//

/// Store ids the user has marked as visited, in the order they were marked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitLedger {
    visited: OrderedSet<StoreId>,
}

impl VisitLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_visited(&self, id: &StoreId) -> bool {
        self.visited.contains(id)
    }

    /// Mark a store visited. Returns false if it already was.
    pub fn mark(&mut self, id: StoreId) -> bool {
        self.visited.insert(id)
    }

    /// Clear a visit. Returns false if the store was not visited.
    pub fn unmark(&mut self, id: &StoreId) -> bool {
        self.visited.remove(id)
    }

    /// Flip the visited state and return the new state.
    pub fn toggle(&mut self, id: StoreId) -> bool {
        self.visited.toggle(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoreId> {
        self.visited.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.items.is_empty()
    }

    /// Rewrite retired ids to their replacements, keeping positions.
    ///
    /// Entries whose replacement is already present are dropped. Returns the
    /// number of entries rewritten.
    pub fn remap(&mut self, mapping: &LegacyIdMapping) -> usize {
        if mapping.is_empty() {
            return 0;
        }
        let mut rewritten = 0;
        let remapped: OrderedSet<StoreId> = self
            .visited
            .items
            .iter()
            .map(|id| match mapping.get(id) {
                Some(new_id) => {
                    rewritten += 1;
                    new_id.clone()
                }
                None => id.clone(),
            })
            .collect();
        self.visited = remapped;
        rewritten
    }
}

impl FromIterator<StoreId> for VisitLedger {
    fn from_iter<I: IntoIterator<Item = StoreId>>(iter: I) -> Self {
        Self {
            visited: iter.into_iter().collect(),
        }
    }
}

//
// ─── FAVORITES ─────────────────────────────────────────────────────────────────
//

/// Favorite prefectures and areas ("My Areas").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favorites {
    prefectures: OrderedSet<PrefectureId>,
    areas: OrderedSet<AreaKey>,
}

impl Favorites {
    #[must_use]
    pub fn new(
        prefectures: impl IntoIterator<Item = PrefectureId>,
        areas: impl IntoIterator<Item = AreaKey>,
    ) -> Self {
        Self {
            prefectures: prefectures.into_iter().collect(),
            areas: areas.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn favorite_prefectures(&self) -> &[PrefectureId] {
        &self.prefectures.items
    }

    #[must_use]
    pub fn favorite_area_keys(&self) -> &[AreaKey] {
        &self.areas.items
    }

    #[must_use]
    pub fn is_favorite_prefecture(&self, id: &PrefectureId) -> bool {
        self.prefectures.contains(id)
    }

    #[must_use]
    pub fn is_favorite_area(&self, key: &AreaKey) -> bool {
        self.areas.contains(key)
    }

    /// Returns the new favorite state.
    pub fn toggle_prefecture(&mut self, id: PrefectureId) -> bool {
        self.prefectures.toggle(id)
    }

    /// Returns the new favorite state.
    pub fn toggle_area(&mut self, key: AreaKey) -> bool {
        self.areas.toggle(key)
    }

    pub fn set_prefectures(&mut self, ids: impl IntoIterator<Item = PrefectureId>) {
        self.prefectures = ids.into_iter().collect();
    }

    pub fn set_areas(&mut self, keys: impl IntoIterator<Item = AreaKey>) {
        self.areas = keys.into_iter().collect();
    }
}
