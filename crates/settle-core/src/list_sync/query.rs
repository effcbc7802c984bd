//! Filter/comparator pairs applied by rebuilds.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::models::RegistryEntry;

type EntryFilter = Arc<dyn Fn(&RegistryEntry) -> bool + Send + Sync>;
type EntryComparator = Arc<dyn Fn(&RegistryEntry, &RegistryEntry) -> Ordering + Send + Sync>;

/// Which entries a list shows and in what order.
#[derive(Clone)]
pub struct ListQuery {
    filter: EntryFilter,
    comparator: EntryComparator,
}

impl ListQuery {
    pub fn new<F, C>(filter: F, comparator: C) -> Self
    where
        F: Fn(&RegistryEntry) -> bool + Send + Sync + 'static,
        C: Fn(&RegistryEntry, &RegistryEntry) -> Ordering + Send + Sync + 'static,
    {
        Self {
            filter: Arc::new(filter),
            comparator: Arc::new(comparator),
        }
    }

    /// Enabled entries sorted by label.
    pub fn all_enabled_alphabetical() -> Self {
        Self::new(all_enabled, alphabetical)
    }

    pub fn accepts(&self, entry: &RegistryEntry) -> bool {
        (self.filter)(entry)
    }

    /// Filter, then stable-sort by the comparator with ties broken by key.
    pub fn apply(&self, entries: Vec<RegistryEntry>) -> Vec<Arc<RegistryEntry>> {
        let mut selected: Vec<RegistryEntry> =
            entries.into_iter().filter(|entry| self.accepts(entry)).collect();
        selected.sort_by(|left, right| {
            (self.comparator)(left, right).then_with(|| left.key.cmp(&right.key))
        });
        selected.into_iter().map(Arc::new).collect()
    }
}

impl fmt::Debug for ListQuery {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ListQuery").finish_non_exhaustive()
    }
}

pub const fn all_entries(_entry: &RegistryEntry) -> bool {
    true
}

pub const fn all_enabled(entry: &RegistryEntry) -> bool {
    entry.enabled
}

/// Case-insensitive label order; exact label breaks ties.
pub fn alphabetical(left: &RegistryEntry, right: &RegistryEntry) -> Ordering {
    left.label
        .to_lowercase()
        .cmp(&right.label.to_lowercase())
        .then_with(|| left.label.cmp(&right.label))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn labels(entries: &[Arc<RegistryEntry>]) -> Vec<&str> {
        entries.iter().map(|entry| entry.label.as_str()).collect()
    }

    #[test]
    fn lexicographic_sort_orders_entries() {
        let query = ListQuery::new(all_entries, |left: &RegistryEntry, right: &RegistryEntry| {
            left.label.cmp(&right.label)
        });
        let sorted = query.apply(vec![
            RegistryEntry::new("b", "B"),
            RegistryEntry::new("a", "A"),
            RegistryEntry::new("c", "C"),
        ]);
        assert_eq!(labels(&sorted), vec!["A", "B", "C"]);
    }

    #[test]
    fn ties_are_broken_by_key() {
        let query = ListQuery::all_enabled_alphabetical();
        let sorted = query.apply(vec![
            RegistryEntry::new("org.two", "Notes"),
            RegistryEntry::new("org.one", "Notes"),
        ]);
        let keys: Vec<&str> = sorted.iter().map(|entry| entry.key.as_str()).collect();
        assert_eq!(keys, vec!["org.one", "org.two"]);
    }

    #[test]
    fn disabled_entries_are_filtered_out() {
        let query = ListQuery::all_enabled_alphabetical();
        let sorted = query.apply(vec![
            RegistryEntry::new("org.camera", "camera"),
            RegistryEntry::new("org.browser", "Browser").disabled(),
            RegistryEntry::new("org.atlas", "Atlas"),
        ]);
        assert_eq!(labels(&sorted), vec!["Atlas", "camera"]);
    }
}
