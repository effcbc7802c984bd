//! Immutable list snapshots

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{EntryKey, RegistryEntry};

/// Orders snapshots: a full rebuild bumps `generation`, an in-place field
/// refresh of the current snapshot bumps `revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Freshness {
    pub generation: u64,
    pub revision: u32,
}

impl Freshness {
    #[must_use]
    pub const fn rebuilt(generation: u64) -> Self {
        Self {
            generation,
            revision: 0,
        }
    }

    #[must_use]
    pub const fn next_revision(self) -> Self {
        Self {
            generation: self.generation,
            revision: self.revision.saturating_add(1),
        }
    }
}

/// Ordered result of one rebuild pass. Never mutated once published; a
/// field refresh produces a new snapshot sharing the untouched entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSnapshot {
    freshness: Freshness,
    entries: Vec<Arc<RegistryEntry>>,
    built_at: DateTime<Utc>,
}

impl ListSnapshot {
    #[must_use]
    pub fn new(freshness: Freshness, entries: Vec<Arc<RegistryEntry>>) -> Self {
        Self {
            freshness,
            entries,
            built_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn freshness(&self) -> Freshness {
        self.freshness
    }

    #[must_use]
    pub fn entries(&self) -> &[Arc<RegistryEntry>] {
        &self.entries
    }

    #[must_use]
    pub const fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&EntryKey> {
        self.entries.iter().map(|entry| &entry.key).collect()
    }

    #[must_use]
    pub fn position(&self, key: &EntryKey) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.key == key)
    }

    /// Copy of this snapshot with the entry at `index` replaced and the
    /// revision bumped. Other entries are shared, not cloned.
    #[must_use]
    pub fn with_entry_replaced(&self, index: usize, entry: RegistryEntry) -> Self {
        let mut entries = self.entries.clone();
        if let Some(slot) = entries.get_mut(index) {
            *slot = Arc::new(entry);
        }
        Self {
            freshness: self.freshness.next_revision(),
            entries,
            built_at: Utc::now(),
        }
    }
}
