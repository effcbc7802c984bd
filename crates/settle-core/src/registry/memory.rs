//! In-process registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Registry, RegistryChange, RegistryListener, SubscriptionHandle};
use crate::error::RegistryError;
use crate::models::{EntryKey, RegistryEntry};

#[derive(Default)]
struct Inner {
    entries: BTreeMap<EntryKey, RegistryEntry>,
    listeners: BTreeMap<SubscriptionHandle, Arc<dyn RegistryListener>>,
    next_handle: u64,
}

/// Registry held in memory. Mutations notify subscribers synchronously, on
/// the mutating thread, after the lock is released.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<Inner>,
}

impl MemoryRegistry {
    pub fn with_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        let registry = Self::default();
        registry.inner().entries = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        registry
    }

    pub fn insert(&self, entry: RegistryEntry) {
        let key = entry.key.clone();
        let replaced = self.inner().entries.insert(key.clone(), entry).is_some();
        let change = if replaced {
            RegistryChange::EntryFieldUpdated(key)
        } else {
            RegistryChange::EntryAdded(key)
        };
        self.notify(&change);
    }

    pub fn remove(&self, key: &EntryKey) -> Option<RegistryEntry> {
        let removed = self.inner().entries.remove(key);
        if removed.is_some() {
            self.notify(&RegistryChange::EntryRemoved(key.clone()));
        }
        removed
    }

    /// Fill in auxiliary fields of an existing entry.
    pub fn update_fields(
        &self,
        key: &EntryKey,
        icon: Option<String>,
        size_bytes: Option<u64>,
    ) -> Result<(), RegistryError> {
        {
            let mut inner = self.inner();
            let entry = inner
                .entries
                .get_mut(key)
                .ok_or_else(|| RegistryError(format!("unknown entry {key}")))?;
            if icon.is_some() {
                entry.icon = icon;
            }
            if size_bytes.is_some() {
                entry.size_bytes = size_bytes;
            }
        }
        self.notify(&RegistryChange::EntryFieldUpdated(key.clone()));
        Ok(())
    }

    /// Replace the whole content.
    pub fn reset(&self, entries: impl IntoIterator<Item = RegistryEntry>) {
        self.inner().entries = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        self.notify(&RegistryChange::BulkReset);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner().listeners.len()
    }

    fn notify(&self, change: &RegistryChange) {
        let listeners: Vec<_> = self.inner().listeners.values().cloned().collect();
        for listener in listeners {
            listener.on_change(change.clone());
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Registry for MemoryRegistry {
    fn enumerate(&self) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self.inner().entries.values().cloned().collect())
    }

    fn lookup(&self, key: &EntryKey) -> Option<RegistryEntry> {
        self.inner().entries.get(key).cloned()
    }

    fn subscribe(&self, listener: Arc<dyn RegistryListener>) -> SubscriptionHandle {
        let mut inner = self.inner();
        let handle = SubscriptionHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.listeners.insert(handle, listener);
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner().listeners.remove(&handle);
    }
}
