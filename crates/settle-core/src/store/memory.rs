//! In-memory settings store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::SettingsStore;
use crate::error::Result;

/// Process-local store, used by tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
