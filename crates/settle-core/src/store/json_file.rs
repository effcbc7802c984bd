//! Settings store persisted as a flat JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::SettingsStore;
use crate::error::Result;

/// File-backed store. The whole map is rewritten on every `put`, which is
/// fine for the handful of keys a settings screen touches.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    /// Open the store at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened settings store at {} ({} keys)", path.display(), values.len());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values();
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(error) = self.persist(&values) {
            // Keep memory in line with disk.
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
            return Err(error);
        }
        Ok(())
    }
}
