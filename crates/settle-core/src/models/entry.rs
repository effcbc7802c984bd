//! Registry entry model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a registry entry (e.g. an application package name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKey(String);

impl EntryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A record mirrored from the external registry.
///
/// `icon` and `size_bytes` are auxiliary fields that the registry may fill in
/// after the entry first appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub key: EntryKey,
    pub label: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

const fn default_enabled() -> bool {
    true
}

impl RegistryEntry {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: EntryKey::new(key),
            label: label.into(),
            enabled: true,
            icon: None,
            size_bytes: None,
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
