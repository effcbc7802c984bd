//! Authority backed directly by the settings store.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{AuthorityAdapter, CommitDispatch, CommitOutcome};
use crate::error::AuthorityError;
use crate::models::{CorrelationToken, SettingKey};
use crate::store::SettingsStore;

/// For settings whose only owner is the key/value store (lockscreen flags,
/// fingerprint wake, auto restore), the store is the authority.
#[derive(Clone)]
pub struct StoreAuthority {
    store: Arc<dyn SettingsStore>,
    defaults: BTreeMap<SettingKey, bool>,
}

impl StoreAuthority {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            defaults: BTreeMap::new(),
        }
    }

    /// Value reported for `setting` while the store holds nothing for it.
    #[must_use]
    pub fn with_default(mut self, setting: impl Into<SettingKey>, value: bool) -> Self {
        self.defaults.insert(setting.into(), value);
        self
    }

    fn default_for(&self, setting: &SettingKey) -> bool {
        self.defaults.get(setting).copied().unwrap_or(false)
    }
}

impl AuthorityAdapter for StoreAuthority {
    fn query_state(&self, setting: &SettingKey) -> Result<bool, AuthorityError> {
        self.store
            .get_bool(setting.as_str(), self.default_for(setting))
            .map_err(|error| {
                tracing::warn!("Failed to read {} from settings store: {}", setting, error);
                AuthorityError::Unavailable
            })
    }

    fn commit(&self, setting: &SettingKey, value: bool, _token: CorrelationToken) -> CommitDispatch {
        match self.store.put_bool(setting.as_str(), value) {
            Ok(()) => CommitDispatch::Completed(CommitOutcome::Success),
            Err(error) => {
                tracing::warn!("Failed to write {} to settings store: {}", setting, error);
                CommitDispatch::Completed(CommitOutcome::Unavailable)
            }
        }
    }
}
