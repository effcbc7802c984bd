//! Per-setting serialization of round trips.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::SettingKey;

/// Set of settings with a round trip in flight, shared by every coordinator
/// talking to the same authority.
#[derive(Debug, Clone, Default)]
pub struct SettingLocks {
    held: Arc<Mutex<HashSet<SettingKey>>>,
}

impl SettingLocks {
    /// Claim `setting`; false if another coordinator already holds it.
    pub fn try_acquire(&self, setting: &SettingKey) -> bool {
        self.held().insert(setting.clone())
    }

    pub fn release(&self, setting: &SettingKey) {
        self.held().remove(setting);
    }

    #[must_use]
    pub fn is_held(&self, setting: &SettingKey) -> bool {
        self.held().contains(setting)
    }

    fn held(&self) -> MutexGuard<'_, HashSet<SettingKey>> {
        self.held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
