//! Device services simulated on top of the settings store.

use std::sync::Arc;

use settle_core::config::{AccountProfile, AppProfile, BackupProfile};
use settle_core::error::AuthorityError;
use settle_core::models::RegistryEntry;
use settle_core::screens::privacy::{AUTO_RESTORE, BACKUP_DATA, LOCK_TO_ACCOUNT};
use settle_core::screens::{AccountAuthority, BackupService};
use settle_core::store::SettingsStore;

/// Backup manager whose switches live in the settings store.
pub struct StoredBackupService {
    store: Arc<dyn SettingsStore>,
    profile: BackupProfile,
}

impl StoredBackupService {
    pub fn new(store: Arc<dyn SettingsStore>, profile: BackupProfile) -> Self {
        Self { store, profile }
    }

    fn read(&self, key: &str) -> Result<bool, AuthorityError> {
        self.store.get_bool(key, false).map_err(|error| {
            tracing::warn!("Failed to read {}: {}", key, error);
            AuthorityError::Unavailable
        })
    }

    fn write(&self, key: &str, value: bool) -> Result<(), AuthorityError> {
        self.store
            .put_bool(key, value)
            .map_err(|error| AuthorityError::Rejected(error.to_string()))
    }
}

impl BackupService for StoredBackupService {
    fn is_enabled(&self) -> Result<bool, AuthorityError> {
        self.read(BACKUP_DATA)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), AuthorityError> {
        self.write(BACKUP_DATA, enabled)
    }

    fn auto_restore(&self) -> Result<bool, AuthorityError> {
        self.read(AUTO_RESTORE)
    }

    fn set_auto_restore(&self, enabled: bool) -> Result<(), AuthorityError> {
        self.write(AUTO_RESTORE, enabled)
    }

    fn current_transport(&self) -> Result<String, AuthorityError> {
        Ok(self.profile.transport.clone())
    }

    fn configuration_target(&self, transport: &str) -> Result<Option<String>, AuthorityError> {
        Ok(self
            .profile
            .configuration_target
            .clone()
            .filter(|_| transport == self.profile.transport))
    }

    fn destination(&self, transport: &str) -> Result<Option<String>, AuthorityError> {
        Ok(self
            .profile
            .destination
            .clone()
            .filter(|_| transport == self.profile.transport))
    }
}

/// Account service: the signed-in account comes from the profile, the
/// device lock flag from the store.
pub struct StoredAccountAuthority {
    store: Arc<dyn SettingsStore>,
    signed_in: Option<String>,
}

impl StoredAccountAuthority {
    pub fn new(store: Arc<dyn SettingsStore>, profile: &AccountProfile) -> Self {
        Self {
            store,
            signed_in: profile.signed_in.clone(),
        }
    }
}

impl AccountAuthority for StoredAccountAuthority {
    fn signed_in_account(&self) -> Option<String> {
        self.signed_in.clone()
    }

    fn is_device_locked(&self) -> Result<bool, AuthorityError> {
        self.store
            .get_bool(LOCK_TO_ACCOUNT, false)
            .map_err(|_| AuthorityError::Unavailable)
    }

    fn set_device_locked(&self, locked: bool) -> Result<(), AuthorityError> {
        if locked && self.signed_in.is_none() {
            return Err(AuthorityError::Rejected("no signed-in account".to_string()));
        }
        self.store
            .put_bool(LOCK_TO_ACCOUNT, locked)
            .map_err(|error| AuthorityError::Rejected(error.to_string()))
    }
}

pub fn registry_entries(apps: &[AppProfile]) -> Vec<RegistryEntry> {
    apps.iter()
        .map(|app| {
            let entry = RegistryEntry::new(app.package.clone(), app.label.clone());
            if app.enabled {
                entry
            } else {
                entry.disabled()
            }
        })
        .collect()
}
