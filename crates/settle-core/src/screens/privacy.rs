//! Backup and account-lock controls.

use std::sync::Arc;

use serde::Serialize;

use super::{completed, ScreenContext};
use crate::authority::{AuthorityAdapter, CommitDispatch};
use crate::config::DeviceProfile;
use crate::error::{AuthorityError, Error, Result};
use crate::models::{ControlId, CorrelationToken, SettingKey};
use crate::runtime::SettingsHost;
use crate::toggle::{RequestOutcome, ToggleCoordinator, TogglePolicy};

pub const BACKUP_DATA: &str = "backup_data";
pub const AUTO_RESTORE: &str = "auto_restore";
pub const LOCK_TO_ACCOUNT: &str = "lock_to_account";

pub const BACKUP_CONTROL: &str = "privacy.backup_data";
pub const AUTO_RESTORE_CONTROL: &str = "privacy.auto_restore";
pub const LOCK_TO_ACCOUNT_CONTROL: &str = "privacy.lock_to_account";

const ERASE_BACKUP_MESSAGE: &str = "Stop backing up your Wi-Fi passwords, bookmarks, other \
     settings, and app data, and erase all copies on backup servers?";
const LOCK_MESSAGE: &str = "Confirm your account credentials to lock this device to it";
const UNLOCK_MESSAGE: &str = "Confirm your account credentials to unlock this device";
const AUTO_RESTORE_BLOCKED: &str = "Backup is off";
const DEFAULT_CONFIGURE_SUMMARY: &str = "No account is currently storing backed up data";

/// The device backup manager.
pub trait BackupService: Send + Sync {
    fn is_enabled(&self) -> std::result::Result<bool, AuthorityError>;

    fn set_enabled(&self, enabled: bool) -> std::result::Result<(), AuthorityError>;

    fn auto_restore(&self) -> std::result::Result<bool, AuthorityError>;

    fn set_auto_restore(&self, enabled: bool) -> std::result::Result<(), AuthorityError>;

    fn current_transport(&self) -> std::result::Result<String, AuthorityError>;

    /// Where the user configures the account for `transport`, if anywhere.
    fn configuration_target(
        &self,
        transport: &str,
    ) -> std::result::Result<Option<String>, AuthorityError>;

    /// Human readable backup destination for `transport`.
    fn destination(&self, transport: &str) -> std::result::Result<Option<String>, AuthorityError>;
}

/// The account service that can lock the device to a signed-in account.
pub trait AccountAuthority: Send + Sync {
    fn signed_in_account(&self) -> Option<String>;

    fn is_device_locked(&self) -> std::result::Result<bool, AuthorityError>;

    /// Confirm the account credentials and apply the lock. May block.
    fn set_device_locked(&self, locked: bool) -> std::result::Result<(), AuthorityError>;
}

/// The "configure account" entry below the backup toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigureAccount {
    pub enabled: bool,
    pub target: Option<String>,
    pub summary: String,
}

struct BackupAuthority {
    service: Arc<dyn BackupService>,
}

impl AuthorityAdapter for BackupAuthority {
    fn query_state(&self, setting: &SettingKey) -> std::result::Result<bool, AuthorityError> {
        match setting.as_str() {
            BACKUP_DATA => self.service.is_enabled(),
            AUTO_RESTORE => self.service.auto_restore(),
            other => Err(AuthorityError::Rejected(format!("unknown setting {other}"))),
        }
    }

    fn commit(&self, setting: &SettingKey, value: bool, _token: CorrelationToken) -> CommitDispatch {
        let result = match setting.as_str() {
            BACKUP_DATA => self.service.set_enabled(value),
            AUTO_RESTORE => self.service.set_auto_restore(value),
            other => Err(AuthorityError::Rejected(format!("unknown setting {other}"))),
        };
        completed(setting.as_str(), result)
    }
}

struct AccountLockAuthority {
    accounts: Arc<dyn AccountAuthority>,
}

impl AuthorityAdapter for AccountLockAuthority {
    fn query_state(&self, _setting: &SettingKey) -> std::result::Result<bool, AuthorityError> {
        self.accounts.is_device_locked()
    }

    fn commit(&self, setting: &SettingKey, value: bool, _token: CorrelationToken) -> CommitDispatch {
        completed(setting.as_str(), self.accounts.set_device_locked(value))
    }
}

pub struct PrivacyScreen {
    backup: Option<Arc<dyn BackupService>>,
    accounts: Option<Arc<dyn AccountAuthority>>,
}

impl PrivacyScreen {
    /// Add the privacy controls the device supports to `host`.
    ///
    /// The backup controls need a backup provider; the account lock needs
    /// the account type to be known to the device.
    pub fn install(
        host: &mut SettingsHost,
        context: &ScreenContext,
        profile: &DeviceProfile,
        backup: Arc<dyn BackupService>,
        accounts: Arc<dyn AccountAuthority>,
    ) -> Self {
        let backup = profile.backup.provider_present.then_some(backup);
        if let Some(service) = &backup {
            let authority: Arc<dyn AuthorityAdapter> = Arc::new(BackupAuthority {
                service: Arc::clone(service),
            });
            install_toggle(
                host,
                ToggleCoordinator::new(
                    BACKUP_CONTROL,
                    BACKUP_DATA,
                    TogglePolicy::destructive_off(ERASE_BACKUP_MESSAGE),
                    context.toggle_context(Arc::clone(&authority)),
                ),
            );
            install_toggle(
                host,
                ToggleCoordinator::new(
                    AUTO_RESTORE_CONTROL,
                    AUTO_RESTORE,
                    TogglePolicy::immediate(),
                    context.toggle_context(authority),
                ),
            );
            host.add_dependency(AUTO_RESTORE_CONTROL, BACKUP_CONTROL, AUTO_RESTORE_BLOCKED);
        } else {
            tracing::info!("No backup provider; backup controls hidden");
        }

        let accounts = profile.account.type_available.then_some(accounts);
        if let Some(accounts) = &accounts {
            let authority = Arc::new(AccountLockAuthority {
                accounts: Arc::clone(accounts),
            });
            let toggle_context = context.slow_toggle_context(host, authority);
            install_toggle(
                host,
                ToggleCoordinator::new(
                    LOCK_TO_ACCOUNT_CONTROL,
                    LOCK_TO_ACCOUNT,
                    TogglePolicy::reauth_both(LOCK_MESSAGE, UNLOCK_MESSAGE),
                    toggle_context,
                ),
            );
        }

        Self { backup, accounts }
    }

    pub fn controls(&self) -> Vec<ControlId> {
        let mut controls = Vec::new();
        if self.backup.is_some() {
            controls.push(ControlId::new(BACKUP_CONTROL));
            controls.push(ControlId::new(AUTO_RESTORE_CONTROL));
        }
        if self.accounts.is_some() {
            controls.push(ControlId::new(LOCK_TO_ACCOUNT_CONTROL));
        }
        controls
    }

    /// Re-query every privacy control, e.g. when the screen is resumed.
    pub fn refresh(&self, host: &mut SettingsHost) {
        for control in self.controls() {
            host.refresh(&control);
        }
    }

    /// State of the "configure account" entry, or `None` without a backup
    /// provider.
    pub fn configure_account(&self, host: &SettingsHost) -> Option<ConfigureAccount> {
        let service = self.backup.as_ref()?;
        let backup_on = host
            .toggle(&ControlId::new(BACKUP_CONTROL))
            .is_some_and(|toggle| toggle.state().committed);

        let (target, destination) = match service.current_transport() {
            Ok(transport) => (
                service.configuration_target(&transport).unwrap_or_else(|error| {
                    tracing::warn!("Failed to read backup configuration target: {}", error);
                    None
                }),
                service.destination(&transport).unwrap_or_default(),
            ),
            Err(error) => {
                tracing::warn!("Backup transport unavailable: {}", error);
                (None, None)
            }
        };

        Some(ConfigureAccount {
            enabled: backup_on && target.is_some(),
            target,
            summary: destination.unwrap_or_else(|| DEFAULT_CONFIGURE_SUMMARY.to_string()),
        })
    }

    /// Flip the account lock.
    ///
    /// Opting in without a signed-in account does not start a round trip;
    /// the caller has to send the user through account setup first.
    pub fn request_lock_to_account(
        &self,
        host: &mut SettingsHost,
        target: bool,
    ) -> Result<RequestOutcome> {
        let Some(accounts) = &self.accounts else {
            return Err(Error::InvalidInput(
                "locking to an account is not supported on this device".to_string(),
            ));
        };
        if target && accounts.signed_in_account().is_none() {
            tracing::info!("No signed-in account; account setup required");
            return Err(Error::AccountSetupRequired(SettingKey::new(LOCK_TO_ACCOUNT)));
        }
        host.request_change(&ControlId::new(LOCK_TO_ACCOUNT_CONTROL), target)
    }
}

fn install_toggle(host: &mut SettingsHost, mut toggle: ToggleCoordinator) {
    toggle.initialize();
    host.add_toggle(toggle);
}
