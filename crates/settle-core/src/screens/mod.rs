//! Settings screens built from toggles and list sessions.

pub mod expanded_desktop;
pub mod fingerprint;
pub mod lockscreen;
pub mod privacy;

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::authority::{
    AuthorityAdapter, CommitDispatch, CommitOutcome, ConfirmationPresenter, SpawnedAuthority,
};
use crate::config::DeviceProfile;
use crate::error::{AuthorityError, Result};
use crate::list_sync::RebuildExecutor;
use crate::models::ControlId;
use crate::registry::Registry;
use crate::render::Renderer;
use crate::runtime::SettingsHost;
use crate::store::SettingsStore;
use crate::toggle::{RequestOutcome, SettingLocks, ToggleContext};

pub use expanded_desktop::{AppRow, ExpandedDesktopScreen, ImmersiveMode, PolicyControl};
pub use fingerprint::FingerprintWakeScreen;
pub use lockscreen::{BackgroundStyle, BatteryStatus, LockscreenLayout, LockscreenScreen};
pub use privacy::{AccountAuthority, BackupService, ConfigureAccount, PrivacyScreen};

/// Collaborators shared by every screen.
#[derive(Clone)]
pub struct ScreenContext {
    pub presenter: Arc<dyn ConfirmationPresenter>,
    pub renderer: Arc<dyn Renderer>,
    pub locks: SettingLocks,
    /// Where slow authorities run their commits. `None` keeps them inline.
    pub blocking: Option<Handle>,
}

impl ScreenContext {
    pub fn toggle_context(&self, authority: Arc<dyn AuthorityAdapter>) -> ToggleContext {
        ToggleContext {
            authority,
            presenter: Arc::clone(&self.presenter),
            renderer: Arc::clone(&self.renderer),
            locks: self.locks.clone(),
        }
    }

    /// Toggle context for an authority whose commits may block.
    pub fn slow_toggle_context(
        &self,
        host: &SettingsHost,
        authority: Arc<dyn AuthorityAdapter>,
    ) -> ToggleContext {
        let authority: Arc<dyn AuthorityAdapter> = match &self.blocking {
            Some(handle) => Arc::new(SpawnedAuthority::new(
                authority,
                handle.clone(),
                host.sender(),
            )),
            None => authority,
        };
        self.toggle_context(authority)
    }
}

/// Device services the screens are built against.
#[derive(Clone)]
pub struct DeviceServices {
    pub backup: Arc<dyn BackupService>,
    pub accounts: Arc<dyn AccountAuthority>,
    pub store: Arc<dyn SettingsStore>,
    pub registry: Arc<dyn Registry>,
    pub executor: Arc<dyn RebuildExecutor>,
}

/// Every screen installed into one host.
pub struct Screens {
    pub privacy: PrivacyScreen,
    pub lockscreen: LockscreenScreen,
    pub fingerprint: Option<FingerprintWakeScreen>,
    pub expanded_desktop: ExpandedDesktopScreen,
}

impl Screens {
    pub fn install(
        host: &mut SettingsHost,
        context: &ScreenContext,
        profile: &DeviceProfile,
        services: DeviceServices,
    ) -> Self {
        let privacy = PrivacyScreen::install(
            host,
            context,
            profile,
            services.backup,
            services.accounts,
        );
        let lockscreen =
            LockscreenScreen::install(host, context, profile, Arc::clone(&services.store));
        let fingerprint =
            FingerprintWakeScreen::install(host, context, profile, Arc::clone(&services.store));
        let expanded_desktop = ExpandedDesktopScreen::install(
            host,
            context,
            services.registry,
            services.executor,
            services.store,
        );
        Self {
            privacy,
            lockscreen,
            fingerprint,
            expanded_desktop,
        }
    }

    /// Flip `control`, applying the screen-level preconditions first.
    pub fn request_change(
        &self,
        host: &mut SettingsHost,
        control: &ControlId,
        target: bool,
    ) -> Result<RequestOutcome> {
        if control.as_str() == privacy::LOCK_TO_ACCOUNT_CONTROL {
            return self.privacy.request_lock_to_account(host, target);
        }
        host.request_change(control, target)
    }
}

pub(crate) fn completed(
    setting: &str,
    result: std::result::Result<(), AuthorityError>,
) -> CommitDispatch {
    let outcome = match result {
        Ok(()) => CommitOutcome::Success,
        Err(AuthorityError::Unavailable) => CommitOutcome::Unavailable,
        Err(AuthorityError::Rejected(reason)) => {
            tracing::warn!("Commit of {} rejected: {}", setting, reason);
            CommitOutcome::Rejected(reason)
        }
    };
    CommitDispatch::Completed(outcome)
}
