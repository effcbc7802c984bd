//! Fingerprint wake-and-unlock toggle.

use std::sync::Arc;

use super::ScreenContext;
use crate::authority::StoreAuthority;
use crate::config::DeviceProfile;
use crate::models::ControlId;
use crate::runtime::SettingsHost;
use crate::store::SettingsStore;
use crate::toggle::{ToggleCoordinator, TogglePolicy};

pub const FINGERPRINT_WAKE_UNLOCK: &str = "fingerprint_wake_unlock";
pub const WAKE_UNLOCK_CONTROL: &str = "fingerprint.wake_unlock";

pub struct FingerprintWakeScreen {
    control: ControlId,
}

impl FingerprintWakeScreen {
    /// Only devices with the sensor on the power button get the toggle.
    pub fn install(
        host: &mut SettingsHost,
        context: &ScreenContext,
        profile: &DeviceProfile,
        store: Arc<dyn SettingsStore>,
    ) -> Option<Self> {
        if !profile.powerbutton_fingerprint {
            return None;
        }

        let authority = Arc::new(
            StoreAuthority::new(store)
                .with_default(FINGERPRINT_WAKE_UNLOCK, profile.fingerprint_wake_default),
        );
        let mut toggle = ToggleCoordinator::new(
            WAKE_UNLOCK_CONTROL,
            FINGERPRINT_WAKE_UNLOCK,
            TogglePolicy::immediate(),
            context.toggle_context(authority),
        );
        toggle.initialize();
        let control = toggle.control().clone();
        host.add_toggle(toggle);
        Some(Self { control })
    }

    pub const fn control(&self) -> &ControlId {
        &self.control
    }
}
