//! Lockscreen widgets, camera, battery indicator and background.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::ScreenContext;
use crate::authority::StoreAuthority;
use crate::config::{DeviceProfile, KEYGUARD_DISABLE_SECURE_CAMERA, KEYGUARD_DISABLE_WIDGETS_ALL};
use crate::error::{Error, Result};
use crate::models::ControlId;
use crate::runtime::SettingsHost;
use crate::store::SettingsStore;
use crate::toggle::{ToggleCoordinator, TogglePolicy};

pub const WIDGETS_ENABLED: &str = "lockscreen_widgets_enabled";
pub const CAMERA_ENABLED: &str = "lockscreen_camera_enabled";
pub const BATTERY_VISIBILITY: &str = "lockscreen_battery_visibility";
pub const BACKGROUND_STYLE: &str = "lockscreen_background_style";
pub const WALLPAPER_ALPHA: &str = "lockscreen_wallpaper_alpha";

pub const WIDGETS_CONTROL: &str = "lockscreen.widgets";
pub const CAMERA_CONTROL: &str = "lockscreen.camera";

const DISABLED_BY_ADMIN: &str = "Disabled by administrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    WhenCharging,
    Always,
    Never,
}

impl BatteryStatus {
    pub const ALL: [Self; 3] = [Self::WhenCharging, Self::Always, Self::Never];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub const fn index(self) -> i64 {
        match self {
            Self::WhenCharging => 0,
            Self::Always => 1,
            Self::Never => 2,
        }
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::WhenCharging => "Show when charging",
            Self::Always => "Always show",
            Self::Never => "Never show",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStyle {
    Color,
    Image,
    #[default]
    Default,
}

impl BackgroundStyle {
    pub const fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Color),
            1 => Some(Self::Image),
            2 => Some(Self::Default),
            _ => None,
        }
    }

    pub const fn index(self) -> i64 {
        match self {
            Self::Color => 0,
            Self::Image => 1,
            Self::Default => 2,
        }
    }
}

/// Which optional lockscreen entries are shown on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockscreenLayout {
    pub buttons: bool,
    pub camera: bool,
    pub lock_clock: bool,
    pub maximize_widgets: bool,
    pub wallpaper_alpha: bool,
}

pub struct LockscreenScreen {
    store: Arc<dyn SettingsStore>,
    profile: DeviceProfile,
}

impl LockscreenScreen {
    /// Add the widget and camera toggles to `host`. The camera toggle is
    /// left out on devices without a camera.
    pub fn install(
        host: &mut SettingsHost,
        context: &ScreenContext,
        profile: &DeviceProfile,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let authority = Arc::new(
            StoreAuthority::new(Arc::clone(&store))
                .with_default(WIDGETS_ENABLED, true)
                .with_default(CAMERA_ENABLED, true),
        );

        let mut widgets = ToggleCoordinator::new(
            WIDGETS_CONTROL,
            WIDGETS_ENABLED,
            TogglePolicy::immediate(),
            context.toggle_context(authority.clone()),
        );
        widgets.initialize();
        if profile.is_keyguard_feature_disabled(KEYGUARD_DISABLE_WIDGETS_ALL) {
            widgets.set_policy_block(Some(DISABLED_BY_ADMIN.to_string()));
        }
        host.add_toggle(widgets);

        if profile.has_camera() {
            let mut camera = ToggleCoordinator::new(
                CAMERA_CONTROL,
                CAMERA_ENABLED,
                TogglePolicy::immediate(),
                context.toggle_context(authority),
            );
            camera.initialize();
            if profile.secure_lock
                && profile.is_keyguard_feature_disabled(KEYGUARD_DISABLE_SECURE_CAMERA)
            {
                camera.set_policy_block(Some(DISABLED_BY_ADMIN.to_string()));
            }
            host.add_toggle(camera);
        }

        Self {
            store,
            profile: profile.clone(),
        }
    }

    pub fn controls(&self) -> Vec<ControlId> {
        let mut controls = vec![ControlId::new(WIDGETS_CONTROL)];
        if self.profile.has_camera() {
            controls.push(ControlId::new(CAMERA_CONTROL));
        }
        controls
    }

    /// Stored battery indicator choice. An out-of-range index reads as the
    /// first choice.
    pub fn battery_status(&self) -> Result<BatteryStatus> {
        let index = self.store.get_int(BATTERY_VISIBILITY, 0)?;
        Ok(BatteryStatus::from_index(index).unwrap_or_else(|| {
            tracing::warn!("Ignoring invalid battery visibility {}", index);
            BatteryStatus::WhenCharging
        }))
    }

    pub fn set_battery_status(&self, status: BatteryStatus) -> Result<()> {
        self.store.put_int(BATTERY_VISIBILITY, status.index())
    }

    pub fn background_style(&self) -> Result<BackgroundStyle> {
        let index = self
            .store
            .get_int(BACKGROUND_STYLE, BackgroundStyle::default().index())?;
        Ok(BackgroundStyle::from_index(index).unwrap_or_default())
    }

    pub fn set_background_style(&self, style: BackgroundStyle) -> Result<()> {
        self.store.put_int(BACKGROUND_STYLE, style.index())?;
        tracing::info!("Lockscreen background set to {:?}", style);
        Ok(())
    }

    /// Wallpaper opacity in `0.0..=1.0`. A missing or unreadable value is
    /// reset to fully opaque.
    pub fn wallpaper_alpha(&self) -> Result<f32> {
        match self.store.get_float(WALLPAPER_ALPHA) {
            Ok(alpha) if alpha.is_finite() => Ok(alpha.clamp(0.0, 1.0)),
            Ok(_) | Err(Error::Storage(_)) => {
                tracing::debug!("Resetting {} to 1.0", WALLPAPER_ALPHA);
                self.store.put_float(WALLPAPER_ALPHA, 1.0)?;
                Ok(1.0)
            }
            Err(error) => Err(error),
        }
    }

    pub fn set_wallpaper_alpha(&self, alpha: f32) -> Result<()> {
        if !alpha.is_finite() {
            return Err(Error::InvalidInput(format!(
                "wallpaper alpha must be a number, got {alpha}"
            )));
        }
        self.store.put_float(WALLPAPER_ALPHA, alpha.clamp(0.0, 1.0))
    }

    pub fn layout(&self) -> Result<LockscreenLayout> {
        Ok(LockscreenLayout {
            buttons: self.profile.has_hardware_keys(),
            camera: self.profile.has_camera(),
            lock_clock: self.profile.lock_clock_installed,
            maximize_widgets: self.profile.is_phone,
            wallpaper_alpha: self.background_style()? == BackgroundStyle::Image,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::ControlAvailability;
    use crate::store::MemorySettingsStore;
    use crate::test_support::{RecordingPresenter, RecordingRenderer};
    use crate::toggle::SettingLocks;

    fn install(profile: &DeviceProfile, store: Arc<MemorySettingsStore>) -> (SettingsHost, LockscreenScreen) {
        let context = ScreenContext {
            presenter: Arc::new(RecordingPresenter::default()),
            renderer: Arc::new(RecordingRenderer::default()),
            locks: SettingLocks::default(),
            blocking: None,
        };
        let mut host = SettingsHost::new();
        let screen = LockscreenScreen::install(&mut host, &context, profile, store);
        (host, screen)
    }

    fn availability(host: &SettingsHost, control: &str) -> ControlAvailability {
        host.toggle(&ControlId::new(control))
            .unwrap()
            .state()
            .availability
            .clone()
    }

    #[test]
    fn toggles_default_on() {
        let (host, _) = install(&DeviceProfile::default(), Arc::default());

        assert!(host.toggle(&ControlId::new(WIDGETS_CONTROL)).unwrap().state().committed);
        assert!(host.toggle(&ControlId::new(CAMERA_CONTROL)).unwrap().state().committed);
    }

    #[test]
    fn widget_policy_bit_disables_widgets() {
        let profile = DeviceProfile {
            keyguard_disabled_features: KEYGUARD_DISABLE_WIDGETS_ALL,
            ..DeviceProfile::default()
        };
        let (host, _) = install(&profile, Arc::default());

        assert_eq!(
            availability(&host, WIDGETS_CONTROL),
            ControlAvailability::DisabledByPolicy(DISABLED_BY_ADMIN.to_string())
        );
        assert_eq!(availability(&host, CAMERA_CONTROL), ControlAvailability::Available);
    }

    #[test]
    fn camera_policy_applies_only_to_secure_lock() {
        let insecure = DeviceProfile {
            keyguard_disabled_features: KEYGUARD_DISABLE_SECURE_CAMERA,
            ..DeviceProfile::default()
        };
        let (host, _) = install(&insecure, Arc::default());
        assert_eq!(availability(&host, CAMERA_CONTROL), ControlAvailability::Available);

        let secure = DeviceProfile {
            secure_lock: true,
            ..insecure
        };
        let (host, _) = install(&secure, Arc::default());
        assert!(matches!(
            availability(&host, CAMERA_CONTROL),
            ControlAvailability::DisabledByPolicy(_)
        ));
    }

    #[test]
    fn camera_toggle_absent_without_camera() {
        let profile = DeviceProfile {
            camera_count: 0,
            ..DeviceProfile::default()
        };
        let (host, screen) = install(&profile, Arc::default());

        assert!(host.toggle(&ControlId::new(CAMERA_CONTROL)).is_none());
        assert_eq!(screen.controls(), vec![ControlId::new(WIDGETS_CONTROL)]);
        assert!(!screen.layout().unwrap().camera);
    }

    #[test]
    fn invalid_alpha_is_reset() {
        let store = Arc::new(MemorySettingsStore::with_values([(WALLPAPER_ALPHA, "opaque")]));
        let (_, screen) = install(&DeviceProfile::default(), store.clone());

        assert_eq!(screen.wallpaper_alpha().unwrap(), 1.0);
        assert_eq!(store.get_float(WALLPAPER_ALPHA).unwrap(), 1.0);
    }

    #[test]
    fn alpha_is_clamped() {
        let (_, screen) = install(&DeviceProfile::default(), Arc::default());

        screen.set_wallpaper_alpha(1.7).unwrap();
        assert_eq!(screen.wallpaper_alpha().unwrap(), 1.0);
        screen.set_wallpaper_alpha(0.25).unwrap();
        assert_eq!(screen.wallpaper_alpha().unwrap(), 0.25);
        assert!(screen.set_wallpaper_alpha(f32::NAN).is_err());
    }

    #[test]
    fn alpha_visible_only_for_image_background() {
        let (_, screen) = install(&DeviceProfile::default(), Arc::default());
        assert_eq!(screen.background_style().unwrap(), BackgroundStyle::Default);
        assert!(!screen.layout().unwrap().wallpaper_alpha);

        screen.set_background_style(BackgroundStyle::Image).unwrap();
        assert!(screen.layout().unwrap().wallpaper_alpha);
    }

    #[test]
    fn battery_status_falls_back_on_bad_index() {
        let store = Arc::new(MemorySettingsStore::with_values([(BATTERY_VISIBILITY, "9")]));
        let (_, screen) = install(&DeviceProfile::default(), store);
        assert_eq!(screen.battery_status().unwrap(), BatteryStatus::WhenCharging);

        screen.set_battery_status(BatteryStatus::Never).unwrap();
        assert_eq!(screen.battery_status().unwrap(), BatteryStatus::Never);
    }

    #[test]
    fn layout_follows_device() {
        let profile = DeviceProfile {
            hardware_keys: 0b1011,
            is_phone: false,
            lock_clock_installed: true,
            ..DeviceProfile::default()
        };
        let (_, screen) = install(&profile, Arc::default());

        let layout = screen.layout().unwrap();
        assert!(layout.buttons);
        assert!(layout.lock_clock);
        assert!(!layout.maximize_widgets);
    }
}
