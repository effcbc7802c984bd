//! Device profile configuration.
//!
//! A `DeviceProfile` describes the capabilities the settings screens adapt
//! to: which controls exist, which are blocked by policy, and the defaults
//! the device ships with. It is loaded from a JSON file; every field is
//! optional and falls back to the values of a typical phone.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{excerpt, non_blank};

/// Device administrator policy: keyguard widgets are disabled.
pub const KEYGUARD_DISABLE_WIDGETS_ALL: u32 = 1 << 0;
/// Device administrator policy: camera is disabled on a secure keyguard.
pub const KEYGUARD_DISABLE_SECURE_CAMERA: u32 = 1 << 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeviceProfile {
    #[serde(default = "default_camera_count")]
    pub camera_count: u32,
    #[serde(default)]
    pub secure_lock: bool,
    /// Hardware key bitmask; zero means an on-screen navigation bar only.
    #[serde(default)]
    pub hardware_keys: u32,
    #[serde(default = "default_true")]
    pub is_phone: bool,
    #[serde(default)]
    pub powerbutton_fingerprint: bool,
    #[serde(default = "default_true")]
    pub fingerprint_wake_default: bool,
    #[serde(default)]
    pub lock_clock_installed: bool,
    #[serde(default)]
    pub keyguard_disabled_features: u32,
    #[serde(default)]
    pub backup: BackupProfile,
    #[serde(default)]
    pub account: AccountProfile,
    #[serde(default)]
    pub apps: Vec<AppProfile>,
}

/// The backup provider installed on the device, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BackupProfile {
    #[serde(default = "default_true")]
    pub provider_present: bool,
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default)]
    pub configuration_target: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AccountProfile {
    /// Whether the device knows the account type at all.
    #[serde(default)]
    pub type_available: bool,
    #[serde(default)]
    pub signed_in: Option<String>,
}

/// An installed application, as listed by the package registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppProfile {
    pub package: String,
    pub label: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_camera_count() -> u32 {
    1
}

fn default_transport() -> String {
    "local".to_string()
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            camera_count: default_camera_count(),
            secure_lock: false,
            hardware_keys: 0,
            is_phone: true,
            powerbutton_fingerprint: false,
            fingerprint_wake_default: true,
            lock_clock_installed: false,
            keyguard_disabled_features: 0,
            backup: BackupProfile::default(),
            account: AccountProfile::default(),
            apps: Vec::new(),
        }
    }
}

impl Default for BackupProfile {
    fn default() -> Self {
        Self {
            provider_present: true,
            transport: default_transport(),
            configuration_target: None,
            destination: None,
        }
    }
}

impl DeviceProfile {
    /// Load a profile, returning defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No device profile at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "Failed to read device profile at {}: {}",
                path.display(),
                error
            ))
        })?;
        parse_device_profile(&raw).map_err(|error| {
            Error::Config(format!("{} ({})", error, path.display()))
        })
    }

    pub const fn has_hardware_keys(&self) -> bool {
        self.hardware_keys > 0
    }

    pub const fn has_camera(&self) -> bool {
        self.camera_count > 0
    }

    /// Whether a device administrator disabled `feature` on the keyguard.
    pub const fn is_keyguard_feature_disabled(&self, feature: u32) -> bool {
        self.keyguard_disabled_features & feature != 0
    }

    fn normalize(&mut self) {
        self.backup.configuration_target = non_blank(self.backup.configuration_target.take());
        self.backup.destination = non_blank(self.backup.destination.take());
        self.account.signed_in = non_blank(self.account.signed_in.take());
        if let Some(transport) = non_blank(Some(self.backup.transport.clone())) {
            self.backup.transport = transport;
        } else {
            self.backup.transport = default_transport();
        }
    }

    fn validate(&self) -> Result<()> {
        for app in &self.apps {
            if app.package.trim().is_empty() {
                return Err(Error::Config(format!(
                    "app '{}' has an empty package name",
                    excerpt(&app.label)
                )));
            }
        }
        Ok(())
    }
}

/// Parse a device profile from a raw JSON payload.
pub fn parse_device_profile(payload: &str) -> Result<DeviceProfile> {
    let mut profile: DeviceProfile = serde_json::from_str(payload)
        .map_err(|error| Error::Config(format!("invalid device profile JSON: {error}")))?;
    profile.normalize();
    profile.validate()?;
    Ok(profile)
}
