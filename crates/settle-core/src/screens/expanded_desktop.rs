//! Per-app expanded desktop (immersive mode).
//!
//! The per-app modes live in a single policy-control string such as
//! `immersive.full=org.a,org.b:immersive.status=org.c`, where `*` stands for
//! every app.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use super::ScreenContext;
use crate::error::{Error, Result};
use crate::list_sync::{ListContext, ListQuery, ListSyncSession, RebuildExecutor};
use crate::models::{ControlId, EntryKey};
use crate::registry::Registry;
use crate::runtime::SettingsHost;
use crate::store::SettingsStore;
use crate::util::excerpt;

pub const POLICY_CONTROL: &str = "policy_control";
pub const APPS_LIST: &str = "expanded_desktop.apps";

const FULL: &str = "immersive.full";
const STATUS: &str = "immersive.status";
const NAVIGATION: &str = "immersive.navigation";
const ALL_APPS: &str = "*";

static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImmersiveMode {
    HideNothing,
    HideStatusBar,
    HideNavBar,
    HideBoth,
}

impl ImmersiveMode {
    pub const ALL: [Self; 4] = [
        Self::HideNothing,
        Self::HideStatusBar,
        Self::HideNavBar,
        Self::HideBoth,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HideNothing => "hide-nothing",
            Self::HideStatusBar => "hide-status-bar",
            Self::HideNavBar => "hide-nav-bar",
            Self::HideBoth => "hide-both",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HideNothing => "Hide nothing",
            Self::HideStatusBar => "Hide statusbar",
            Self::HideNavBar => "Hide navbar",
            Self::HideBoth => "Hide both",
        }
    }
}

impl fmt::Display for ImmersiveMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ImmersiveMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value.trim())
            .ok_or_else(|| Error::InvalidInput(format!("unknown immersive mode: {value}")))
    }
}

/// Apps a policy section applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PackageSet {
    all: bool,
    packages: BTreeSet<String>,
}

impl PackageSet {
    fn contains(&self, package: &str) -> bool {
        self.all || self.packages.contains(package)
    }

    fn is_empty(&self) -> bool {
        !self.all && self.packages.is_empty()
    }

    fn format(&self) -> String {
        if self.all {
            ALL_APPS.to_string()
        } else {
            self.packages
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    /// Replace `*` with the explicit `known` packages.
    fn expand(&mut self, known: &[EntryKey]) {
        if self.all {
            self.all = false;
            self.packages
                .extend(known.iter().map(|key| key.as_str().to_string()));
        }
    }
}

/// Parsed policy-control value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyControl {
    full: PackageSet,
    status: PackageSet,
    navigation: PackageSet,
}

impl PolicyControl {
    /// Parse a stored value. Unknown sections are ignored; malformed package
    /// names are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let mut policy = Self::default();
        for section in value.split(':').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((name, packages)) = section.split_once('=') else {
                return Err(Error::InvalidInput(format!(
                    "malformed policy section: {}",
                    excerpt(section)
                )));
            };
            let set = match name.trim() {
                FULL => &mut policy.full,
                STATUS => &mut policy.status,
                NAVIGATION => &mut policy.navigation,
                other => {
                    tracing::debug!("Ignoring policy section {}", other);
                    continue;
                }
            };
            for package in packages.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if package == ALL_APPS {
                    set.all = true;
                } else if PACKAGE_NAME.is_match(package) {
                    set.packages.insert(package.to_string());
                } else {
                    return Err(Error::InvalidInput(format!(
                        "malformed package name: {}",
                        excerpt(package)
                    )));
                }
            }
        }
        Ok(policy)
    }

    /// Hide both bars for every app.
    pub fn all_apps() -> Self {
        Self {
            full: PackageSet {
                all: true,
                packages: BTreeSet::new(),
            },
            ..Self::default()
        }
    }

    pub fn mode_for(&self, package: &str) -> ImmersiveMode {
        let status = self.status.contains(package);
        let navigation = self.navigation.contains(package);
        if self.full.contains(package) || (status && navigation) {
            ImmersiveMode::HideBoth
        } else if status {
            ImmersiveMode::HideStatusBar
        } else if navigation {
            ImmersiveMode::HideNavBar
        } else {
            ImmersiveMode::HideNothing
        }
    }

    /// Set the mode of one app. Sections that cover every app are first
    /// expanded to the `known` apps so the others keep their mode.
    pub fn set_mode(&mut self, package: &str, mode: ImmersiveMode, known: &[EntryKey]) -> Result<()> {
        if !PACKAGE_NAME.is_match(package) {
            return Err(Error::InvalidInput(format!(
                "malformed package name: {}",
                excerpt(package)
            )));
        }
        for set in [&mut self.full, &mut self.status, &mut self.navigation] {
            set.expand(known);
            set.packages.remove(package);
        }
        let set = match mode {
            ImmersiveMode::HideNothing => return Ok(()),
            ImmersiveMode::HideStatusBar => &mut self.status,
            ImmersiveMode::HideNavBar => &mut self.navigation,
            ImmersiveMode::HideBoth => &mut self.full,
        };
        set.packages.insert(package.to_string());
        Ok(())
    }
}

impl fmt::Display for PolicyControl {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections: Vec<String> = [
            (FULL, &self.full),
            (STATUS, &self.status),
            (NAVIGATION, &self.navigation),
        ]
        .into_iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(name, set)| format!("{name}={}", set.format()))
        .collect();
        formatter.write_str(&sections.join(":"))
    }
}

/// One row of the app list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppRow {
    pub package: EntryKey,
    pub label: String,
    pub icon: Option<String>,
    pub mode: ImmersiveMode,
}

pub struct ExpandedDesktopScreen {
    list: ControlId,
    store: Arc<dyn SettingsStore>,
}

impl ExpandedDesktopScreen {
    /// Open the app list session (enabled apps, alphabetical).
    pub fn install(
        host: &mut SettingsHost,
        context: &ScreenContext,
        registry: Arc<dyn Registry>,
        executor: Arc<dyn RebuildExecutor>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        let session = ListSyncSession::open(
            APPS_LIST,
            ListQuery::all_enabled_alphabetical(),
            ListContext {
                registry,
                renderer: Arc::clone(&context.renderer),
                executor,
                events: host.sender(),
            },
        );
        let list = session.list().clone();
        host.add_list(session);
        Self { list, store }
    }

    pub const fn list(&self) -> &ControlId {
        &self.list
    }

    pub fn policy(&self) -> Result<PolicyControl> {
        match self.store.get(POLICY_CONTROL)? {
            Some(value) => PolicyControl::parse(&value),
            None => Ok(PolicyControl::default()),
        }
    }

    pub fn enable_for_all(&self) -> Result<()> {
        self.write(&PolicyControl::all_apps())
    }

    pub fn disable_for_all(&self) -> Result<()> {
        self.write(&PolicyControl::default())
    }

    /// Change the mode of an app currently shown in the list.
    pub fn set_mode(&self, host: &SettingsHost, package: &str, mode: ImmersiveMode) -> Result<()> {
        let key = EntryKey::new(package);
        let snapshot = host
            .list(&self.list)
            .and_then(ListSyncSession::snapshot)
            .ok_or_else(|| Error::EntryNotFound(key.clone()))?;
        if snapshot.position(&key).is_none() {
            return Err(Error::EntryNotFound(key));
        }

        let known: Vec<EntryKey> = snapshot.keys().into_iter().cloned().collect();
        let mut policy = self.policy()?;
        policy.set_mode(package, mode, &known)?;
        self.write(&policy)?;
        tracing::info!("{} set to {}", package, mode);
        Ok(())
    }

    /// The published app list with each app's current mode.
    pub fn rows(&self, host: &SettingsHost) -> Result<Vec<AppRow>> {
        let policy = self.policy()?;
        let Some(snapshot) = host.list(&self.list).and_then(ListSyncSession::snapshot) else {
            return Ok(Vec::new());
        };
        Ok(snapshot
            .entries()
            .iter()
            .map(|entry| AppRow {
                package: entry.key.clone(),
                label: entry.label.clone(),
                icon: entry.icon.clone(),
                mode: policy.mode_for(entry.key.as_str()),
            })
            .collect())
    }

    fn write(&self, policy: &PolicyControl) -> Result<()> {
        let value = policy.to_string();
        tracing::debug!("Writing {} = {:?}", POLICY_CONTROL, value);
        self.store.put(POLICY_CONTROL, &value)
    }
}
