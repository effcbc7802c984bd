//! Wiring of one `settle` invocation: profile, store, screens, event path.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use settle_core::config::DeviceProfile;
use settle_core::list_sync::TokioRebuildExecutor;
use settle_core::registry::MemoryRegistry;
use settle_core::screens::{DeviceServices, ScreenContext, Screens};
use settle_core::store::{JsonFileSettingsStore, SettingsStore};
use settle_core::toggle::SettingLocks;
use settle_core::SettingsHost;
use tokio::runtime::Handle;

use crate::console::{ConsoleRenderer, QueuedPresenter};
use crate::device::{registry_entries, StoredAccountAuthority, StoredBackupService};
use crate::error::CliError;

/// How long a command waits for round trips and rebuilds to finish.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

const PROFILE_FILE: &str = "device.json";
const STORE_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub profile: PathBuf,
    pub store: PathBuf,
}

/// Flags first, then `SETTLE_PROFILE` / `SETTLE_STORE`, then the user
/// config directory.
pub fn resolve_paths(profile: Option<PathBuf>, store: Option<PathBuf>) -> Paths {
    Paths {
        profile: resolve_path(profile, "SETTLE_PROFILE", PROFILE_FILE),
        store: resolve_path(store, "SETTLE_STORE", STORE_FILE),
    }
}

fn resolve_path(flag: Option<PathBuf>, env_var: &str, file_name: &str) -> PathBuf {
    flag.or_else(|| {
        env::var_os(env_var)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| default_config_dir().join(file_name))
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("settle")
}

/// Every screen installed into one host.
pub struct App {
    pub host: SettingsHost,
    pub screens: Screens,
    pub presenter: Arc<QueuedPresenter>,
}

impl App {
    pub fn open(paths: &Paths) -> Result<Self, CliError> {
        let profile = DeviceProfile::load_from_path(&paths.profile)?;
        let store = JsonFileSettingsStore::open(&paths.store)?;
        tracing::debug!(
            "Using profile {} and store {}",
            paths.profile.display(),
            store.path().display()
        );
        Self::build(profile, Arc::new(store))
    }

    /// Must be called on a tokio runtime.
    pub fn build(profile: DeviceProfile, store: Arc<dyn SettingsStore>) -> Result<Self, CliError> {
        let mut host = SettingsHost::new();
        let presenter = Arc::new(QueuedPresenter::default());
        let context = ScreenContext {
            presenter: presenter.clone(),
            renderer: Arc::new(ConsoleRenderer),
            locks: SettingLocks::default(),
            blocking: Handle::try_current().ok(),
        };
        let services = DeviceServices {
            backup: Arc::new(StoredBackupService::new(
                Arc::clone(&store),
                profile.backup.clone(),
            )),
            accounts: Arc::new(StoredAccountAuthority::new(
                Arc::clone(&store),
                &profile.account,
            )),
            store,
            registry: Arc::new(MemoryRegistry::with_entries(registry_entries(
                &profile.apps,
            ))),
            executor: Arc::new(TokioRebuildExecutor::current()?),
        };
        let screens = Screens::install(&mut host, &context, &profile, services);

        Ok(Self {
            host,
            screens,
            presenter,
        })
    }

    /// Drain the event path; round trips still open after `timeout` are
    /// expired and re-read from their authority.
    pub async fn settle(&mut self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.host.settle()).await.is_err() {
            tracing::warn!("Timed out after {:?}; abandoning pending changes", timeout);
            self.host.expire_pending();
        }
    }

    pub fn close(mut self) {
        self.host.shutdown();
    }
}
