//! Recording and scripted collaborators shared by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::authority::{AuthorityAdapter, CommitDispatch, CommitOutcome, ConfirmationPresenter};
use crate::error::{AuthorityError, RegistryError};
use crate::list_sync::{RebuildExecutor, RebuildJob};
use crate::models::{
    ConfirmationRequest, ControlId, CorrelationToken, EntryKey, ListSnapshot, RegistryEntry,
    SettingKey, ToggleState,
};
use crate::registry::{MemoryRegistry, Registry, RegistryListener, SubscriptionHandle};
use crate::render::{Notice, Renderer};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[derive(Default)]
pub struct RecordingRenderer {
    states: Mutex<Vec<(ControlId, ToggleState)>>,
    published: Mutex<Vec<(ControlId, Arc<ListSnapshot>)>>,
    notices: Mutex<Vec<Notice>>,
}

impl RecordingRenderer {
    pub fn last_state(&self, control: &ControlId) -> Option<ToggleState> {
        lock(&self.states)
            .iter()
            .rev()
            .find(|(id, _)| id == control)
            .map(|(_, state)| state.clone())
    }

    pub fn states(&self) -> Vec<(ControlId, ToggleState)> {
        lock(&self.states).clone()
    }

    pub fn published(&self, list: &ControlId) -> Vec<Arc<ListSnapshot>> {
        lock(&self.published)
            .iter()
            .filter(|(id, _)| id == list)
            .map(|(_, snapshot)| Arc::clone(snapshot))
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }
}

impl Renderer for RecordingRenderer {
    fn set_control_state(&self, control: &ControlId, state: &ToggleState) {
        lock(&self.states).push((control.clone(), state.clone()));
    }

    fn publish(&self, list: &ControlId, snapshot: Arc<ListSnapshot>) {
        lock(&self.published).push((list.clone(), snapshot));
    }

    fn notify(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    requests: Mutex<Vec<ConfirmationRequest>>,
}

impl RecordingPresenter {
    pub fn last(&self) -> Option<ConfirmationRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn requests(&self) -> Vec<ConfirmationRequest> {
        lock(&self.requests).clone()
    }
}

impl ConfirmationPresenter for RecordingPresenter {
    fn present(&self, request: ConfirmationRequest) {
        lock(&self.requests).push(request);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitMode {
    Succeed,
    Reject(String),
    Unavailable,
    /// Record the commit and answer later through `on_commit_result`.
    Defer,
}

/// Authority with in-memory values and a scripted commit verdict.
pub struct ScriptedAuthority {
    values: Mutex<BTreeMap<SettingKey, bool>>,
    available: AtomicBool,
    mode: Mutex<CommitMode>,
    commits: Mutex<Vec<(SettingKey, bool, CorrelationToken)>>,
}

impl Default for ScriptedAuthority {
    fn default() -> Self {
        Self {
            values: Mutex::default(),
            available: AtomicBool::new(true),
            mode: Mutex::new(CommitMode::Succeed),
            commits: Mutex::default(),
        }
    }
}

impl ScriptedAuthority {
    pub fn with_value(self, setting: &str, value: bool) -> Self {
        self.force_value(setting, value);
        self
    }

    pub fn force_value(&self, setting: &str, value: bool) {
        lock(&self.values).insert(SettingKey::new(setting), value);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_mode(&self, mode: CommitMode) {
        *lock(&self.mode) = mode;
    }

    pub fn commits(&self) -> Vec<(SettingKey, bool, CorrelationToken)> {
        lock(&self.commits).clone()
    }

    pub fn value(&self, setting: &str) -> Option<bool> {
        lock(&self.values).get(&SettingKey::new(setting)).copied()
    }
}

impl AuthorityAdapter for ScriptedAuthority {
    fn query_state(&self, setting: &SettingKey) -> Result<bool, AuthorityError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable);
        }
        Ok(lock(&self.values).get(setting).copied().unwrap_or(false))
    }

    fn commit(&self, setting: &SettingKey, value: bool, token: CorrelationToken) -> CommitDispatch {
        lock(&self.commits).push((setting.clone(), value, token));
        let mode = lock(&self.mode).clone();
        match mode {
            CommitMode::Succeed => {
                lock(&self.values).insert(setting.clone(), value);
                CommitDispatch::Completed(CommitOutcome::Success)
            }
            CommitMode::Reject(reason) => {
                CommitDispatch::Completed(CommitOutcome::Rejected(reason))
            }
            CommitMode::Unavailable => CommitDispatch::Completed(CommitOutcome::Unavailable),
            CommitMode::Defer => CommitDispatch::Deferred,
        }
    }
}

/// Queues rebuild jobs until the test runs them.
#[derive(Default)]
pub struct ManualRebuildExecutor {
    jobs: Mutex<VecDeque<RebuildJob>>,
}

impl ManualRebuildExecutor {
    pub fn queued(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Run the oldest queued job. Returns false when nothing was queued.
    pub fn run_next(&self) -> bool {
        let job = lock(&self.jobs).pop_front();
        job.map(RebuildJob::run).is_some()
    }
}

impl RebuildExecutor for ManualRebuildExecutor {
    fn execute(&self, job: RebuildJob) {
        lock(&self.jobs).push_back(job);
    }
}

/// [`MemoryRegistry`] that counts enumerations and can fail on demand.
#[derive(Default)]
pub struct CountingRegistry {
    inner: MemoryRegistry,
    enumerations: AtomicUsize,
    fail_next: AtomicBool,
}

impl CountingRegistry {
    pub fn with_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        Self {
            inner: MemoryRegistry::with_entries(entries),
            ..Self::default()
        }
    }

    pub const fn inner(&self) -> &MemoryRegistry {
        &self.inner
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    pub fn fail_next_enumeration(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl Registry for CountingRegistry {
    fn enumerate(&self) -> Result<Vec<RegistryEntry>, RegistryError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(RegistryError("package service died".to_string()));
        }
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        self.inner.enumerate()
    }

    fn lookup(&self, key: &EntryKey) -> Option<RegistryEntry> {
        self.inner.lookup(key)
    }

    fn subscribe(&self, listener: Arc<dyn RegistryListener>) -> SubscriptionHandle {
        self.inner.subscribe(listener)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner.unsubscribe(handle);
    }
}
