//! The event path.
//!
//! Every state transition of toggles and list sessions happens on one task
//! that drains a single channel of [`SettingsEvent`]s. Collaborators running
//! elsewhere (authority callbacks, rebuild jobs, registry listeners, the
//! confirmation UI) only ever send events.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::authority::CommitOutcome;
use crate::error::{Error, RegistryError, Result};
use crate::list_sync::{ListSyncSession, SessionState};
use crate::models::{
    ChallengeOutcome, ControlId, CorrelationToken, EntryKey, RegistryEntry, ToggleState,
};
use crate::toggle::{RequestOutcome, ToggleCoordinator};

#[derive(Debug)]
pub enum SettingsEvent {
    /// The user flipped a control.
    ToggleRequested { control: ControlId, target: bool },
    ConfirmationResolved {
        token: CorrelationToken,
        outcome: ChallengeOutcome,
    },
    /// The confirmation step was closed without an answer.
    ConfirmationDismissed { token: CorrelationToken },
    CommitCompleted {
        token: CorrelationToken,
        outcome: CommitOutcome,
    },
    RegistryChanged { list: ControlId },
    EntryFieldUpdated { list: ControlId, key: EntryKey },
    RebuildFinished {
        list: ControlId,
        generation: u64,
        result: std::result::Result<Vec<Arc<RegistryEntry>>, RegistryError>,
    },
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<SettingsEvent>;

/// A dependent toggle stays inert while its prerequisite is off.
#[derive(Debug, Clone)]
struct Dependency {
    dependent: ControlId,
    prerequisite: ControlId,
    reason: String,
}

/// Owns the toggles and list sessions of the live screens and applies
/// events to them in arrival order.
pub struct SettingsHost {
    toggles: BTreeMap<ControlId, ToggleCoordinator>,
    lists: BTreeMap<ControlId, ListSyncSession>,
    dependencies: Vec<Dependency>,
    sender: EventSender,
    receiver: mpsc::UnboundedReceiver<SettingsEvent>,
}

impl Default for SettingsHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsHost {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            toggles: BTreeMap::new(),
            lists: BTreeMap::new(),
            dependencies: Vec::new(),
            sender,
            receiver,
        }
    }

    /// Handle for collaborators that report back onto the event path.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    pub fn add_toggle(&mut self, coordinator: ToggleCoordinator) {
        self.toggles
            .insert(coordinator.control().clone(), coordinator);
    }

    pub fn add_list(&mut self, session: ListSyncSession) {
        self.lists.insert(session.list().clone(), session);
    }

    /// Keep `dependent` disabled with `reason` whenever `prerequisite` is
    /// committed off.
    pub fn add_dependency(
        &mut self,
        dependent: impl Into<ControlId>,
        prerequisite: impl Into<ControlId>,
        reason: impl Into<String>,
    ) {
        self.dependencies.push(Dependency {
            dependent: dependent.into(),
            prerequisite: prerequisite.into(),
            reason: reason.into(),
        });
        self.refresh_dependencies();
    }

    pub fn toggle(&self, control: &ControlId) -> Option<&ToggleCoordinator> {
        self.toggles.get(control)
    }

    pub fn toggles(&self) -> impl Iterator<Item = &ToggleCoordinator> {
        self.toggles.values()
    }

    pub fn list(&self, list: &ControlId) -> Option<&ListSyncSession> {
        self.lists.get(list)
    }

    pub fn lists(&self) -> impl Iterator<Item = &ListSyncSession> {
        self.lists.values()
    }

    pub fn session_states(&self) -> BTreeMap<ControlId, SessionState> {
        self.lists
            .iter()
            .map(|(list, session)| (list.clone(), session.state()))
            .collect()
    }

    /// Query every authority and show its values.
    pub fn initialize(&mut self) {
        for toggle in self.toggles.values_mut() {
            toggle.initialize();
        }
        self.refresh_dependencies();
    }

    /// Re-query the authority of one control.
    pub fn refresh(&mut self, control: &ControlId) -> Option<ToggleState> {
        let state = self.toggles.get_mut(control)?.initialize();
        self.refresh_dependencies();
        Some(state)
    }

    /// Whether a round trip or a rebuild is still outstanding.
    pub fn is_busy(&self) -> bool {
        self.toggles.values().any(ToggleCoordinator::is_pending)
            || self.lists.values().any(ListSyncSession::is_rebuilding)
    }

    /// Start a round trip on `control`.
    pub fn request_change(&mut self, control: &ControlId, target: bool) -> Result<RequestOutcome> {
        let toggle = self
            .toggles
            .get_mut(control)
            .ok_or_else(|| Error::InvalidInput(format!("unknown control: {control}")))?;
        let outcome = toggle.request_change(target);
        tracing::debug!("{} -> {}: {:?}", control, target, outcome);
        self.refresh_dependencies();
        Ok(outcome)
    }

    /// Apply one event. Returns `Break` on shutdown.
    pub fn handle(&mut self, event: SettingsEvent) -> ControlFlow<()> {
        match event {
            SettingsEvent::ToggleRequested { control, target } => {
                if let Err(error) = self.request_change(&control, target) {
                    tracing::warn!("Dropping toggle request: {}", error);
                }
            }
            SettingsEvent::ConfirmationResolved { token, outcome } => {
                let result = self
                    .owner_of(token)
                    .map(|toggle| toggle.on_confirmation(token, outcome));
                self.report_toggle(token, result);
            }
            SettingsEvent::ConfirmationDismissed { token } => {
                let result = self
                    .owner_of(token)
                    .map(|toggle| Ok(toggle.cancel_pending()));
                self.report_toggle(token, result);
            }
            SettingsEvent::CommitCompleted { token, outcome } => {
                let result = self
                    .owner_of(token)
                    .map(|toggle| toggle.on_commit_result(token, outcome));
                self.report_toggle(token, result);
            }
            SettingsEvent::RegistryChanged { list } => {
                if let Some(session) = self.lists.get_mut(&list) {
                    session.on_registry_changed();
                }
            }
            SettingsEvent::EntryFieldUpdated { list, key } => {
                if let Some(session) = self.lists.get_mut(&list) {
                    report_list(&list, session.on_entry_field_updated(&key).map(drop));
                }
            }
            SettingsEvent::RebuildFinished {
                list,
                generation,
                result,
            } => match self.lists.get_mut(&list) {
                Some(session) => {
                    report_list(&list, session.on_rebuild_finished(generation, result).map(drop));
                }
                None => tracing::debug!("Dropping rebuild {} of unknown list {}", generation, list),
            },
            SettingsEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Drain events until `Shutdown` (or until every sender is gone).
    pub async fn run(&mut self) {
        while let Some(event) = self.receiver.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.shutdown();
    }

    /// Drain events until no round trip or rebuild is outstanding.
    ///
    /// Returns `Break` if a `Shutdown` arrived meanwhile.
    pub async fn settle(&mut self) -> ControlFlow<()> {
        loop {
            while let Ok(event) = self.receiver.try_recv() {
                self.handle(event)?;
            }
            if !self.is_busy() {
                return ControlFlow::Continue(());
            }
            match self.receiver.recv().await {
                Some(event) => self.handle(event)?,
                None => return ControlFlow::Continue(()),
            }
        }
    }

    /// Abandon round trips that never got an answer.
    pub fn expire_pending(&mut self) {
        for toggle in self.toggles.values_mut() {
            if toggle.is_pending() {
                toggle.expire_pending();
            }
        }
        self.refresh_dependencies();
    }

    /// Screen went to the background: lists stop rebuilding.
    pub fn pause(&mut self) {
        for session in self.lists.values_mut() {
            session.pause();
        }
    }

    /// Screen is visible again: refresh toggles and catch lists up.
    pub fn resume(&mut self) {
        for session in self.lists.values_mut() {
            session.resume();
        }
        self.initialize();
    }

    /// Detach every toggle and release every list session.
    pub fn shutdown(&mut self) {
        for toggle in self.toggles.values_mut() {
            toggle.detach();
        }
        for session in self.lists.values_mut() {
            session.release();
        }
        tracing::debug!("Event path shut down");
    }

    fn owner_of(&mut self, token: CorrelationToken) -> Option<&mut ToggleCoordinator> {
        self.toggles.values_mut().find(|toggle| toggle.owns(token))
    }

    fn report_toggle(&mut self, token: CorrelationToken, result: Option<Result<RequestOutcome>>) {
        match result {
            Some(Ok(outcome)) => tracing::debug!("{}: {:?}", token, outcome),
            Some(Err(Error::StaleCallback(detail))) => {
                tracing::debug!("Discarding stale callback: {}", detail);
            }
            Some(Err(error)) => tracing::warn!("{}", error),
            None => tracing::debug!("Discarding callback {} with no live owner", token),
        }
        self.refresh_dependencies();
    }

    fn refresh_dependencies(&mut self) {
        for dependency in &self.dependencies {
            let Some(prerequisite) = self.toggles.get(&dependency.prerequisite) else {
                continue;
            };
            let block = (!prerequisite.state().committed).then(|| dependency.reason.clone());
            if let Some(dependent) = self.toggles.get_mut(&dependency.dependent) {
                dependent.set_policy_block(block);
            }
        }
    }
}

fn report_list(list: &ControlId, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(Error::StaleCallback(detail)) => tracing::debug!("{}: {}", list, detail),
        Err(Error::EntryNotFound(key)) => {
            tracing::debug!("{} not shown in {}; nothing to patch", key, list);
        }
        // Already logged and surfaced by the session.
        Err(Error::RegistryEnumerationFailed(_)) => {}
        Err(error) => tracing::warn!("{}: {}", list, error),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::authority::SpawnedAuthority;
    use crate::list_sync::{ListContext, ListQuery, TokioRebuildExecutor};
    use crate::registry::MemoryRegistry;
    use crate::test_support::{CommitMode, RecordingPresenter, RecordingRenderer, ScriptedAuthority};
    use crate::toggle::{SettingLocks, ToggleContext, TogglePolicy};

    fn context(authority: Arc<ScriptedAuthority>, presenter: Arc<RecordingPresenter>) -> ToggleContext {
        ToggleContext {
            authority,
            presenter,
            renderer: Arc::new(RecordingRenderer::default()),
            locks: SettingLocks::default(),
        }
    }

    #[tokio::test]
    async fn confirmation_answer_routes_to_owning_toggle() {
        let authority = Arc::new(ScriptedAuthority::default().with_value("backup_data", true));
        let presenter = Arc::new(RecordingPresenter::default());
        let mut host = SettingsHost::new();
        host.add_toggle(ToggleCoordinator::new(
            "privacy.backup",
            "backup_data",
            TogglePolicy::destructive_off("Erase backup data?"),
            context(authority.clone(), presenter.clone()),
        ));
        host.initialize();

        let backup = ControlId::new("privacy.backup");
        host.sender()
            .send(SettingsEvent::ToggleRequested {
                control: backup.clone(),
                target: false,
            })
            .unwrap();
        while let Ok(event) = host.receiver.try_recv() {
            host.handle(event);
        }
        let request = presenter.last().unwrap();
        host.sender()
            .send(SettingsEvent::ConfirmationResolved {
                token: request.correlation_token,
                outcome: ChallengeOutcome::Approved,
            })
            .unwrap();

        assert!(host.settle().await.is_continue());
        assert_eq!(host.toggle(&backup).unwrap().state(), &ToggleState::settled(false));
        assert_eq!(authority.value("backup_data"), Some(false));
    }

    #[tokio::test]
    async fn stale_answer_is_discarded() {
        let authority = Arc::new(ScriptedAuthority::default());
        let mut host = SettingsHost::new();
        host.add_toggle(ToggleCoordinator::new(
            "privacy.backup",
            "backup_data",
            TogglePolicy::immediate(),
            context(authority.clone(), Arc::new(RecordingPresenter::default())),
        ));
        host.initialize();

        let flow = host.handle(SettingsEvent::CommitCompleted {
            token: CorrelationToken::new(),
            outcome: CommitOutcome::Success,
        });

        assert!(flow.is_continue());
        assert!(!host.toggle(&ControlId::new("privacy.backup")).unwrap().state().committed);
    }

    #[tokio::test]
    async fn dependent_toggle_follows_prerequisite() {
        let authority = Arc::new(ScriptedAuthority::default());
        let presenter = Arc::new(RecordingPresenter::default());
        let mut host = SettingsHost::new();
        host.add_toggle(ToggleCoordinator::new(
            "privacy.backup",
            "backup_data",
            TogglePolicy::immediate(),
            context(authority.clone(), presenter.clone()),
        ));
        host.add_toggle(ToggleCoordinator::new(
            "privacy.auto_restore",
            "auto_restore",
            TogglePolicy::immediate(),
            context(authority.clone(), presenter),
        ));
        host.initialize();
        host.add_dependency("privacy.auto_restore", "privacy.backup", "Backup is off");

        let restore = ControlId::new("privacy.auto_restore");
        assert!(!host.toggle(&restore).unwrap().state().is_enabled());

        host.request_change(&ControlId::new("privacy.backup"), true)
            .unwrap();
        assert!(host.toggle(&restore).unwrap().state().is_enabled());
    }

    #[tokio::test]
    async fn spawned_commit_settles_through_event_path() {
        let inner = Arc::new(ScriptedAuthority::default());
        let presenter = Arc::new(RecordingPresenter::default());
        let mut host = SettingsHost::new();
        let authority = Arc::new(SpawnedAuthority::new(
            inner.clone(),
            tokio::runtime::Handle::current(),
            host.sender(),
        ));
        host.add_toggle(ToggleCoordinator::new(
            "privacy.backup",
            "backup_data",
            TogglePolicy::immediate(),
            ToggleContext {
                authority,
                presenter,
                renderer: Arc::new(RecordingRenderer::default()),
                locks: SettingLocks::default(),
            },
        ));
        host.initialize();

        let backup = ControlId::new("privacy.backup");
        assert_eq!(
            host.request_change(&backup, true).unwrap(),
            RequestOutcome::AwaitingAuthority
        );
        assert!(host.settle().await.is_continue());

        assert_eq!(host.toggle(&backup).unwrap().state(), &ToggleState::settled(true));
    }

    #[tokio::test]
    async fn rejected_commit_through_event_path_reverts() {
        let inner = Arc::new(ScriptedAuthority::default());
        inner.set_mode(CommitMode::Reject("quota".to_string()));
        let mut host = SettingsHost::new();
        let authority = Arc::new(SpawnedAuthority::new(
            inner,
            tokio::runtime::Handle::current(),
            host.sender(),
        ));
        host.add_toggle(ToggleCoordinator::new(
            "privacy.backup",
            "backup_data",
            TogglePolicy::immediate(),
            ToggleContext {
                authority,
                presenter: Arc::new(RecordingPresenter::default()),
                renderer: Arc::new(RecordingRenderer::default()),
                locks: SettingLocks::default(),
            },
        ));
        host.initialize();

        let backup = ControlId::new("privacy.backup");
        host.request_change(&backup, true).unwrap();
        host.settle().await;

        assert_eq!(host.toggle(&backup).unwrap().state(), &ToggleState::settled(false));
    }

    #[tokio::test]
    async fn list_session_publishes_after_settle() {
        let registry = Arc::new(MemoryRegistry::with_entries([
            RegistryEntry::new("org.b", "Beta"),
            RegistryEntry::new("org.a", "Alpha"),
        ]));
        let renderer = Arc::new(RecordingRenderer::default());
        let mut host = SettingsHost::new();
        let session = ListSyncSession::open(
            "expanded_desktop.apps",
            ListQuery::all_enabled_alphabetical(),
            ListContext {
                registry: registry.clone(),
                renderer: renderer.clone(),
                executor: Arc::new(TokioRebuildExecutor::current().unwrap()),
                events: host.sender(),
            },
        );
        host.add_list(session);

        host.settle().await;
        registry.insert(RegistryEntry::new("org.c", "Gamma"));
        host.settle().await;

        let list = ControlId::new("expanded_desktop.apps");
        let snapshot = host.list(&list).unwrap().snapshot().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.entries()[2].label, "Gamma");

        host.shutdown();
        assert_eq!(host.session_states()[&list], SessionState::Released);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let mut host = SettingsHost::new();
        host.sender().send(SettingsEvent::Shutdown).unwrap();
        host.run().await;
    }
}
