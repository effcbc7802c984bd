//! List views kept in sync with a live registry.
//!
//! A [`ListSyncSession`] never rebuilds on the event path and never runs two
//! rebuilds at once: change notifications that arrive while a rebuild is in
//! flight collapse into a single `dirty` flag, serviced by one follow-up
//! rebuild. Snapshots are published in strictly increasing freshness.

mod executor;
mod query;

use std::sync::Arc;

pub use executor::{RebuildExecutor, RebuildJob, TokioRebuildExecutor};
pub use query::{all_enabled, all_entries, alphabetical, ListQuery};

use crate::error::{Error, RegistryError, Result};
use crate::models::{ControlId, EntryKey, Freshness, ListSnapshot, RegistryEntry};
use crate::registry::{Registry, RegistryChange, RegistryListener, SubscriptionHandle};
use crate::render::{Notice, NoticeKind, Renderer};
use crate::runtime::{EventSender, SettingsEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Paused,
    Released,
}

/// Collaborators of a list session.
#[derive(Clone)]
pub struct ListContext {
    pub registry: Arc<dyn Registry>,
    pub renderer: Arc<dyn Renderer>,
    pub executor: Arc<dyn RebuildExecutor>,
    pub events: EventSender,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: u64,
    /// Set by pause/release: the result is dropped instead of published.
    discard: bool,
}

pub struct ListSyncSession {
    list: ControlId,
    query: ListQuery,
    context: ListContext,
    state: SessionState,
    subscription: Option<SubscriptionHandle>,
    in_flight: Option<InFlight>,
    dirty: bool,
    next_generation: u64,
    current: Option<Arc<ListSnapshot>>,
    last_published: Option<Freshness>,
    degraded: bool,
}

impl ListSyncSession {
    /// Subscribe to the registry, become `Active` and schedule the first
    /// rebuild.
    pub fn open(list: impl Into<ControlId>, query: ListQuery, context: ListContext) -> Self {
        let list = list.into();
        let mut session = Self {
            list: list.clone(),
            query,
            context,
            state: SessionState::Created,
            subscription: None,
            in_flight: None,
            dirty: false,
            next_generation: 1,
            current: None,
            last_published: None,
            degraded: false,
        };

        let listener = Arc::new(ForwardingListener {
            list,
            events: session.context.events.clone(),
        });
        session.subscription = Some(session.context.registry.subscribe(listener));
        session.state = SessionState::Active;
        tracing::info!("Opened list session {}", session.list);
        session.request_rebuild();
        session
    }

    #[must_use]
    pub const fn list(&self) -> &ControlId {
        &self.list
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Last published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<ListSnapshot>> {
        self.current.clone()
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub const fn is_rebuilding(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Entries were added, removed or reset. Returns false when the session
    /// does not accept triggers.
    pub fn on_registry_changed(&mut self) -> bool {
        if self.state != SessionState::Active {
            tracing::debug!("Ignoring registry change for {} ({:?})", self.list, self.state);
            return false;
        }
        self.request_rebuild();
        true
    }

    /// Deliver the result of rebuild `generation`.
    ///
    /// Results for a generation that is not in flight, or that was cancelled
    /// by pause/release, are discarded as stale. A failed enumeration keeps
    /// the last good snapshot and marks the session degraded.
    pub fn on_rebuild_finished(
        &mut self,
        generation: u64,
        result: std::result::Result<Vec<Arc<RegistryEntry>>, RegistryError>,
    ) -> Result<Arc<ListSnapshot>> {
        let Some(in_flight) = self
            .in_flight
            .filter(|in_flight| in_flight.generation == generation)
        else {
            return Err(Error::StaleCallback(format!(
                "rebuild {generation} of {}",
                self.list
            )));
        };
        self.in_flight = None;

        let outcome = if in_flight.discard || self.state != SessionState::Active {
            Err(Error::StaleCallback(format!(
                "cancelled rebuild {generation} of {}",
                self.list
            )))
        } else {
            match result {
                Ok(entries) => {
                    self.publish(ListSnapshot::new(Freshness::rebuilt(generation), entries))
                }
                Err(error) => Err(self.mark_degraded(error)),
            }
        };

        if self.state == SessionState::Active && self.dirty {
            self.start_rebuild();
        }
        outcome
    }

    /// An auxiliary field of one entry changed. The current snapshot is
    /// patched copy-on-write and republished without a full rebuild; if the
    /// entry's label or enablement changed a full rebuild is scheduled
    /// instead.
    ///
    /// A rebuild already in flight may have enumerated before the change,
    /// so it always gets a follow-up. An entry missing from the snapshot is
    /// rebuilt in once it passes the filter.
    pub fn on_entry_field_updated(&mut self, key: &EntryKey) -> Result<Arc<ListSnapshot>> {
        if self.state != SessionState::Active {
            return Err(Error::StaleCallback(format!(
                "field update for {key} on {}",
                self.list
            )));
        }
        let rebuilding = self.in_flight.is_some();
        if rebuilding {
            self.request_rebuild();
        }

        let shown = self
            .current
            .clone()
            .and_then(|current| current.position(key).map(|index| (current, index)));
        let Some((current, index)) = shown else {
            let now_visible = self
                .context
                .registry
                .lookup(key)
                .is_some_and(|entry| self.query.accepts(&entry));
            if now_visible && !rebuilding {
                tracing::debug!("{} became visible; rebuilding {}", key, self.list);
                self.request_rebuild();
            }
            return Err(Error::EntryNotFound(key.clone()));
        };

        let previous = &current.entries()[index];
        match self.context.registry.lookup(key) {
            Some(entry)
                if entry.label == previous.label
                    && entry.enabled == previous.enabled
                    && self.query.accepts(&entry) =>
            {
                self.publish(current.with_entry_replaced(index, entry))
            }
            _ => {
                tracing::debug!("{} changed shape; rebuilding {}", key, self.list);
                self.request_rebuild();
                Err(Error::EntryNotFound(key.clone()))
            }
        }
    }

    /// Stop accepting triggers. An in-flight rebuild finishes but its result
    /// is discarded.
    pub fn pause(&mut self) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::Paused;
        self.dirty = false;
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.discard = true;
        }
        tracing::info!("Paused list session {}", self.list);
    }

    /// Accept triggers again and catch up with whatever changed meanwhile.
    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        self.state = SessionState::Active;
        tracing::info!("Resumed list session {}", self.list);
        self.request_rebuild();
    }

    /// Unsubscribe for good. Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        if let Some(handle) = self.subscription.take() {
            self.context.registry.unsubscribe(handle);
        }
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.discard = true;
        }
        self.state = SessionState::Released;
        self.dirty = false;
        self.current = None;
        tracing::info!("Released list session {}", self.list);
    }

    fn request_rebuild(&mut self) {
        if self.in_flight.is_some() {
            if !self.dirty {
                tracing::debug!("Rebuild of {} in flight; coalescing change", self.list);
            }
            self.dirty = true;
            return;
        }
        self.start_rebuild();
    }

    fn start_rebuild(&mut self) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight = Some(InFlight {
            generation,
            discard: false,
        });
        self.dirty = false;

        tracing::debug!("Starting rebuild {} of {}", generation, self.list);
        self.context.executor.execute(RebuildJob::new(
            self.list.clone(),
            generation,
            Arc::clone(&self.context.registry),
            self.query.clone(),
            self.context.events.clone(),
        ));
    }

    fn publish(&mut self, snapshot: ListSnapshot) -> Result<Arc<ListSnapshot>> {
        let freshness = snapshot.freshness();
        if self.last_published.is_some_and(|last| freshness <= last) {
            return Err(Error::StaleCallback(format!(
                "snapshot {freshness:?} of {} is not newer than the published one",
                self.list
            )));
        }

        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        self.last_published = Some(freshness);
        if self.degraded {
            tracing::info!("List {} recovered", self.list);
        }
        self.degraded = false;
        self.context
            .renderer
            .publish(&self.list, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn mark_degraded(&mut self, error: RegistryError) -> Error {
        let error = Error::from(error);
        tracing::warn!("Keeping last snapshot of {}: {}", self.list, error);
        self.degraded = true;
        self.context.renderer.notify(Notice::new(
            &self.list,
            NoticeKind::Degraded,
            error.to_string(),
        ));
        error
    }
}

/// Turns registry callbacks (any thread) into events on the event path.
struct ForwardingListener {
    list: ControlId,
    events: EventSender,
}

impl RegistryListener for ForwardingListener {
    fn on_change(&self, change: RegistryChange) {
        let event = match change {
            RegistryChange::EntryFieldUpdated(key) => SettingsEvent::EntryFieldUpdated {
                list: self.list.clone(),
                key,
            },
            RegistryChange::EntryAdded(_)
            | RegistryChange::EntryRemoved(_)
            | RegistryChange::BulkReset => SettingsEvent::RegistryChanged {
                list: self.list.clone(),
            },
        };
        if self.events.send(event).is_err() {
            tracing::debug!("Event path closed; dropping change for {}", self.list);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;
    use crate::test_support::{CountingRegistry, ManualRebuildExecutor, RecordingRenderer};

    struct Harness {
        registry: Arc<CountingRegistry>,
        executor: Arc<ManualRebuildExecutor>,
        renderer: Arc<RecordingRenderer>,
        rx: mpsc::UnboundedReceiver<SettingsEvent>,
        session: ListSyncSession,
    }

    impl Harness {
        fn open(entries: Vec<RegistryEntry>, query: ListQuery) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            let registry = Arc::new(CountingRegistry::with_entries(entries));
            let executor = Arc::new(ManualRebuildExecutor::default());
            let renderer = Arc::new(RecordingRenderer::default());
            let session = ListSyncSession::open(
                "expanded_desktop.apps",
                query,
                ListContext {
                    registry: registry.clone(),
                    renderer: renderer.clone(),
                    executor: executor.clone(),
                    events: tx,
                },
            );
            Self {
                registry,
                executor,
                renderer,
                rx,
                session,
            }
        }

        /// Deliver every queued event to the session.
        fn pump(&mut self) {
            while let Ok(event) = self.rx.try_recv() {
                self.deliver(event);
            }
        }

        fn deliver(&mut self, event: SettingsEvent) {
            match event {
                SettingsEvent::RegistryChanged { .. } => {
                    self.session.on_registry_changed();
                }
                SettingsEvent::EntryFieldUpdated { key, .. } => {
                    let _ = self.session.on_entry_field_updated(&key);
                }
                SettingsEvent::RebuildFinished {
                    generation, result, ..
                } => {
                    let _ = self.session.on_rebuild_finished(generation, result);
                }
                _ => {}
            }
        }

        /// Run the oldest rebuild but hold back its result.
        fn enumerate_next(&mut self) -> SettingsEvent {
            assert!(self.executor.run_next(), "no rebuild queued");
            self.rx.try_recv().expect("rebuild result")
        }

        /// Run rebuilds until none is left.
        fn drain(&mut self) {
            while self.executor.run_next() {
                self.pump();
            }
        }

        fn run_next(&mut self) {
            assert!(self.executor.run_next(), "no rebuild queued");
            self.pump();
        }

        fn published_labels(&self) -> Vec<Vec<String>> {
            self.renderer
                .published(self.session.list())
                .iter()
                .map(|snapshot| {
                    snapshot
                        .entries()
                        .iter()
                        .map(|entry| entry.label.clone())
                        .collect()
                })
                .collect()
        }
    }

    fn lexicographic() -> ListQuery {
        ListQuery::new(all_entries, |left: &RegistryEntry, right: &RegistryEntry| {
            left.label.cmp(&right.label)
        })
    }

    fn apps() -> Vec<RegistryEntry> {
        vec![
            RegistryEntry::new("org.b", "B"),
            RegistryEntry::new("org.a", "A"),
            RegistryEntry::new("org.c", "C"),
        ]
    }

    #[test]
    fn open_rebuilds_into_sorted_snapshot() {
        let mut harness = Harness::open(apps(), lexicographic());
        assert_eq!(harness.session.state(), SessionState::Active);
        assert!(harness.session.is_rebuilding());

        harness.run_next();

        assert_eq!(harness.published_labels(), vec![vec!["A", "B", "C"]]);
        assert!(!harness.session.is_rebuilding());
    }

    #[test]
    fn changes_during_rebuild_coalesce_into_one_follow_up() {
        let mut harness = Harness::open(apps(), lexicographic());

        harness.registry.inner().insert(RegistryEntry::new("org.d", "D"));
        harness.registry.inner().insert(RegistryEntry::new("org.e", "E"));
        harness.pump();
        assert!(harness.session.is_dirty());
        assert_eq!(harness.executor.queued(), 1);

        harness.run_next();
        assert_eq!(harness.executor.queued(), 1, "exactly one follow-up");

        harness.run_next();
        assert_eq!(harness.executor.queued(), 0);
        assert_eq!(harness.registry.enumerations(), 2);
        assert_eq!(harness.renderer.published(harness.session.list()).len(), 2);
    }

    #[test]
    fn publication_freshness_strictly_increases() {
        let mut harness = Harness::open(apps(), lexicographic());
        harness.run_next();

        // A result for a generation that is no longer in flight is stale.
        let late = harness
            .session
            .on_rebuild_finished(1, Ok(Vec::new()));
        assert!(matches!(late, Err(Error::StaleCallback(_))));

        harness.registry.inner().remove(&EntryKey::new("org.b"));
        harness.pump();
        harness.run_next();
        harness
            .registry
            .inner()
            .update_fields(&EntryKey::new("org.a"), Some("a.png".to_string()), None)
            .unwrap();
        harness.pump();

        let freshness: Vec<Freshness> = harness
            .renderer
            .published(harness.session.list())
            .iter()
            .map(|snapshot| snapshot.freshness())
            .collect();
        assert_eq!(freshness.len(), 3);
        assert!(freshness.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn field_update_patches_without_rebuild() {
        let mut harness = Harness::open(apps(), lexicographic());
        harness.run_next();
        let first = harness.session.snapshot().unwrap();

        harness
            .registry
            .inner()
            .update_fields(&EntryKey::new("org.b"), Some("b.png".to_string()), Some(2048))
            .unwrap();
        harness.pump();

        assert_eq!(harness.executor.queued(), 0);
        assert_eq!(harness.registry.enumerations(), 1);
        let patched = harness.session.snapshot().unwrap();
        assert_eq!(patched.entries()[1].icon.as_deref(), Some("b.png"));
        assert_eq!(first.entries()[1].icon, None, "published snapshot untouched");
        assert_eq!(
            patched.freshness(),
            Freshness {
                generation: 1,
                revision: 1
            }
        );
    }

    #[test]
    fn relabelled_entry_triggers_rebuild() {
        let mut harness = Harness::open(apps(), lexicographic());
        harness.run_next();

        harness.registry.inner().insert(RegistryEntry::new("org.a", "Z"));
        harness.pump();

        assert_eq!(harness.executor.queued(), 1);
        harness.run_next();
        assert_eq!(
            harness.published_labels().last().unwrap(),
            &vec!["B", "C", "Z"]
        );
    }

    #[test]
    fn release_is_idempotent_and_drops_in_flight_result() {
        let mut harness = Harness::open(apps(), lexicographic());
        assert_eq!(harness.registry.inner().subscriber_count(), 1);

        harness.session.release();
        harness.session.release();

        assert_eq!(harness.session.state(), SessionState::Released);
        assert_eq!(harness.registry.inner().subscriber_count(), 0);
        assert!(!harness.session.on_registry_changed());

        harness.run_next();
        assert!(harness.renderer.published(harness.session.list()).is_empty());
        assert_eq!(harness.executor.queued(), 0);
    }

    #[test]
    fn pause_discards_in_flight_and_resume_catches_up() {
        let mut harness = Harness::open(apps(), lexicographic());

        harness.session.pause();
        harness.registry.inner().insert(RegistryEntry::new("org.d", "D"));
        harness.run_next();
        assert!(harness.renderer.published(harness.session.list()).is_empty());
        assert_eq!(harness.executor.queued(), 0);

        harness.session.resume();
        harness.run_next();
        assert_eq!(harness.published_labels(), vec![vec!["A", "B", "C", "D"]]);
    }

    #[test]
    fn resume_while_cancelled_rebuild_runs_schedules_follow_up() {
        let mut harness = Harness::open(apps(), lexicographic());

        harness.session.pause();
        harness.session.resume();
        assert_eq!(harness.executor.queued(), 1, "no second concurrent rebuild");

        harness.run_next();
        assert!(harness.renderer.published(harness.session.list()).is_empty());
        assert_eq!(harness.executor.queued(), 1);

        harness.run_next();
        assert_eq!(harness.published_labels(), vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn failed_enumeration_keeps_last_snapshot_and_retries() {
        let mut harness = Harness::open(apps(), lexicographic());
        harness.run_next();

        harness.registry.fail_next_enumeration();
        harness.registry.inner().insert(RegistryEntry::new("org.d", "D"));
        harness.pump();
        harness.run_next();

        assert!(harness.session.is_degraded());
        assert_eq!(harness.session.snapshot().unwrap().len(), 3);
        assert_eq!(harness.renderer.notices()[0].kind, NoticeKind::Degraded);

        harness.registry.inner().insert(RegistryEntry::new("org.e", "E"));
        harness.pump();
        harness.run_next();

        assert!(!harness.session.is_degraded());
        assert_eq!(harness.session.snapshot().unwrap().len(), 5);
    }

    fn icon_of(harness: &Harness, key: &str) -> Option<String> {
        let snapshot = harness.session.snapshot().unwrap();
        let index = snapshot.position(&EntryKey::new(key)).unwrap();
        snapshot.entries()[index].icon.clone()
    }

    #[test]
    fn re_enabled_entry_is_rebuilt_into_list() {
        let mut harness = Harness::open(
            vec![
                RegistryEntry::new("org.a", "A"),
                RegistryEntry::new("org.x", "X").disabled(),
            ],
            ListQuery::all_enabled_alphabetical(),
        );
        harness.run_next();
        assert_eq!(harness.published_labels(), vec![vec!["A"]]);

        harness.registry.inner().insert(RegistryEntry::new("org.x", "X"));
        harness.pump();
        assert_eq!(harness.executor.queued(), 1);
        harness.drain();

        assert_eq!(harness.published_labels().last().unwrap(), &vec!["A", "X"]);
    }

    #[test]
    fn field_update_for_hidden_entry_does_not_rebuild() {
        let mut harness = Harness::open(
            vec![
                RegistryEntry::new("org.a", "A"),
                RegistryEntry::new("org.x", "X").disabled(),
            ],
            ListQuery::all_enabled_alphabetical(),
        );
        harness.run_next();

        let key = EntryKey::new("org.x");
        harness
            .registry
            .inner()
            .update_fields(&key, Some("x.png".to_string()), None)
            .unwrap();
        harness.pump();

        assert_eq!(harness.executor.queued(), 0);
        assert_eq!(harness.registry.enumerations(), 1);
    }

    #[test]
    fn field_update_before_first_rebuild_lands_gets_follow_up() {
        let mut harness = Harness::open(apps(), lexicographic());
        let finished = harness.enumerate_next();

        let key = EntryKey::new("org.a");
        harness
            .registry
            .inner()
            .update_fields(&key, Some("a.png".to_string()), None)
            .unwrap();
        harness.pump();
        assert!(harness.session.is_dirty());

        harness.deliver(finished);
        assert_eq!(icon_of(&harness, "org.a"), None);
        harness.drain();

        assert_eq!(icon_of(&harness, "org.a").as_deref(), Some("a.png"));
    }

    #[test]
    fn field_update_racing_rebuild_survives_publication() {
        let mut harness = Harness::open(apps(), lexicographic());
        harness.run_next();

        harness.registry.inner().insert(RegistryEntry::new("org.d", "D"));
        harness.pump();
        let finished = harness.enumerate_next();

        let key = EntryKey::new("org.a");
        harness
            .registry
            .inner()
            .update_fields(&key, Some("a.png".to_string()), None)
            .unwrap();
        harness.pump();
        assert_eq!(icon_of(&harness, "org.a").as_deref(), Some("a.png"));

        harness.deliver(finished);
        harness.drain();

        assert_eq!(icon_of(&harness, "org.a").as_deref(), Some("a.png"));
        assert_eq!(harness.session.snapshot().unwrap().len(), 4);
        assert!(!harness.session.is_rebuilding());
    }
}
