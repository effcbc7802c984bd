//! Runs a blocking authority off the event path.

use std::sync::Arc;

use tokio::runtime::Handle;

use super::{AuthorityAdapter, CommitDispatch};
use crate::error::AuthorityError;
use crate::models::{CorrelationToken, SettingKey};
use crate::runtime::{EventSender, SettingsEvent};

/// Wraps a slow, blocking authority (e.g. an account service that confirms
/// credentials) so commits run on the blocking pool and report back through
/// a `CommitCompleted` event.
pub struct SpawnedAuthority {
    inner: Arc<dyn AuthorityAdapter>,
    handle: Handle,
    events: EventSender,
}

impl SpawnedAuthority {
    pub const fn new(inner: Arc<dyn AuthorityAdapter>, handle: Handle, events: EventSender) -> Self {
        Self {
            inner,
            handle,
            events,
        }
    }
}

impl AuthorityAdapter for SpawnedAuthority {
    fn query_state(&self, setting: &SettingKey) -> Result<bool, AuthorityError> {
        self.inner.query_state(setting)
    }

    fn commit(&self, setting: &SettingKey, value: bool, token: CorrelationToken) -> CommitDispatch {
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let setting = setting.clone();
        self.handle.spawn_blocking(move || {
            let CommitDispatch::Completed(outcome) = inner.commit(&setting, value, token) else {
                // The inner adapter reports on its own.
                return;
            };
            if events
                .send(SettingsEvent::CommitCompleted { token, outcome })
                .is_err()
            {
                tracing::debug!("Event path closed before commit of {} completed", setting);
            }
        });
        CommitDispatch::Deferred
    }
}
