//! Off-path execution of registry rebuilds.

use std::sync::Arc;

use tokio::runtime::Handle;

use super::ListQuery;
use crate::error::{Error, Result};
use crate::models::ControlId;
use crate::registry::Registry;
use crate::runtime::{EventSender, SettingsEvent};

/// One rebuild pass: enumerate, filter, sort, report back.
pub struct RebuildJob {
    list: ControlId,
    generation: u64,
    registry: Arc<dyn Registry>,
    query: ListQuery,
    reply: EventSender,
}

impl RebuildJob {
    pub(crate) fn new(
        list: ControlId,
        generation: u64,
        registry: Arc<dyn Registry>,
        query: ListQuery,
        reply: EventSender,
    ) -> Self {
        Self {
            list,
            generation,
            registry,
            query,
            reply,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Run the pass on the current thread and post `RebuildFinished`.
    pub fn run(self) {
        let result = self
            .registry
            .enumerate()
            .map(|entries| self.query.apply(entries));
        let event = SettingsEvent::RebuildFinished {
            list: self.list,
            generation: self.generation,
            result,
        };
        if self.reply.send(event).is_err() {
            tracing::debug!("Event path closed; dropping rebuild {}", self.generation);
        }
    }
}

/// Runs rebuild jobs somewhere other than the event path.
pub trait RebuildExecutor: Send + Sync {
    fn execute(&self, job: RebuildJob);
}

/// Runs each job on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct TokioRebuildExecutor {
    handle: Handle,
}

impl TokioRebuildExecutor {
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor bound to the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|error| Error::InvalidInput(format!("rebuilds need a tokio runtime: {error}")))
    }
}

impl RebuildExecutor for TokioRebuildExecutor {
    fn execute(&self, job: RebuildJob) {
        self.handle.spawn_blocking(move || job.run());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistryEntry;
    use crate::registry::MemoryRegistry;

    #[test]
    fn current_requires_a_runtime() {
        assert!(TokioRebuildExecutor::current().is_err());
    }

    #[tokio::test]
    async fn tokio_executor_reports_sorted_entries() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let registry = Arc::new(MemoryRegistry::with_entries([
            RegistryEntry::new("org.b", "Beta"),
            RegistryEntry::new("org.a", "Alpha"),
        ]));
        let job = RebuildJob::new(
            ControlId::new("expanded_desktop.apps"),
            4,
            registry,
            ListQuery::all_enabled_alphabetical(),
            tx,
        );

        TokioRebuildExecutor::current().unwrap().execute(job);

        match rx.recv().await {
            Some(SettingsEvent::RebuildFinished {
                generation, result, ..
            }) => {
                assert_eq!(generation, 4);
                let entries = result.unwrap();
                assert_eq!(entries[0].label, "Alpha");
                assert_eq!(entries[1].label, "Beta");
            }
            _ => panic!("expected RebuildFinished"),
        }
    }
}
