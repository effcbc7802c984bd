//! Registry collaborators: live external collections mirrored by list views.

mod memory;

use std::sync::Arc;

use crate::error::RegistryError;
use crate::models::{EntryKey, RegistryEntry};

pub use memory::MemoryRegistry;

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    EntryAdded(EntryKey),
    EntryRemoved(EntryKey),
    /// An auxiliary field (icon, size) of an existing entry became available.
    EntryFieldUpdated(EntryKey),
    BulkReset,
}

pub trait RegistryListener: Send + Sync {
    fn on_change(&self, change: RegistryChange);
}

/// Opaque subscription id returned by [`Registry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(pub(crate) u64);

/// A mutable external collection of entries.
///
/// `enumerate` may be slow and is only called off the event path.
pub trait Registry: Send + Sync {
    fn enumerate(&self) -> Result<Vec<RegistryEntry>, RegistryError>;

    fn lookup(&self, key: &EntryKey) -> Option<RegistryEntry>;

    fn subscribe(&self, listener: Arc<dyn RegistryListener>) -> SubscriptionHandle;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}
