//! Data models for Settle

mod confirmation;
mod entry;
mod setting;
mod snapshot;
mod toggle;

pub use confirmation::{ChallengeOutcome, ConfirmationKind, ConfirmationRequest, CorrelationToken};
pub use entry::{EntryKey, RegistryEntry};
pub use setting::{ControlId, SettingKey};
pub use snapshot::{Freshness, ListSnapshot};
pub use toggle::{ControlAvailability, ToggleState};
