//! settle-core - Core library for Settle
//!
//! Confirmation-gated toggles kept consistent with the authority that owns
//! each setting, list views kept in sync with a live registry, and the
//! device settings screens built from them.

pub mod authority;
pub mod config;
pub mod error;
pub mod list_sync;
pub mod models;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod screens;
pub mod store;
pub mod toggle;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use list_sync::ListSyncSession;
pub use runtime::{SettingsEvent, SettingsHost};
pub use toggle::ToggleCoordinator;
