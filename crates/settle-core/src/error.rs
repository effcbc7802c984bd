//! Error types for settle-core

use thiserror::Error;

use crate::models::{EntryKey, SettingKey};

/// Result type alias using settle-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in settle-core operations.
///
/// The first five variants form the failure taxonomy of the toggle and list
/// components. They are produced and handled inside the component that hits
/// them; callers only ever observe them through logs and notices.
#[derive(Error, Debug)]
pub enum Error {
    /// The authority process could not be reached
    #[error("Authority unavailable for {0}")]
    AuthorityUnavailable(SettingKey),

    /// The authority explicitly refused the change
    #[error("Commit rejected for {setting}: {reason}")]
    CommitRejected { setting: SettingKey, reason: String },

    /// The user declined the confirmation step
    #[error("Confirmation declined for {0}")]
    ReauthDeclined(SettingKey),

    /// A registry rebuild could not complete
    #[error("Registry enumeration failed: {0}")]
    RegistryEnumerationFailed(String),

    /// A response arrived for a control or session that is no longer live
    #[error("Stale callback discarded: {0}")]
    StaleCallback(String),

    /// Opting in needs a signed-in account first
    #[error("Account setup required before {0} can be enabled")]
    AccountSetupRequired(SettingKey),

    /// Entry lookup miss
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryKey),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid device profile
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings store error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failure reported by an authority adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("authority is unreachable")]
    Unavailable,
    #[error("authority rejected the request: {0}")]
    Rejected(String),
}

impl AuthorityError {
    /// Lift into the crate error taxonomy for the given setting.
    pub fn into_error(self, setting: &SettingKey) -> Error {
        match self {
            Self::Unavailable => Error::AuthorityUnavailable(setting.clone()),
            Self::Rejected(reason) => Error::CommitRejected {
                setting: setting.clone(),
                reason,
            },
        }
    }
}

/// Failure reported by a registry enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RegistryError(pub String);

impl From<RegistryError> for Error {
    fn from(value: RegistryError) -> Self {
        Self::RegistryEnumerationFailed(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_error_maps_into_taxonomy() {
        let key = SettingKey::new("backup_data");
        assert!(matches!(
            AuthorityError::Unavailable.into_error(&key),
            Error::AuthorityUnavailable(_)
        ));

        let rejected = AuthorityError::Rejected("quota".to_string()).into_error(&key);
        assert_eq!(rejected.to_string(), "Commit rejected for backup_data: quota");
    }

    #[test]
    fn registry_error_maps_to_enumeration_failure() {
        let error: Error = RegistryError("package service died".to_string()).into();
        assert!(matches!(error, Error::RegistryEnumerationFailed(_)));
    }
}
