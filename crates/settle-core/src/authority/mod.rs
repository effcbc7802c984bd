//! Authority collaborators: the external owners of a setting's true value.

mod spawned;
mod store;

use crate::error::AuthorityError;
use crate::models::{ConfirmationRequest, CorrelationToken, SettingKey};

pub use spawned::SpawnedAuthority;
pub use store::StoreAuthority;

/// Verdict of an authority on a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Success,
    Rejected(String),
    Unavailable,
}

/// How a commit call completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitDispatch {
    /// The verdict is known immediately.
    Completed(CommitOutcome),
    /// The verdict will arrive later as a `CommitCompleted` event carrying
    /// the same correlation token.
    Deferred,
}

/// Reads and changes the authoritative value of boolean settings.
///
/// Implementations are shared by every coordinator bound to the same
/// authority, so they must not keep per-control state.
pub trait AuthorityAdapter: Send + Sync {
    fn query_state(&self, setting: &SettingKey) -> Result<bool, AuthorityError>;

    fn commit(&self, setting: &SettingKey, value: bool, token: CorrelationToken) -> CommitDispatch;
}

/// Presents a confirmation step (dialog or credential challenge).
///
/// The answer is delivered back onto the event path as
/// `SettingsEvent::ConfirmationResolved` (or `ConfirmationDismissed`) with
/// the request's correlation token.
pub trait ConfirmationPresenter: Send + Sync {
    fn present(&self, request: ConfirmationRequest);
}
