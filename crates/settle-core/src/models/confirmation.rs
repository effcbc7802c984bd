//! Confirmation request/response messages

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SettingKey;

/// Correlates a confirmation or commit response with the round trip that
/// issued it. UUID v7, so tokens sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of confirmation step gating a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// A yes/no dialog (e.g. "erase backup data?")
    Secondary,
    /// The user must re-enter credentials
    Reauth,
}

/// Emitted by a toggle coordinator; answered exactly once with a
/// [`ChallengeOutcome`] carrying the same token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub setting: SettingKey,
    pub target_value: bool,
    pub kind: ConfirmationKind,
    /// Short user-facing explanation of what is being confirmed.
    pub reason: String,
    pub correlation_token: CorrelationToken,
}

impl ConfirmationRequest {
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        self.kind == ConfirmationKind::Reauth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeOutcome {
    Approved,
    Declined,
}
