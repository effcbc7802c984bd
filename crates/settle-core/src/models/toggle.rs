//! Observable state of a confirmation-gated toggle

use serde::{Deserialize, Serialize};

/// Whether the control accepts user interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ControlAvailability {
    #[default]
    Available,
    /// The authority could not be queried; the shown value is not a guess.
    AuthorityUnavailable,
    /// A device policy or a dependent setting keeps the control inert.
    DisabledByPolicy(String),
}

/// State of one boolean control.
///
/// `committed` is the authority's last confirmed value, `displayed` what the
/// control shows, `pending` marks an in-flight round trip.
/// Invariant: `!pending` implies `displayed == committed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToggleState {
    pub displayed: bool,
    pub committed: bool,
    pub pending: bool,
    #[serde(default)]
    pub availability: ControlAvailability,
}

impl ToggleState {
    /// Settled state showing the authority's value.
    #[must_use]
    pub const fn settled(committed: bool) -> Self {
        Self {
            displayed: committed,
            committed,
            pending: false,
            availability: ControlAvailability::Available,
        }
    }

    /// State used when the authority could not be reached.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            displayed: false,
            committed: false,
            pending: false,
            availability: ControlAvailability::AuthorityUnavailable,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.availability == ControlAvailability::Available
    }

    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.pending || self.displayed == self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_state_is_consistent() {
        assert!(ToggleState::settled(true).is_consistent());
        assert!(ToggleState::settled(false).is_consistent());
    }

    #[test]
    fn unreachable_state_is_disabled_and_off() {
        let state = ToggleState::unreachable();
        assert!(!state.is_enabled());
        assert!(!state.displayed);
        assert!(!state.committed);
    }

    #[test]
    fn mismatch_is_only_consistent_while_pending() {
        let mut state = ToggleState {
            displayed: true,
            committed: false,
            pending: true,
            availability: ControlAvailability::Available,
        };
        assert!(state.is_consistent());
        state.pending = false;
        assert!(!state.is_consistent());
    }
}
