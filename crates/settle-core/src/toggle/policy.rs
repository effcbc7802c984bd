//! Per-toggle transition policy.

use crate::models::ConfirmationKind;

/// What the control shows while a round trip is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDisplay {
    /// Show the requested value right away (non-destructive opt-ins).
    Optimistic,
    /// Keep showing the committed value until the authority agrees
    /// (destructive or irreversible transitions).
    HoldCommitted,
}

/// Confirmation step required before the authority is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub kind: ConfirmationKind,
    pub reason: String,
}

impl Confirmation {
    pub fn secondary(reason: impl Into<String>) -> Self {
        Self {
            kind: ConfirmationKind::Secondary,
            reason: reason.into(),
        }
    }

    pub fn reauth(reason: impl Into<String>) -> Self {
        Self {
            kind: ConfirmationKind::Reauth,
            reason: reason.into(),
        }
    }
}

/// Policy for one direction of a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPolicy {
    pub confirmation: Option<Confirmation>,
    pub display: PendingDisplay,
}

impl TransitionPolicy {
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            confirmation: None,
            display: PendingDisplay::Optimistic,
        }
    }

    #[must_use]
    pub const fn confirmed(confirmation: Confirmation, display: PendingDisplay) -> Self {
        Self {
            confirmation: Some(confirmation),
            display,
        }
    }
}

/// Policy for both directions of a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TogglePolicy {
    pub turn_on: TransitionPolicy,
    pub turn_off: TransitionPolicy,
}

impl TogglePolicy {
    /// No confirmation either way.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            turn_on: TransitionPolicy::immediate(),
            turn_off: TransitionPolicy::immediate(),
        }
    }

    /// Turning off is irreversible: it needs an explicit yes and keeps
    /// showing "on" until the authority confirms.
    pub fn destructive_off(reason: impl Into<String>) -> Self {
        Self {
            turn_on: TransitionPolicy::immediate(),
            turn_off: TransitionPolicy::confirmed(
                Confirmation::secondary(reason),
                PendingDisplay::HoldCommitted,
            ),
        }
    }

    /// Both directions need re-authentication; opting in is shown
    /// optimistically, opting out holds the committed value.
    pub fn reauth_both(opt_in_reason: impl Into<String>, opt_out_reason: impl Into<String>) -> Self {
        Self {
            turn_on: TransitionPolicy::confirmed(
                Confirmation::reauth(opt_in_reason),
                PendingDisplay::Optimistic,
            ),
            turn_off: TransitionPolicy::confirmed(
                Confirmation::reauth(opt_out_reason),
                PendingDisplay::HoldCommitted,
            ),
        }
    }

    #[must_use]
    pub const fn for_target(&self, target: bool) -> &TransitionPolicy {
        if target {
            &self.turn_on
        } else {
            &self.turn_off
        }
    }
}

impl Default for TogglePolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destructive_off_only_gates_turning_off() {
        let policy = TogglePolicy::destructive_off("Erase backup data?");
        assert_eq!(policy.for_target(true), &TransitionPolicy::immediate());

        let off = policy.for_target(false);
        assert_eq!(off.display, PendingDisplay::HoldCommitted);
        assert_eq!(
            off.confirmation.as_ref().map(|confirmation| confirmation.kind),
            Some(ConfirmationKind::Secondary)
        );
    }

    #[test]
    fn reauth_both_differs_in_pending_display() {
        let policy = TogglePolicy::reauth_both("Confirm to lock", "Confirm to unlock");
        assert_eq!(policy.for_target(true).display, PendingDisplay::Optimistic);
        assert_eq!(policy.for_target(false).display, PendingDisplay::HoldCommitted);
    }
}
