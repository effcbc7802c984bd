//! Confirmation-gated toggles.
//!
//! A [`ToggleCoordinator`] keeps one boolean control consistent with the
//! authority that owns the underlying setting. A requested change may need a
//! confirmation step, may complete synchronously or through a later event,
//! and may fail; in every case the control ends up showing the authority's
//! last known value.

mod locks;
mod policy;

use std::sync::Arc;

pub use locks::SettingLocks;
pub use policy::{Confirmation, PendingDisplay, TogglePolicy, TransitionPolicy};

use crate::authority::{AuthorityAdapter, CommitDispatch, CommitOutcome, ConfirmationPresenter};
use crate::error::{Error, Result};
use crate::models::{
    ChallengeOutcome, ConfirmationRequest, ControlAvailability, ControlId, CorrelationToken,
    SettingKey, ToggleState,
};
use crate::render::{Notice, NoticeKind, Renderer};

/// Collaborators shared by the coordinators of one authority.
#[derive(Clone)]
pub struct ToggleContext {
    pub authority: Arc<dyn AuthorityAdapter>,
    pub presenter: Arc<dyn ConfirmationPresenter>,
    pub renderer: Arc<dyn Renderer>,
    pub locks: SettingLocks,
}

/// Why a request did not start a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// This control is still finishing its previous round trip
    Busy,
    /// Another control holds a round trip for the same setting
    SettingBusy,
    /// The target equals the committed value
    Unchanged,
    /// The control is unavailable or blocked by policy
    Disabled,
    /// The owning screen is gone
    Detached,
    NothingPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Committed,
    RolledBack,
    AwaitingConfirmation,
    AwaitingAuthority,
    Ignored(IgnoredReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingConfirmation,
    AwaitingCommit,
}

#[derive(Debug, Clone, Copy)]
struct RoundTrip {
    token: CorrelationToken,
    target: bool,
    phase: Phase,
}

pub struct ToggleCoordinator {
    control: ControlId,
    setting: SettingKey,
    policy: TogglePolicy,
    context: ToggleContext,
    state: ToggleState,
    authority_reachable: bool,
    policy_block: Option<String>,
    round_trip: Option<RoundTrip>,
    attached: bool,
}

impl ToggleCoordinator {
    pub fn new(
        control: impl Into<ControlId>,
        setting: impl Into<SettingKey>,
        policy: TogglePolicy,
        context: ToggleContext,
    ) -> Self {
        Self {
            control: control.into(),
            setting: setting.into(),
            policy,
            context,
            state: ToggleState::default(),
            authority_reachable: true,
            policy_block: None,
            round_trip: None,
            attached: true,
        }
    }

    #[must_use]
    pub const fn control(&self) -> &ControlId {
        &self.control
    }

    #[must_use]
    pub const fn setting(&self) -> &SettingKey {
        &self.setting
    }

    #[must_use]
    pub const fn state(&self) -> &ToggleState {
        &self.state
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.round_trip.is_some()
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether `token` belongs to this control's current round trip.
    #[must_use]
    pub fn owns(&self, token: CorrelationToken) -> bool {
        self.round_trip
            .is_some_and(|round_trip| round_trip.token == token)
    }

    /// Query the authority and show its value.
    ///
    /// An unreachable authority yields `committed = displayed = false` and an
    /// `AuthorityUnavailable` control instead of a guessed value. Called again
    /// on resume; a pending round trip is left alone.
    pub fn initialize(&mut self) -> ToggleState {
        if self.round_trip.is_some() {
            tracing::debug!("Skipping refresh of {} while a round trip is pending", self.control);
            return self.state.clone();
        }

        match self.context.authority.query_state(&self.setting) {
            Ok(value) => {
                self.authority_reachable = true;
                self.state.committed = value;
                self.state.displayed = value;
            }
            Err(error) => {
                tracing::warn!(
                    "Authority for {} unavailable, disabling {}: {}",
                    self.setting,
                    self.control,
                    error
                );
                self.authority_reachable = false;
                self.state.committed = false;
                self.state.displayed = false;
            }
        }
        self.state.pending = false;
        self.state.availability = self.availability();
        self.render();
        self.state.clone()
    }

    /// Keep the control inert for `reason` (device policy or a prerequisite
    /// setting), or lift the block with `None`.
    pub fn set_policy_block(&mut self, reason: Option<String>) {
        if self.policy_block == reason {
            return;
        }
        self.policy_block = reason;
        self.state.availability = self.availability();
        self.render();
    }

    /// Start a round trip towards `target`.
    pub fn request_change(&mut self, target: bool) -> RequestOutcome {
        if !self.attached {
            return RequestOutcome::Ignored(IgnoredReason::Detached);
        }
        if self.round_trip.is_some() {
            tracing::debug!("Ignoring request on {}: round trip in flight", self.control);
            return RequestOutcome::Ignored(IgnoredReason::Busy);
        }
        if !self.state.is_enabled() {
            return RequestOutcome::Ignored(IgnoredReason::Disabled);
        }
        if target == self.state.committed {
            return RequestOutcome::Ignored(IgnoredReason::Unchanged);
        }
        if !self.context.locks.try_acquire(&self.setting) {
            tracing::debug!(
                "Ignoring request on {}: {} is busy on another control",
                self.control,
                self.setting
            );
            return RequestOutcome::Ignored(IgnoredReason::SettingBusy);
        }

        let transition = self.policy.for_target(target).clone();
        let token = CorrelationToken::new();
        self.state.pending = true;
        self.state.displayed = match transition.display {
            PendingDisplay::Optimistic => target,
            PendingDisplay::HoldCommitted => self.state.committed,
        };

        let Some(confirmation) = transition.confirmation else {
            return self.dispatch_commit(token, target);
        };

        self.round_trip = Some(RoundTrip {
            token,
            target,
            phase: Phase::AwaitingConfirmation,
        });
        self.render();
        tracing::info!(
            "Awaiting {:?} confirmation for {} -> {}",
            confirmation.kind,
            self.setting,
            target
        );
        self.context.presenter.present(ConfirmationRequest {
            setting: self.setting.clone(),
            target_value: target,
            kind: confirmation.kind,
            reason: confirmation.reason,
            correlation_token: token,
        });
        RequestOutcome::AwaitingConfirmation
    }

    /// Apply the answer to a confirmation request.
    pub fn on_confirmation(
        &mut self,
        token: CorrelationToken,
        outcome: ChallengeOutcome,
    ) -> Result<RequestOutcome> {
        let round_trip = self.matching(token, Phase::AwaitingConfirmation)?;
        Ok(match outcome {
            ChallengeOutcome::Approved => self.dispatch_commit(round_trip.token, round_trip.target),
            ChallengeOutcome::Declined => self.roll_back(Error::ReauthDeclined(self.setting.clone())),
        })
    }

    /// Apply a deferred authority verdict.
    pub fn on_commit_result(
        &mut self,
        token: CorrelationToken,
        outcome: CommitOutcome,
    ) -> Result<RequestOutcome> {
        let round_trip = self.matching(token, Phase::AwaitingCommit)?;
        Ok(self.apply_outcome(round_trip.target, outcome))
    }

    /// The confirmation step was dismissed without a decision.
    ///
    /// Once the authority has been called the round trip can no longer be
    /// cancelled; its verdict is still awaited.
    pub fn cancel_pending(&mut self) -> RequestOutcome {
        match self.round_trip.map(|round_trip| round_trip.phase) {
            Some(Phase::AwaitingConfirmation) => {
                self.roll_back(Error::ReauthDeclined(self.setting.clone()))
            }
            Some(Phase::AwaitingCommit) => {
                tracing::debug!("Cannot cancel {}: commit already dispatched", self.control);
                RequestOutcome::AwaitingAuthority
            }
            None => RequestOutcome::Ignored(IgnoredReason::NothingPending),
        }
    }

    /// Give up on the current round trip after a terminal timeout.
    ///
    /// An unanswered confirmation reverts like a cancel. An unanswered commit
    /// leaves the authority's value unknown, so it is queried again.
    pub fn expire_pending(&mut self) -> RequestOutcome {
        match self.round_trip.map(|round_trip| round_trip.phase) {
            Some(Phase::AwaitingConfirmation) => {
                self.roll_back(Error::ReauthDeclined(self.setting.clone()))
            }
            Some(Phase::AwaitingCommit) => {
                tracing::warn!(
                    "Commit of {} timed out; re-reading authority state",
                    self.setting
                );
                self.finish();
                self.state.displayed = self.state.committed;
                self.initialize();
                RequestOutcome::RolledBack
            }
            None => RequestOutcome::Ignored(IgnoredReason::NothingPending),
        }
    }

    /// The owning screen is gone. A pending round trip is abandoned and any
    /// late answer is discarded as stale.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if self.round_trip.is_some() {
            tracing::info!("Abandoning pending round trip on {}", self.control);
            self.finish();
            self.state.displayed = self.state.committed;
        }
    }

    fn dispatch_commit(&mut self, token: CorrelationToken, target: bool) -> RequestOutcome {
        self.round_trip = Some(RoundTrip {
            token,
            target,
            phase: Phase::AwaitingCommit,
        });
        self.render();

        match self.context.authority.commit(&self.setting, target, token) {
            CommitDispatch::Completed(outcome) => self.apply_outcome(target, outcome),
            CommitDispatch::Deferred => {
                tracing::debug!("Commit of {} -> {} deferred ({})", self.setting, target, token);
                RequestOutcome::AwaitingAuthority
            }
        }
    }

    fn apply_outcome(&mut self, target: bool, outcome: CommitOutcome) -> RequestOutcome {
        match outcome {
            CommitOutcome::Success => {
                self.finish();
                self.state.committed = target;
                self.state.displayed = target;
                self.render();
                tracing::info!("Committed {} = {}", self.setting, target);
                RequestOutcome::Committed
            }
            CommitOutcome::Rejected(reason) => self.roll_back(Error::CommitRejected {
                setting: self.setting.clone(),
                reason,
            }),
            CommitOutcome::Unavailable => {
                self.roll_back(Error::AuthorityUnavailable(self.setting.clone()))
            }
        }
    }

    fn roll_back(&mut self, cause: Error) -> RequestOutcome {
        self.finish();
        self.state.displayed = self.state.committed;

        let kind = match &cause {
            Error::ReauthDeclined(_) => {
                tracing::info!("{} left at {}: {}", self.control, self.state.committed, cause);
                None
            }
            Error::AuthorityUnavailable(_) => Some(NoticeKind::Unavailable),
            _ => Some(NoticeKind::Reverted),
        };
        if let Some(kind) = kind {
            tracing::warn!("Reverting {} to {}: {}", self.control, self.state.committed, cause);
            self.context
                .renderer
                .notify(Notice::new(&self.control, kind, cause.to_string()));
        }

        self.render();
        RequestOutcome::RolledBack
    }

    fn finish(&mut self) {
        if self.round_trip.take().is_some() {
            self.context.locks.release(&self.setting);
        }
        self.state.pending = false;
    }

    fn matching(&self, token: CorrelationToken, phase: Phase) -> Result<RoundTrip> {
        self.round_trip
            .filter(|round_trip| {
                self.attached && round_trip.token == token && round_trip.phase == phase
            })
            .ok_or_else(|| Error::StaleCallback(format!("{} on {}", token, self.control)))
    }

    fn availability(&self) -> ControlAvailability {
        if !self.authority_reachable {
            return ControlAvailability::AuthorityUnavailable;
        }
        self.policy_block
            .clone()
            .map_or(ControlAvailability::Available, ControlAvailability::DisabledByPolicy)
    }

    fn render(&self) {
        debug_assert!(self.state.is_consistent(), "{:?}", self.state);
        if self.attached {
            self.context
                .renderer
                .set_control_state(&self.control, &self.state);
        }
    }
}
