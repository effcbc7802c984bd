//! Rendering sinks.

use std::sync::Arc;

use serde::Serialize;

use crate::models::{ControlId, ListSnapshot, ToggleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A toggle snapped back to its committed value
    Reverted,
    /// The authority could not be reached
    Unavailable,
    /// A list keeps showing its last good snapshot
    Degraded,
}

/// Transient, user-visible message accompanying a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub control: ControlId,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(control: &ControlId, kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            control: control.clone(),
            kind,
            message: message.into(),
        }
    }
}

/// One-way display sink. Nothing is returned beyond "accepted for display".
pub trait Renderer: Send + Sync {
    fn set_control_state(&self, control: &ControlId, state: &ToggleState);

    fn publish(&self, list: &ControlId, snapshot: Arc<ListSnapshot>);

    fn notify(&self, notice: Notice) {
        tracing::info!("{}: {}", notice.control, notice.message);
    }
}
