//! Terminal-side renderer and confirmation presenter.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use settle_core::authority::ConfirmationPresenter;
use settle_core::models::{
    ChallengeOutcome, ConfirmationRequest, ControlId, ListSnapshot, ToggleState,
};
use settle_core::render::{Notice, Renderer};

use crate::error::CliError;

/// Prints notices to stderr; state changes only go to the log.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn set_control_state(&self, control: &ControlId, state: &ToggleState) {
        tracing::debug!("{} shows {:?}", control, state);
    }

    fn publish(&self, list: &ControlId, snapshot: Arc<ListSnapshot>) {
        tracing::debug!(
            "{} published {} entries ({:?})",
            list,
            snapshot.len(),
            snapshot.freshness()
        );
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!("{:?} notice for {}", notice.kind, notice.control);
        eprintln!("{}: {}", notice.control, notice.message);
    }
}

/// Queues confirmation requests until the command answers them.
#[derive(Debug, Default)]
pub struct QueuedPresenter {
    requests: Mutex<VecDeque<ConfirmationRequest>>,
}

impl QueuedPresenter {
    pub fn next_request(&self) -> Option<ConfirmationRequest> {
        self.requests().pop_front()
    }

    fn requests(&self) -> MutexGuard<'_, VecDeque<ConfirmationRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ConfirmationPresenter for QueuedPresenter {
    fn present(&self, request: ConfirmationRequest) {
        tracing::debug!("Confirmation requested for {}", request.setting);
        self.requests().push_back(request);
    }
}

/// Map a typed answer to an outcome. Anything but yes declines.
pub fn parse_answer(answer: &str) -> ChallengeOutcome {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ChallengeOutcome::Approved,
        _ => ChallengeOutcome::Declined,
    }
}

pub fn prompt_text(request: &ConfirmationRequest) -> String {
    let action = if request.target_value { "on" } else { "off" };
    if request.requires_reauth() {
        format!(
            "{}\nConfirm your account credentials to turn {} {} [y/N]: ",
            request.reason, request.setting, action
        )
    } else {
        format!("{}\nTurn {} {}? [y/N]: ", request.reason, request.setting, action)
    }
}

/// Ask on stdin. `None` means stdin was closed, i.e. the prompt was dismissed.
pub async fn prompt(request: &ConfirmationRequest) -> Result<Option<ChallengeOutcome>, CliError> {
    let text = prompt_text(request);
    let answer = tokio::task::spawn_blocking(move || -> io::Result<Option<ChallengeOutcome>> {
        let mut stderr = io::stderr();
        stderr.write_all(text.as_bytes())?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok(if read == 0 {
            None
        } else {
            Some(parse_answer(&line))
        })
    })
    .await
    .map_err(|error| CliError::Prompt(error.to_string()))??;
    Ok(answer)
}
