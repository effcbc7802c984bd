use settle_core::models::{ChallengeOutcome, ControlId};
use settle_core::toggle::{IgnoredReason, RequestOutcome};
use settle_core::SettingsEvent;

use crate::app::{App, Paths, SETTLE_TIMEOUT};
use crate::cli::Switch;
use crate::commands::common::{control_item, format_control_line, ControlItem};
use crate::console::prompt;
use crate::error::CliError;

pub async fn run_set(
    paths: &Paths,
    control: &str,
    value: Switch,
    assume_yes: bool,
) -> Result<(), CliError> {
    let mut app = App::open(paths)?;
    let item = change_control(&mut app, control, value.is_on(), assume_yes).await;
    app.close();
    println!("{}", format_control_line(&item?));
    Ok(())
}

/// One full round trip: request, confirm, wait for the authority.
pub async fn change_control(
    app: &mut App,
    control: &str,
    target: bool,
    assume_yes: bool,
) -> Result<ControlItem, CliError> {
    let control = ControlId::new(control.trim());
    app.settle(SETTLE_TIMEOUT).await;

    let outcome = app.screens.request_change(&mut app.host, &control, target)?;
    tracing::debug!("{} -> {}: {:?}", control, target, outcome);
    match outcome {
        RequestOutcome::Ignored(IgnoredReason::Disabled) => {
            return Err(CliError::ControlDisabled(control.to_string()));
        }
        RequestOutcome::Ignored(IgnoredReason::Busy | IgnoredReason::SettingBusy) => {
            return Err(CliError::ControlBusy(control.to_string()));
        }
        _ => {}
    }

    answer_confirmations(app, assume_yes).await?;
    app.settle(SETTLE_TIMEOUT).await;

    app.host
        .toggle(&control)
        .map(control_item)
        .ok_or_else(|| CliError::Config(format!("control {control} is not installed")))
}

async fn answer_confirmations(app: &App, assume_yes: bool) -> Result<(), CliError> {
    let events = app.host.sender();
    while let Some(request) = app.presenter.next_request() {
        let token = request.correlation_token;
        let event = if assume_yes {
            SettingsEvent::ConfirmationResolved {
                token,
                outcome: ChallengeOutcome::Approved,
            }
        } else {
            match prompt(&request).await? {
                Some(outcome) => SettingsEvent::ConfirmationResolved { token, outcome },
                None => SettingsEvent::ConfirmationDismissed { token },
            }
        };
        if events.send(event).is_err() {
            tracing::debug!("Event path closed; dropping answer for {}", token);
        }
    }
    Ok(())
}
