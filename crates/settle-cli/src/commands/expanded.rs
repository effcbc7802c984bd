use settle_core::screens::{ImmersiveMode, PolicyControl};

use crate::app::{App, Paths, SETTLE_TIMEOUT};
use crate::cli::ExpandedAction;
use crate::error::CliError;

pub async fn run_expanded(paths: &Paths, action: ExpandedAction) -> Result<(), CliError> {
    let mut app = App::open(paths)?;
    let policy = apply_expanded(&mut app, action).await;
    app.close();
    println!("{}", format_policy(&policy?));
    Ok(())
}

pub async fn apply_expanded(
    app: &mut App,
    action: ExpandedAction,
) -> Result<PolicyControl, CliError> {
    match action {
        ExpandedAction::EnableAll => app.screens.expanded_desktop.enable_for_all()?,
        ExpandedAction::DisableAll => app.screens.expanded_desktop.disable_for_all()?,
        ExpandedAction::Set { package, mode } => {
            let mode: ImmersiveMode = mode.parse()?;
            // The app has to be in the published list first.
            app.settle(SETTLE_TIMEOUT).await;
            app.screens
                .expanded_desktop
                .set_mode(&app.host, package.trim(), mode)?;
        }
    }
    Ok(app.screens.expanded_desktop.policy()?)
}

pub fn format_policy(policy: &PolicyControl) -> String {
    let value = policy.to_string();
    if value.is_empty() {
        "policy_control: (empty)".to_string()
    } else {
        format!("policy_control: {value}")
    }
}
