use serde::Serialize;
use settle_core::models::{ControlAvailability, ControlId, SettingKey, ToggleState};
use settle_core::screens::AppRow;
use settle_core::{SettingsHost, ToggleCoordinator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlItem {
    pub control: ControlId,
    pub setting: SettingKey,
    #[serde(flatten)]
    pub state: ToggleState,
}

pub fn control_item(toggle: &ToggleCoordinator) -> ControlItem {
    ControlItem {
        control: toggle.control().clone(),
        setting: toggle.setting().clone(),
        state: toggle.state().clone(),
    }
}

pub fn control_items(host: &SettingsHost) -> Vec<ControlItem> {
    host.toggles().map(control_item).collect()
}

pub fn format_control_line(item: &ControlItem) -> String {
    let value = if item.state.displayed { "on" } else { "off" };
    let mut line = format!("{:<28} {value}", item.control.as_str());
    if item.state.pending {
        line.push_str(" (pending)");
    }
    match &item.state.availability {
        ControlAvailability::Available => {}
        ControlAvailability::AuthorityUnavailable => line.push_str(" [unavailable]"),
        ControlAvailability::DisabledByPolicy(reason) => {
            line.push_str(&format!(" [disabled: {reason}]"));
        }
    }
    line
}

pub fn format_app_line(row: &AppRow) -> String {
    format!("{} ({}): {}", row.label, row.package, row.mode.label())
}
