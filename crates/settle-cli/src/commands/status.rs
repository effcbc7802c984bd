use serde::Serialize;
use settle_core::screens::{BackgroundStyle, BatteryStatus, ConfigureAccount, LockscreenLayout};

use crate::app::{App, Paths, SETTLE_TIMEOUT};
use crate::commands::common::{control_items, format_control_line, ControlItem};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub controls: Vec<ControlItem>,
    pub configure_account: Option<ConfigureAccount>,
    pub lockscreen: LockscreenReport,
}

#[derive(Debug, Serialize)]
pub struct LockscreenReport {
    pub layout: LockscreenLayout,
    pub battery_status: BatteryStatus,
    pub background_style: BackgroundStyle,
    pub wallpaper_alpha: f32,
}

pub async fn run_status(paths: &Paths, as_json: bool) -> Result<(), CliError> {
    let mut app = App::open(paths)?;
    app.settle(SETTLE_TIMEOUT).await;
    let report = status_report(&app);
    app.close();
    let report = report?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn status_report(app: &App) -> Result<StatusReport, CliError> {
    let lockscreen = &app.screens.lockscreen;
    Ok(StatusReport {
        controls: control_items(&app.host),
        configure_account: app.screens.privacy.configure_account(&app.host),
        lockscreen: LockscreenReport {
            layout: lockscreen.layout()?,
            battery_status: lockscreen.battery_status()?,
            background_style: lockscreen.background_style()?,
            wallpaper_alpha: lockscreen.wallpaper_alpha()?,
        },
    })
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines: Vec<String> = report.controls.iter().map(format_control_line).collect();

    if let Some(configure) = &report.configure_account {
        let state = if configure.enabled { "" } else { " [disabled]" };
        lines.push(format!("{:<28} {}{state}", "privacy.configure_account", configure.summary));
    }

    let lockscreen = &report.lockscreen;
    lines.push(format!("{:<28} {}", "lockscreen.battery", lockscreen.battery_status));
    lines.push(format!(
        "{:<28} {:?}",
        "lockscreen.background", lockscreen.background_style
    ));
    if lockscreen.layout.wallpaper_alpha {
        lines.push(format!(
            "{:<28} {:.2}",
            "lockscreen.wallpaper_alpha", lockscreen.wallpaper_alpha
        ));
    }
    lines
}
