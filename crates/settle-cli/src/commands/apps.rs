use chrono::{DateTime, Utc};
use serde::Serialize;
use settle_core::screens::AppRow;
use settle_core::ListSyncSession;

use crate::app::{App, Paths, SETTLE_TIMEOUT};
use crate::commands::common::format_app_line;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct AppsReport {
    /// When the shown snapshot was built; `None` before the first rebuild.
    pub built_at: Option<DateTime<Utc>>,
    pub apps: Vec<AppRow>,
}

pub async fn run_apps(paths: &Paths, as_json: bool) -> Result<(), CliError> {
    let mut app = App::open(paths)?;
    app.settle(SETTLE_TIMEOUT).await;
    let report = apps_report(&app);
    app.close();
    let report = report?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.apps.is_empty() {
        println!("No apps.");
    } else {
        for line in format_apps_lines(&report) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn apps_report(app: &App) -> Result<AppsReport, CliError> {
    let screen = &app.screens.expanded_desktop;
    let built_at = app
        .host
        .list(screen.list())
        .and_then(ListSyncSession::snapshot)
        .map(|snapshot| snapshot.built_at());
    Ok(AppsReport {
        built_at,
        apps: screen.rows(&app.host)?,
    })
}

pub fn format_apps_lines(report: &AppsReport) -> Vec<String> {
    let mut lines: Vec<String> = report.apps.iter().map(format_app_line).collect();
    if let Some(built_at) = report.built_at {
        lines.push(format!("(as of {})", built_at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    lines
}
