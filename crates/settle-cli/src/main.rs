mod app;
mod cli;
mod commands;
mod console;
mod device;
mod error;

use clap::Parser;

use crate::app::resolve_paths;
use crate::cli::{Cli, Commands};
use crate::commands::apps::run_apps;
use crate::commands::completions::run_completions;
use crate::commands::expanded::run_expanded;
use crate::commands::set::run_set;
use crate::commands::status::run_status;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("settle=info".parse().expect("Invalid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = resolve_paths(cli.profile_path, cli.store_path);

    match cli.command {
        Commands::Status { json } => run_status(&paths, json).await?,
        Commands::Set {
            control,
            value,
            yes,
        } => run_set(&paths, &control, value, yes).await?,
        Commands::Apps { json } => run_apps(&paths, json).await?,
        Commands::Expanded { action } => run_expanded(&paths, action).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
