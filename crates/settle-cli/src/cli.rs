use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "settle")]
#[command(about = "Inspect and change device settings from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Device profile describing the simulated hardware
    #[arg(long, value_name = "PATH", global = true)]
    pub profile_path: Option<PathBuf>,

    /// Settings store file
    #[arg(long, value_name = "PATH", global = true)]
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show every settings control and the lockscreen options
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Turn a control on or off
    Set {
        /// Control id, e.g. privacy.backup_data
        control: String,
        /// Target value
        #[arg(value_enum)]
        value: Switch,
        /// Approve confirmation steps without prompting
        #[arg(short, long)]
        yes: bool,
    },
    /// List installed apps with their expanded desktop mode
    Apps {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the expanded desktop policy
    Expanded {
        #[command(subcommand)]
        action: ExpandedAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output file (defaults to stdout)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ExpandedAction {
    /// Hide system bars for every app
    EnableAll,
    /// Clear the policy for every app
    DisableAll,
    /// Set the mode of one app
    Set {
        /// Package name of the app
        package: String,
        /// hide-nothing, hide-status-bar, hide-nav-bar or hide-both
        mode: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
