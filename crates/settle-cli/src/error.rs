use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] settle_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Prompt failed: {0}")]
    Prompt(String),
    #[error("Control is disabled: {0}")]
    ControlDisabled(String),
    #[error("Control is busy: {0}")]
    ControlBusy(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
