use distprobe_control::ControlError;
use distprobe_harness::{ConfigError, HarnessError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Harness(#[from] HarnessError),

    #[error("Control plane error: {0}")]
    Control(#[from] ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{failed} of {total} checks failed")]
    ChecksFailed { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, CliError>;
