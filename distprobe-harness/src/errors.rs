use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Join captured console lines for inclusion in an error message.
fn transcript(console: &[String]) -> String {
    if console.is_empty() {
        return "  <no console output>".to_string();
    }
    console
        .iter()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to launch {script}: {source}")]
    Launch {
        script: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server was not started within {waited:?}\n{}", transcript(.console))]
    StartupTimeout {
        waited: Duration,
        console: Vec<String>,
    },

    #[error("Process has died with exit code {exit_code:?}\n{}", transcript(.console))]
    ProcessDied {
        exit_code: Option<i32>,
        console: Vec<String>,
    },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid distribution home directory: {0}")]
    InvalidHome(PathBuf),

    #[error("Failed to stage {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Control plane error: {0}")]
    Control(#[from] distprobe_control::ControlError),
}

impl HarnessError {
    /// Console transcript attached to startup failures, if any.
    pub fn console(&self) -> Option<&[String]> {
        match self {
            HarnessError::StartupTimeout { console, .. }
            | HarnessError::ProcessDied { console, .. } => Some(console),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Failed to read environment file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, HarnessError>;
