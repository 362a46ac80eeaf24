//! Harness configuration.
//!
//! Built once at program start from defaults, environment variables and CLI
//! flags, then passed by reference to every component.

mod duration;

pub use duration::parse_duration;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::errors::{ConfigError, HarnessError, Result};
use crate::paths::split_path_list;
use crate::platform::Platform;

pub const ENV_HOME: &str = "DISTPROBE_HOME";
pub const ENV_HOST: &str = "DISTPROBE_HOST";
pub const ENV_PORT: &str = "DISTPROBE_PORT";
pub const ENV_TMP_DIR: &str = "DISTPROBE_TMP_DIR";
pub const ENV_PLATFORM: &str = "DISTPROBE_PLATFORM";
pub const ENV_DOMAIN_HOST: &str = "DISTPROBE_DOMAIN_HOST";
pub const ENV_TEST_PATHS: &str = "DISTPROBE_TEST_PATHS";
pub const ENV_STARTUP_TIMEOUT: &str = "DISTPROBE_STARTUP_TIMEOUT";
pub const ENV_SHUTDOWN_TIMEOUT: &str = "DISTPROBE_SHUTDOWN_TIMEOUT";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9990;
pub const DEFAULT_DOMAIN_HOST: &str = "master";
/// File whose presence marks a directory as a server distribution.
pub const DEFAULT_HOME_MARKER: &str = "jboss-modules.jar";

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);
pub const DEFAULT_DESTROY_GRACE: Duration = Duration::from_secs(5);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

const CONSOLE_DIR: &str = "console-output";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Template distribution that gets copied into scratch directories
    pub dist_home: PathBuf,
    /// Control-plane host
    pub host: String,
    /// Control-plane port
    pub port: u16,
    /// Root for scratch directories and console captures
    pub tmp_dir: PathBuf,
    pub platform: Platform,
    /// Host controller that receives the domain `shutdown`
    pub domain_host: String,
    pub home_marker: String,
    /// Extra environment for launched scripts
    pub env: HashMap<String, String>,
    pub startup_timeout: Duration,
    /// Upper bound on waiting for a server to stop after `shutdown` was accepted
    pub shutdown_timeout: Duration,
    /// Pause between `stop-servers` and the domain `shutdown`
    pub stop_grace: Duration,
    /// Time a process gets to exit after SIGTERM before it is killed
    pub destroy_grace: Duration,
    /// Pause after each scenario so ports and files are released
    pub settle_delay: Duration,
    pub path_names: Option<Vec<String>>,
}

impl HarnessConfig {
    /// Configuration with defaults for everything but the distribution home.
    pub fn new(dist_home: impl Into<PathBuf>) -> Self {
        let platform = Platform::host();
        Self {
            dist_home: dist_home.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tmp_dir: std::env::temp_dir().join("distprobe"),
            platform,
            domain_host: DEFAULT_DOMAIN_HOST.to_string(),
            home_marker: DEFAULT_HOME_MARKER.to_string(),
            env: platform_env(platform),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
            destroy_grace: DEFAULT_DESTROY_GRACE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            path_names: None,
        }
    }

    /// Build from the process environment. `dist_home` takes precedence over
    /// `DISTPROBE_HOME`.
    pub fn from_env(dist_home: Option<PathBuf>) -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(dist_home, |key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(
        dist_home: Option<PathBuf>,
        lookup: F,
    ) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dist_home = match dist_home {
            Some(home) => home,
            None => lookup(ENV_HOME)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .ok_or(ConfigError::Missing(ENV_HOME))?,
        };

        let mut config = Self::new(dist_home);

        if let Some(platform) = lookup(ENV_PLATFORM) {
            let platform = platform
                .parse::<Platform>()
                .map_err(|message| ConfigError::Invalid {
                    key: ENV_PLATFORM,
                    message,
                })?;
            config = config.with_platform(platform);
        }
        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: ENV_PORT,
                message: format!("Invalid port: {}", port),
            })?;
        }
        if let Some(tmp) = lookup(ENV_TMP_DIR).filter(|v| !v.is_empty()) {
            config.tmp_dir = PathBuf::from(tmp);
        }
        if let Some(domain_host) = lookup(ENV_DOMAIN_HOST).filter(|v| !v.is_empty()) {
            config.domain_host = domain_host;
        }
        if let Some(paths) = lookup(ENV_TEST_PATHS).filter(|v| !v.is_empty()) {
            config.path_names = Some(split_path_list(&paths, config.platform));
        }
        if let Some(value) = lookup(ENV_STARTUP_TIMEOUT) {
            config.startup_timeout = parse_duration(&value).map_err(|message| {
                ConfigError::Invalid {
                    key: ENV_STARTUP_TIMEOUT,
                    message,
                }
            })?;
        }
        if let Some(value) = lookup(ENV_SHUTDOWN_TIMEOUT) {
            config.shutdown_timeout = parse_duration(&value).map_err(|message| {
                ConfigError::Invalid {
                    key: ENV_SHUTDOWN_TIMEOUT,
                    message,
                }
            })?;
        }

        Ok(config)
    }

    /// Switch platform, keeping the platform-specific child environment in step.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        for key in platform_env(self.platform).keys() {
            self.env.remove(key);
        }
        self.platform = platform;
        self.env.extend(platform_env(platform));
        self
    }

    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_tmp_dir(mut self, tmp_dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = tmp_dir.into();
        self
    }

    pub fn with_home_marker(mut self, marker: impl Into<String>) -> Self {
        self.home_marker = marker.into();
        self
    }

    pub fn with_path_names(mut self, names: Vec<String>) -> Self {
        self.path_names = Some(names);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Merge variables from a dotenv-style file into the child environment.
    pub fn load_env_file(&mut self, path: &Path) -> std::result::Result<(), ConfigError> {
        let env_file_error = |message: String| ConfigError::EnvFile {
            path: path.to_path_buf(),
            message,
        };
        let iter = dotenvy::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))?;
        for item in iter {
            let (key, value) = item.map_err(|e| env_file_error(e.to_string()))?;
            debug!("Child environment override {}={}", key, value);
            self.env.insert(key, value);
        }
        Ok(())
    }

    /// Directory receiving console capture files.
    pub fn console_dir(&self) -> PathBuf {
        self.tmp_dir.join(CONSOLE_DIR)
    }

    /// Script name for a server mode on the configured platform.
    pub fn script_name(&self, prefix: &str) -> String {
        self.platform.script_name(prefix)
    }

    /// Check that `dist_home` looks like a server distribution.
    pub fn validate_home(&self) -> Result<()> {
        validate_home(&self.dist_home, &self.home_marker)
    }
}

/// Environment every launched script needs on a platform.
fn platform_env(platform: Platform) -> HashMap<String, String> {
    let mut env = HashMap::new();
    if platform.is_windows() {
        // Keeps the batch scripts from waiting for a key press on exit.
        env.insert("NOPAUSE".to_string(), "true".to_string());
    }
    env
}

pub fn is_valid_home(home: &Path, marker: &str) -> bool {
    home.is_dir() && home.join(marker).exists()
}

pub fn validate_home(home: &Path, marker: &str) -> Result<()> {
    if is_valid_home(home, marker) {
        Ok(())
    } else {
        Err(HarnessError::InvalidHome(home.to_path_buf()))
    }
}
