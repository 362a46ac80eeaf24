//! Scoped runners around a launched script.
//!
//! [`ScriptRunner`] owns at most one live process and its console capture.
//! [`ServerRunner`] adds the control plane: wait for readiness after start and
//! shut the server down before the process is destroyed on close.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use distprobe_control::ControlPlane;
use tracing::{debug, trace, warn};

use crate::backoff::Backoff;
use crate::config::{HarnessConfig, validate_home};
use crate::errors::{HarnessError, Result};
use crate::members::MemberTracker;
use crate::process::{LaunchSpec, Liveness, ManagedProcess};
use crate::readiness::{ReadinessError, TopologyProbe, standalone_running, wait_until_ready};
use crate::shutdown::{ShutdownOutcome, ShutdownPolicy, shutdown};
use crate::topology::Topology;

/// Runs one script from `<home>/bin` with its output captured to a file.
#[derive(Debug)]
pub struct ScriptRunner {
    home: PathBuf,
    script: String,
    console_dir: PathBuf,
    console_name: Option<String>,
    env: HashMap<String, String>,
    destroy_grace: Duration,
    console: Option<PathBuf>,
    process: Option<ManagedProcess>,
}

impl ScriptRunner {
    /// Runner for `script` (a file name such as `standalone.sh`) in `home`.
    pub fn new(config: &HarnessConfig, home: &Path, script: &str) -> Result<Self> {
        validate_home(home, &config.home_marker)?;
        Ok(Self {
            home: home.to_path_buf(),
            script: script.to_string(),
            console_dir: config.console_dir(),
            console_name: None,
            env: config.env.clone(),
            destroy_grace: config.destroy_grace,
            console: None,
            process: None,
        })
    }

    /// Capture output to `<console dir>/<name>.log` instead of a unique file.
    pub fn with_console_name(mut self, name: impl Into<String>) -> Self {
        self.console_name = Some(name.into());
        self
    }

    pub fn script_path(&self) -> PathBuf {
        self.home.join("bin").join(&self.script)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Launch the script. Fails if a process from an earlier start is still
    /// owned by this runner.
    pub fn start<I, S>(&mut self, args: I) -> Result<&mut ManagedProcess>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.process.is_some() {
            return Err(HarnessError::IllegalState(
                "Script already started and close() was not invoked".to_string(),
            ));
        }

        let console = self.create_console_path()?;
        let spec = LaunchSpec::new(self.script_path(), &self.home, &console)
            .args(args)
            .envs(&self.env)
            .destroy_grace(self.destroy_grace);
        debug!(
            "Starting {} {:?}, console {}",
            spec.program.display(),
            spec.args,
            console.display()
        );

        let process = ManagedProcess::spawn(&spec)?;
        self.console = Some(console);
        Ok(self.process.insert(process))
    }

    pub fn process_mut(&mut self) -> Option<&mut ManagedProcess> {
        self.process.as_mut()
    }

    pub fn console_path(&self) -> Option<&Path> {
        self.console.as_deref()
    }

    /// Console capture of the last start, one entry per line.
    ///
    /// Empty if nothing was started or the file is gone. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn read_console_lines(&self) -> Result<Vec<String>> {
        let Some(path) = &self.console else {
            return Ok(Vec::new());
        };
        match fs::read(path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Destroy the process, if any. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.destroy().await;
        }
    }

    fn create_console_path(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.console_dir)?;
        if let Some(name) = &self.console_name {
            return Ok(self.console_dir.join(format!("{}.log", name)));
        }

        let stem = Path::new(&self.script)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.script.clone());
        let (_file, path) = tempfile::Builder::new()
            .prefix(&stem)
            .suffix(".log")
            .tempfile_in(&self.console_dir)?
            .keep()
            .map_err(|e| e.error)?;
        Ok(path)
    }
}

/// Lifecycle of a [`ServerRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Unstarted,
    Running,
    Ready,
    ShutdownIssued,
    Closed,
}

/// A server start script paired with the control plane that reports on it.
pub struct ServerRunner<C> {
    topology: Topology,
    script: ScriptRunner,
    client: C,
    members: MemberTracker,
    startup: Backoff,
    policy: ShutdownPolicy,
    state: RunnerState,
    is_shutdown: bool,
}

impl<C: ControlPlane> ServerRunner<C> {
    pub fn new(
        config: &HarnessConfig,
        home: &Path,
        topology: Topology,
        client: C,
    ) -> Result<Self> {
        let script = ScriptRunner::new(config, home, &config.script_name(topology.as_str()))?;
        Ok(Self {
            topology,
            script,
            client,
            members: MemberTracker::new(),
            startup: Backoff::readiness(config.startup_timeout),
            policy: ShutdownPolicy::from_config(config),
            state: RunnerState::Unstarted,
            is_shutdown: false,
        })
    }

    pub fn with_console_name(mut self, name: impl Into<String>) -> Self {
        self.script.console_name = Some(name.into());
        self
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn members(&self) -> &MemberTracker {
        &self.members
    }

    pub fn console_path(&self) -> Option<&Path> {
        self.script.console_path()
    }

    pub fn read_console_lines(&self) -> Result<Vec<String>> {
        self.script.read_console_lines()
    }

    /// Start the server and block until the control plane reports it ready.
    ///
    /// Startup failures carry the console transcript.
    pub async fn start_and_wait<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let process = self.script.start(args)?;
        self.state = RunnerState::Running;
        self.is_shutdown = false;
        // Members settled in an earlier run say nothing about this one
        self.members = MemberTracker::new();

        let mut probe = TopologyProbe::new(self.topology, &self.client, &mut self.members);
        match wait_until_ready(process, &self.startup, &mut probe).await {
            Ok(_) => {
                self.state = RunnerState::Ready;
                Ok(())
            }
            Err(ReadinessError::TimedOut { waited }) => Err(HarnessError::StartupTimeout {
                waited,
                console: self.console_or_empty(),
            }),
            Err(ReadinessError::ProcessDied { exit_code }) => Err(HarnessError::ProcessDied {
                exit_code,
                console: self.console_or_empty(),
            }),
        }
    }

    /// Whether the launched script process has exited.
    pub fn has_died(&mut self) -> bool {
        self.script.process_mut().is_none_or(|p| p.has_died())
    }

    /// Whether a standalone control plane answers as running.
    pub async fn is_running(&self) -> bool {
        standalone_running(&self.client).await
    }

    /// Issue the topology's shutdown sequence.
    ///
    /// Nothing is sent unless readiness was confirmed first.
    pub async fn shutdown(&mut self) -> ShutdownOutcome {
        if !matches!(self.state, RunnerState::Ready | RunnerState::ShutdownIssued) {
            warn!("Not shutting down {} in state {:?}", self.topology, self.state);
            return ShutdownOutcome::Failed(format!("server is not ready ({:?})", self.state));
        }
        let outcome = shutdown(self.topology, &self.client, &mut self.members, &self.policy).await;
        self.is_shutdown = true;
        self.state = RunnerState::ShutdownIssued;
        outcome
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    /// Shut down if the server became ready and was not shut down yet, then
    /// destroy the process whatever happened. Idempotent.
    pub async fn close(&mut self) {
        if self.state == RunnerState::Closed {
            trace!("Runner already closed");
            return;
        }
        if self.state == RunnerState::Ready && !self.is_shutdown {
            let outcome = self.shutdown().await;
            if !outcome.is_confirmed() {
                debug!("Shutdown on close ended with {:?}", outcome);
            }
        }
        self.script.close().await;
        self.state = RunnerState::Closed;
    }

    fn console_or_empty(&self) -> Vec<String> {
        self.script.read_console_lines().unwrap_or_else(|e| {
            warn!("Could not read console output: {}", e);
            Vec::new()
        })
    }
}

impl<C> Drop for ServerRunner<C> {
    fn drop(&mut self) {
        if !matches!(self.state, RunnerState::Closed | RunnerState::Unstarted) {
            // The process handle kills its group on drop
            warn!(
                "{} runner dropped without close, killing {}",
                self.topology,
                self.script.script_path().display()
            );
        }
    }
}
