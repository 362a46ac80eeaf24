//! Launching server scripts and tearing them down.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::DEFAULT_DESTROY_GRACE;
use crate::errors::{HarnessError, Result};
use crate::registry::{self, FinalizerRegistry};

const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Something that can be asked whether it has already exited.
pub trait Liveness {
    /// Non-blocking exit check.
    fn has_died(&mut self) -> bool;

    /// Exit code, once known.
    fn exit_code(&self) -> Option<i32>;
}

/// Everything needed to start one script.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
    /// File receiving both stdout and stderr
    pub console: PathBuf,
    pub destroy_grace: Duration,
}

impl LaunchSpec {
    pub fn new(
        program: impl Into<PathBuf>,
        working_dir: impl Into<PathBuf>,
        console: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: HashMap::new(),
            console: console.into(),
            destroy_grace: DEFAULT_DESTROY_GRACE,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn destroy_grace(mut self, grace: Duration) -> Self {
        self.destroy_grace = grace;
        self
    }

    fn build_command(&self) -> Result<Command> {
        let launch_error = |source| HarnessError::Launch {
            script: self.program.clone(),
            source,
        };

        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.console)
            .map_err(launch_error)?;
        let stderr = stdout.try_clone().map_err(launch_error)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        // Own process group so the server JVM dies with the script
        #[cfg(unix)]
        cmd.process_group(0);

        Ok(cmd)
    }
}

/// A running script owned by exactly one runner.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    pid: Option<u32>,
    program: PathBuf,
    console: PathBuf,
    status: Option<ExitStatus>,
    destroyed: bool,
    destroy_grace: Duration,
    registry: &'static FinalizerRegistry,
}

impl ManagedProcess {
    /// Spawn the script with its output redirected to the console file.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        Self::spawn_in(spec, registry::global())
    }

    pub(crate) fn spawn_in(
        spec: &LaunchSpec,
        registry: &'static FinalizerRegistry,
    ) -> Result<Self> {
        let mut cmd = spec.build_command()?;
        debug!(
            "Spawning {} {:?} in {}",
            spec.program.display(),
            spec.args,
            spec.working_dir.display()
        );

        let child = cmd.spawn().map_err(|source| HarnessError::Launch {
            script: spec.program.clone(),
            source,
        })?;
        let pid = child.id();
        if let Some(pid) = pid {
            registry.register(pid);
        }
        info!("Started {} (pid {:?})", spec.program.display(), pid);

        Ok(Self {
            child,
            pid,
            program: spec.program.clone(),
            console: spec.console.clone(),
            status: None,
            destroyed: false,
            destroy_grace: spec.destroy_grace,
            registry,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn console(&self) -> &Path {
        &self.console
    }

    /// Wait for the process to exit on its own.
    ///
    /// If it is still running when `timeout` fires it is destroyed and
    /// `false` is returned.
    pub async fn exits_within(&mut self, timeout: Duration) -> bool {
        if self.has_died() {
            return true;
        }
        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.record_exit(status);
                true
            }
            Ok(Err(e)) => {
                warn!("Waiting for {} failed: {}", self.program.display(), e);
                self.destroy().await;
                false
            }
            Err(_) => {
                debug!(
                    "{} still running after {:?}, destroying",
                    self.program.display(),
                    timeout
                );
                self.destroy().await;
                false
            }
        }
    }

    /// Terminate the process group, escalating to SIGKILL after the grace
    /// period. Safe to call repeatedly; only the first call sends signals.
    ///
    /// The script leader exiting is not enough: the whole group must be gone
    /// before the grace period ends, or every member left is killed.
    pub async fn destroy(&mut self) {
        if self.destroyed {
            trace!("{} already destroyed", self.program.display());
            return;
        }
        self.destroyed = true;

        self.terminate_group();
        let deadline = Instant::now() + self.destroy_grace;
        match tokio::time::timeout_at(deadline, self.child.wait()).await {
            Ok(Ok(status)) => self.record_exit(status),
            Ok(Err(e)) => debug!("Waiting for {} failed: {}", self.program.display(), e),
            Err(_) => debug!(
                "{} did not exit within {:?}",
                self.program.display(),
                self.destroy_grace
            ),
        }

        if !self.group_exits_by(deadline).await {
            warn!(
                "Process group of {} survived SIGTERM for {:?}, killing",
                self.program.display(),
                self.destroy_grace
            );
            self.kill_group();
        }
        if self.status.is_none() {
            if let Err(e) = self.child.kill().await {
                debug!("Kill of {} failed: {}", self.program.display(), e);
            }
            if let Ok(Some(status)) = self.child.try_wait() {
                self.record_exit(status);
            }
        }

        if let Some(pid) = self.pid {
            self.registry.deregister(pid);
        }
    }

    /// Poll the process group until it is empty or `deadline` passes.
    #[cfg(unix)]
    async fn group_exits_by(&self, deadline: Instant) -> bool {
        let Some(pid) = self.pid else { return true };
        loop {
            if !registry::group_alive(pid) {
                trace!("Process group {} is gone", pid);
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(GROUP_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    #[cfg(not(unix))]
    async fn group_exits_by(&self, _deadline: Instant) -> bool {
        self.status.is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn record_exit(&mut self, status: ExitStatus) {
        if self.status.is_none() {
            debug!("{} exited with {}", self.program.display(), status);
        }
        self.status = Some(status);
    }

    #[cfg(unix)]
    fn terminate_group(&self) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else { return };
        // The script may have exited while the JVM it started is still alive,
        // so the group is signalled even after the leader was reaped.
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            trace!("SIGTERM to process group {} failed: {}", pid, e);
        }
    }

    #[cfg(not(unix))]
    fn terminate_group(&mut self) {
        if let Err(e) = self.child.start_kill() {
            trace!("Kill of {} failed: {}", self.program.display(), e);
        }
    }

    fn kill_group(&self) {
        if let Some(pid) = self.pid {
            registry::force_kill_group(pid);
        }
    }
}

impl Liveness for ManagedProcess {
    fn has_died(&mut self) -> bool {
        if self.status.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                trace!("Exit check for {} failed: {}", self.program.display(), e);
                false
            }
        }
    }

    fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if !self.destroyed {
            self.kill_group();
            let _ = self.child.start_kill();
        }
        if let Some(pid) = self.pid {
            self.registry.deregister(pid);
        }
    }
}
