//! Scenario runner.
//!
//! Every check stages what it needs, drives the launch scripts through the
//! harness runners and always closes them before the next check starts, so a
//! failure in one path name never leaves a server behind for the next.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use distprobe_control::ControlPlane;
use distprobe_harness::paths::catalog;
use distprobe_harness::stage::remove_tree;
use distprobe_harness::{Backoff, HarnessConfig, ScratchDir, ScriptRunner, ServerRunner, Topology};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::report::Report;

pub const HELP_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a server started with an overridden log directory must stay up.
pub const LOG_DIR_HOLD: Duration = Duration::from_secs(5);
pub const LOG_DIR_NAMES: [&str; 3] = ["wf-logs", "wf logs", "wf  logs"];
/// Working copy of the distribution used by the help and log-dir checks.
pub const WORKING_COPY: &str = "default-wildfly";

const CLI_SCRIPT: &str = "jboss-cli";
const CLI_SUCCESS: &str = r#"{"outcome" => "success"}"#;
const INVALID_OPTION: &str = r"'.+'.+--help";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Paths,
    Help,
    LogDir,
    Cli,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Paths,
        Scenario::Help,
        Scenario::LogDir,
        Scenario::Cli,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Paths => "paths",
            Scenario::Help => "help",
            Scenario::LogDir => "log-dir",
            Scenario::Cli => "cli",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scenarios to run and the inputs they share.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub scenarios: Vec<Scenario>,
    /// Server modes exercised by the paths scenario
    pub topologies: Vec<Topology>,
    pub server_args: Vec<String>,
}

impl Plan {
    pub fn only(scenario: Scenario) -> Self {
        Self {
            scenarios: vec![scenario],
            ..Self::default()
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            scenarios: Scenario::ALL.to_vec(),
            topologies: Topology::ALL.to_vec(),
            server_args: Vec::new(),
        }
    }
}

pub struct Orchestrator<C> {
    config: HarnessConfig,
    client: C,
    names: Vec<String>,
    help_timeout: Duration,
    log_dir_hold: Duration,
}

impl<C: ControlPlane> Orchestrator<C> {
    pub fn new(config: HarnessConfig, client: C) -> Self {
        let names = catalog(config.platform, config.path_names.as_deref());
        Self {
            config,
            client,
            names,
            help_timeout: HELP_TIMEOUT,
            log_dir_hold: LOG_DIR_HOLD,
        }
    }

    pub fn with_help_timeout(mut self, timeout: Duration) -> Self {
        self.help_timeout = timeout;
        self
    }

    pub fn with_log_dir_hold(mut self, hold: Duration) -> Self {
        self.log_dir_hold = hold;
        self
    }

    pub async fn run(&self, plan: &Plan) -> Report {
        let mut report = Report::new();
        for scenario in &plan.scenarios {
            info!("Running {} checks", scenario);
            match scenario {
                Scenario::Paths => {
                    self.run_paths(&plan.topologies, &plan.server_args, &mut report)
                        .await
                }
                Scenario::Help => self.run_help(&mut report).await,
                Scenario::LogDir => self.run_log_dir(&mut report).await,
                Scenario::Cli => self.run_cli(&mut report).await,
            }
        }
        // Let ports and file handles go before anything else touches them
        tokio::time::sleep(self.config.settle_delay).await;
        report
    }

    pub async fn run_paths(
        &self,
        topologies: &[Topology],
        server_args: &[String],
        report: &mut Report,
    ) {
        for &topology in topologies {
            for name in &self.names {
                info!("Running {} {}", topology, name);
                let result = self.check_path(topology, name, server_args).await;
                report.record(Scenario::Paths, Some(topology), name, result);
            }
        }
    }

    pub async fn run_help(&self, report: &mut Report) {
        let Some(scratch) = self.working_copy(Scenario::Help, report) else {
            return;
        };
        for topology in [Topology::Domain, Topology::Standalone] {
            let result = self.check_help(scratch.path(), topology).await;
            report.record(Scenario::Help, Some(topology), "--help", result);
        }
        discard(scratch);
    }

    pub async fn run_log_dir(&self, report: &mut Report) {
        let Some(scratch) = self.working_copy(Scenario::LogDir, report) else {
            return;
        };
        for dir_name in LOG_DIR_NAMES {
            let result = self.check_log_dir(scratch.path(), dir_name).await;
            report.record(Scenario::LogDir, Some(Topology::Standalone), dir_name, result);
        }
        discard(scratch);
    }

    pub async fn run_cli(&self, report: &mut Report) {
        for name in &self.names {
            info!("Running CLI {}", name);
            let result = self.check_cli(name).await;
            report.record(Scenario::Cli, Some(Topology::Standalone), name, result);
        }
    }

    /// Stage the distribution under `name`, start it and shut it down.
    async fn check_path(
        &self,
        topology: Topology,
        name: &str,
        server_args: &[String],
    ) -> Result<(), String> {
        let scratch = self.stage(name)?;
        let mut runner = ServerRunner::new(&self.config, scratch.path(), topology, &self.client)
            .map_err(|e| e.to_string())?
            .with_console_name(format!("{}-{}", topology, name));

        let result = async {
            runner
                .start_and_wait(server_args.iter().cloned())
                .await
                .map_err(|e| format!("Attempted path: {}\n{}", name, e))?;
            if runner.has_died() {
                return Err(format!(
                    "Process has died\nAttempted path: {}\n{}",
                    name,
                    transcript(&runner.read_console_lines().unwrap_or_default())
                ));
            }
            let outcome = runner.shutdown().await;
            tokio::time::sleep(self.config.settle_delay).await;
            if outcome.is_confirmed() {
                Ok(())
            } else {
                Err(format!("Shutdown was not confirmed: {:?}", outcome))
            }
        }
        .await;

        runner.close().await;
        drop(runner);
        discard(scratch);
        result
    }

    async fn check_help(&self, home: &Path, topology: Topology) -> Result<(), String> {
        let script = self.config.script_name(topology.as_str());
        let mut runner = ScriptRunner::new(&self.config, home, &script)
            .map_err(|e| e.to_string())?
            .with_console_name(format!("{}-help", topology));

        let exited = match runner.start(["--help"]) {
            Ok(process) => process.exits_within(self.help_timeout).await,
            Err(e) => return Err(e.to_string()),
        };
        let console = runner.read_console_lines().map_err(|e| e.to_string())?;
        runner.close().await;

        if !exited {
            return Err(format!(
                "{} --help did not exit within {:?}\n{}",
                script,
                self.help_timeout,
                transcript(&console)
            ));
        }
        check_help_output(topology, &console)
    }

    async fn check_log_dir(&self, home: &Path, dir_name: &str) -> Result<(), String> {
        let log_dir = self.config.tmp_dir.join(dir_name);
        remove_tree(&log_dir).map_err(|e| e.to_string())?;
        let mut runner = ServerRunner::new(&self.config, home, Topology::Standalone, &self.client)
            .map_err(|e| e.to_string())?
            .with_console_name(format!("standalone-{}", dir_name));

        let result = async {
            runner
                .start_and_wait([format!("-Djboss.server.log.dir={}", log_dir.display())])
                .await
                .map_err(|e| e.to_string())?;
            tokio::time::sleep(self.log_dir_hold).await;
            if runner.has_died() {
                return Err(format!(
                    "Server startup failed:\n{}",
                    transcript(&runner.read_console_lines().unwrap_or_default())
                ));
            }
            if !log_dir.join("server.log").exists() {
                return Err(format!(
                    "server.log does not exist in the {} directory",
                    log_dir.display()
                ));
            }
            Ok(())
        }
        .await;

        runner.close().await;
        if let Err(e) = remove_tree(&log_dir) {
            debug!("Could not delete {}: {}", log_dir.display(), e);
        }
        result
    }

    /// Start a standalone server in the staged copy and stop it with the
    /// management CLI script shipped next to it.
    async fn check_cli(&self, name: &str) -> Result<(), String> {
        let scratch = self.stage(name)?;
        let mut server =
            ServerRunner::new(&self.config, scratch.path(), Topology::Standalone, &self.client)
                .map_err(|e| e.to_string())?
                .with_console_name(format!("standalone-output-{}", name));
        let mut cli =
            ScriptRunner::new(&self.config, scratch.path(), &self.config.script_name(CLI_SCRIPT))
                .map_err(|e| e.to_string())?
                .with_console_name(format!("cli-{}", name));

        let result = self.exercise_cli(&mut server, &mut cli, scratch.path()).await;

        cli.close().await;
        server.close().await;
        drop(server);
        discard(scratch);
        result
    }

    async fn exercise_cli<P: ControlPlane>(
        &self,
        server: &mut ServerRunner<P>,
        cli: &mut ScriptRunner,
        path: &Path,
    ) -> Result<(), String> {
        server
            .start_and_wait(Vec::<String>::new())
            .await
            .map_err(|e| e.to_string())?;

        let process = cli
            .start(["-c", "--command=:shutdown"])
            .map_err(|e| e.to_string())?;
        if !process.exits_within(self.config.shutdown_timeout).await {
            debug!("CLI for {} did not exit on its own", path.display());
        }
        let console = cli.read_console_lines().map_err(|e| e.to_string())?;

        let mut failures = Vec::new();
        if !console.iter().any(|line| line == CLI_SUCCESS) {
            failures.push(format!(
                "Failed to find a successful message for path '{}':\n{}",
                path.display(),
                transcript(&console)
            ));
        }
        if !wait_until_stopped(server, self.config.shutdown_timeout).await {
            let outcome = server.shutdown().await;
            failures.push(format!(
                "The server was not shut down via the cli :shutdown command for path '{}' \
                 (harness shutdown: {:?})",
                path.display(),
                outcome
            ));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("\n"))
        }
    }

    fn stage(&self, name: &str) -> Result<ScratchDir, String> {
        ScratchDir::create(&self.config.dist_home, &self.config.tmp_dir, name)
            .map_err(|e| e.to_string())
    }

    /// Fresh copy of the distribution for checks that do not test paths.
    fn working_copy(&self, scenario: Scenario, report: &mut Report) -> Option<ScratchDir> {
        match self.stage(WORKING_COPY) {
            Ok(scratch) => Some(scratch),
            Err(e) => {
                report.record(scenario, None, WORKING_COPY, Err(e));
                None
            }
        }
    }
}

/// Check the console of a `--help` run: a usage line naming the script must
/// be present and no argument may have been rejected.
pub fn check_help_output(topology: Topology, lines: &[String]) -> Result<(), String> {
    let usage = Regex::new(&format!(
        r"^.*:\s+{}(\.sh|\.bat)?\s+\[.+$",
        regex::escape(topology.as_str())
    ))
    .map_err(|e| e.to_string())?;
    let invalid = Regex::new(INVALID_OPTION).map_err(|e| e.to_string())?;

    let found = lines.iter().any(|line| usage.is_match(line));
    let rejected = lines.iter().any(|line| invalid.is_match(line));
    if found && !rejected {
        return Ok(());
    }

    let reason = if rejected {
        "an argument was rejected"
    } else {
        "no usage line found"
    };
    Err(format!(
        "{} --help failed: {}\n{}",
        topology,
        reason,
        transcript(lines)
    ))
}

async fn wait_until_stopped<C: ControlPlane>(runner: &ServerRunner<C>, ceiling: Duration) -> bool {
    let mut budget = Backoff::shutdown(ceiling).start();
    loop {
        if !runner.is_running().await {
            return true;
        }
        if !budget.pause().await {
            return false;
        }
    }
}

fn discard(scratch: ScratchDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.remove() {
        warn!("Could not delete directory '{}': {}", path.display(), e);
    }
}

fn transcript(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("\t{}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests;
