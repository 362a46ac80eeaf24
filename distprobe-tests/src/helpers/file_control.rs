//! Control plane backed by files the fake start scripts maintain.
//!
//! Layout of the state directory:
//! - `server-state`: current standalone state (`starting`, `running`, ...)
//! - `members.json`: `{host: {server: {"group": .., "status": ..}}}` for a domain
//! - `shutdown`, `stop-servers`: written here when the command is accepted
//!
//! A missing state file means the server is not listening, which is reported
//! as unreachable just like a refused HTTP connection.

use std::fs;
use std::path::{Path, PathBuf};

use distprobe_control::errors::Result;
use distprobe_control::protocol::SERVER_STATE;
use distprobe_control::{ControlError, ControlPlane, Operation, Outcome};
use serde_json::{Map, Value};

pub const SERVER_STATE_FILE: &str = "server-state";
pub const MEMBERS_FILE: &str = "members.json";
pub const SHUTDOWN_FILE: &str = "shutdown";
pub const STOP_SERVERS_FILE: &str = "stop-servers";

#[derive(Debug, Clone)]
pub struct FileControlPlane {
    state_dir: PathBuf,
}

impl FileControlPlane {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Whether any fake server currently publishes state.
    pub fn is_listening(&self) -> bool {
        self.state_dir.join(SERVER_STATE_FILE).exists()
            || self.state_dir.join(MEMBERS_FILE).exists()
    }

    /// Whether a command file was written by an accepted operation.
    pub fn was_requested(&self, command_file: &str) -> bool {
        self.state_dir.join(command_file).exists()
    }

    fn unreachable(&self) -> ControlError {
        ControlError::Unreachable {
            endpoint: self.state_dir.display().to_string(),
            reason: "no fake server is publishing state".to_string(),
        }
    }

    fn read_state(&self) -> Result<String> {
        let state = fs::read_to_string(self.state_dir.join(SERVER_STATE_FILE))
            .map_err(|_| self.unreachable())?;
        Ok(state.trim().to_string())
    }

    fn read_members(&self) -> Result<Map<String, Value>> {
        let raw = fs::read_to_string(self.state_dir.join(MEMBERS_FILE))
            .map_err(|_| self.unreachable())?;
        match serde_json::from_str(&raw) {
            Ok(Value::Object(hosts)) => Ok(hosts),
            Ok(other) => Err(ControlError::Malformed {
                operation: MEMBERS_FILE.to_string(),
                detail: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(ControlError::Decode(e)),
        }
    }

    fn accept(&self, command_file: &str) -> Result<Outcome> {
        if !self.is_listening() {
            return Err(self.unreachable());
        }
        fs::write(self.state_dir.join(command_file), b"").map_err(|_| self.unreachable())?;
        Ok(Outcome::success(Value::Null))
    }
}

impl ControlPlane for FileControlPlane {
    async fn execute(&self, operation: &Operation) -> Result<Outcome> {
        match operation.name.as_str() {
            "read-attribute" => {
                let name = operation.params.get("name").and_then(Value::as_str);
                if name != Some(SERVER_STATE) {
                    return Ok(Outcome::failed(format!("unknown attribute {:?}", name)));
                }
                Ok(Outcome::success(Value::String(self.read_state()?)))
            }
            "read-children-names" => {
                let hosts = self.read_members()?;
                Ok(Outcome::success(Value::Array(
                    hosts.keys().cloned().map(Value::String).collect(),
                )))
            }
            "read-children-resources" => {
                let hosts = self.read_members()?;
                let host = operation
                    .address
                    .segments()
                    .iter()
                    .find(|(kind, _)| kind == "host")
                    .map(|(_, name)| name.as_str());
                match host.and_then(|h| hosts.get(h)) {
                    Some(servers) => Ok(Outcome::success(servers.clone())),
                    None => Ok(Outcome::failed(format!(
                        "no such resource {}",
                        operation.address
                    ))),
                }
            }
            "shutdown" => self.accept(SHUTDOWN_FILE),
            "stop-servers" => self.accept(STOP_SERVERS_FILE),
            other => Ok(Outcome::failed(format!("unsupported operation {}", other))),
        }
    }
}

#[cfg(test)]
mod tests;
