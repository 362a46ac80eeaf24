//! Stopping a server through its control plane.
//!
//! Nothing here returns an error: every problem is logged and folded into a
//! [`ShutdownOutcome`] so cleanup paths can call it unconditionally.

use std::time::Duration;

use distprobe_control::{Address, ControlError, ControlPlane, Operation};
use tracing::{debug, info, trace, warn};

use crate::backoff::Backoff;
use crate::config::HarnessConfig;
use crate::members::MemberTracker;
use crate::readiness::standalone_running;
use crate::topology::Topology;

const OP_SHUTDOWN: &str = "shutdown";
const OP_STOP_SERVERS: &str = "stop-servers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The server accepted the command and then went away.
    Confirmed,
    /// The control plane refused a command.
    Rejected {
        operation: String,
        description: String,
    },
    /// Nothing answered, so there was nothing to shut down.
    Unreachable,
    /// The command was accepted but the server was still up at the ceiling.
    TimedOut { waited: Duration },
    /// The command could not be delivered.
    Failed(String),
}

impl ShutdownOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ShutdownOutcome::Confirmed)
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownPolicy {
    /// Pause between `stop-servers` and the host `shutdown`
    pub stop_grace: Duration,
    /// Poll used to wait for the server to go away
    pub backoff: Backoff,
    /// Host controller that receives the domain `shutdown`
    pub domain_host: String,
}

impl ShutdownPolicy {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            stop_grace: config.stop_grace,
            backoff: Backoff::shutdown(config.shutdown_timeout),
            domain_host: config.domain_host.clone(),
        }
    }
}

/// Shut down a server of either topology.
pub async fn shutdown<C: ControlPlane>(
    topology: Topology,
    client: &C,
    members: &mut MemberTracker,
    policy: &ShutdownPolicy,
) -> ShutdownOutcome {
    let outcome = match topology {
        Topology::Standalone => shutdown_standalone(client, policy).await,
        Topology::Domain => shutdown_domain(client, members, policy).await,
    };
    info!("{} shutdown: {:?}", topology, outcome);
    outcome
}

pub async fn shutdown_standalone<C: ControlPlane>(
    client: &C,
    policy: &ShutdownPolicy,
) -> ShutdownOutcome {
    let op = Operation::new(OP_SHUTDOWN);
    if let Some(early) = issue(client, &op).await {
        return early;
    }

    let mut budget = policy.backoff.start();
    loop {
        if !standalone_running(client).await {
            return ShutdownOutcome::Confirmed;
        }
        if !budget.pause().await {
            return ShutdownOutcome::TimedOut {
                waited: budget.elapsed(),
            };
        }
    }
}

/// Stop the managed servers, then the host controller, and wait until the
/// control plane reports no member at all.
pub async fn shutdown_domain<C: ControlPlane>(
    client: &C,
    members: &mut MemberTracker,
    policy: &ShutdownPolicy,
) -> ShutdownOutcome {
    let stop = Operation::new(OP_STOP_SERVERS);
    let stopped = issue(client, &stop).await;
    // Give the servers a moment to stop before the host goes away
    tokio::time::sleep(policy.stop_grace).await;
    if let Some(early) = stopped {
        return early;
    }

    let op = Operation::new(OP_SHUTDOWN).at(Address::host(&policy.domain_host));
    if let Some(early) = issue(client, &op).await {
        return early;
    }

    let mut budget = policy.backoff.start();
    loop {
        let reported = client.member_statuses().await;
        if members.observe_shutdown(&reported) {
            return ShutdownOutcome::Confirmed;
        }
        trace!("{} tracked members still running", members.len());
        if !budget.pause().await {
            return ShutdownOutcome::TimedOut {
                waited: budget.elapsed(),
            };
        }
    }
}

/// Execute a command; `Some` means the sequence must stop here.
async fn issue<C: ControlPlane>(client: &C, op: &Operation) -> Option<ShutdownOutcome> {
    debug!("Issuing {}", op);
    match client.execute(op).await {
        Ok(outcome) if outcome.is_success() => None,
        Ok(outcome) => {
            let description = outcome.failure_text();
            warn!("Failed to execute {}: {}", op, description);
            Some(ShutdownOutcome::Rejected {
                operation: op.to_string(),
                description,
            })
        }
        Err(ControlError::Unreachable { .. }) => {
            debug!("Control plane gone before {}", op);
            Some(ShutdownOutcome::Unreachable)
        }
        Err(e) => {
            debug!("Error executing {}: {}", op, e);
            Some(ShutdownOutcome::Failed(e.to_string()))
        }
    }
}
