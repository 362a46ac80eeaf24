//! Waiting for a launched server to report ready.

use std::time::Duration;

use distprobe_control::protocol::{SERVER_STATE, STATE_STARTING, STATE_STOPPING};
use distprobe_control::{Address, ControlPlane};
use thiserror::Error;
use tracing::{debug, trace};

use crate::backoff::Backoff;
use crate::members::MemberTracker;
use crate::process::Liveness;
use crate::topology::Topology;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("not ready within {waited:?}")]
    TimedOut { waited: Duration },

    #[error("process died with exit code {exit_code:?} before becoming ready")]
    ProcessDied { exit_code: Option<i32> },
}

/// One readiness check. Errors count as "not ready yet".
#[allow(async_fn_in_trait)]
pub trait Probe {
    async fn is_ready(&mut self) -> bool;
}

/// A standalone server is running once `server-state` is neither
/// `starting` nor `stopping`. Any control-plane error means not running.
pub async fn standalone_running<C: ControlPlane>(client: &C) -> bool {
    match client.read_attribute(&Address::root(), SERVER_STATE).await {
        Ok(value) => match value.as_str() {
            Some(state) => {
                trace!("server-state is {}", state);
                state != STATE_STARTING && state != STATE_STOPPING
            }
            None => false,
        },
        Err(e) => {
            trace!("Standalone state query failed: {}", e);
            false
        }
    }
}

/// A domain is running once every member reported by the control plane has
/// been seen settled. Settled members accumulate in `members`.
pub async fn domain_running<C: ControlPlane>(client: &C, members: &mut MemberTracker) -> bool {
    match client.member_statuses().await {
        Ok(statuses) => members.observe_startup(&statuses),
        Err(e) => {
            trace!("Domain status query failed: {}", e);
            false
        }
    }
}

/// Readiness check dispatching on the server topology.
pub struct TopologyProbe<'a, C> {
    topology: Topology,
    client: &'a C,
    members: &'a mut MemberTracker,
}

impl<'a, C: ControlPlane> TopologyProbe<'a, C> {
    pub fn new(topology: Topology, client: &'a C, members: &'a mut MemberTracker) -> Self {
        Self {
            topology,
            client,
            members,
        }
    }
}

impl<C: ControlPlane> Probe for TopologyProbe<'_, C> {
    async fn is_ready(&mut self) -> bool {
        match self.topology {
            Topology::Standalone => standalone_running(self.client).await,
            Topology::Domain => domain_running(self.client, self.members).await,
        }
    }
}

/// Poll `probe` until it succeeds, the budget runs out, or `process` dies.
///
/// A dead process is checked after every failed probe and ends the wait
/// immediately. Each probe is cut off at the remaining budget so the loop
/// never overruns the ceiling by more than one floor interval.
pub async fn wait_until_ready<L, P>(
    process: &mut L,
    backoff: &Backoff,
    probe: &mut P,
) -> Result<Duration, ReadinessError>
where
    L: Liveness,
    P: Probe,
{
    let mut budget = backoff.start();
    loop {
        let limit = budget.remaining().max(backoff.floor);
        let ready = tokio::time::timeout(limit, probe.is_ready())
            .await
            .unwrap_or(false);
        if ready {
            let elapsed = budget.elapsed();
            debug!("Ready after {:?}", elapsed);
            return Ok(elapsed);
        }

        if process.has_died() {
            return Err(ReadinessError::ProcessDied {
                exit_code: process.exit_code(),
            });
        }

        if !budget.pause().await {
            return Err(ReadinessError::TimedOut {
                waited: budget.elapsed(),
            });
        }
    }
}
