//! Harness for exercising server start scripts from scratch copies of a
//! distribution.

pub mod backoff;
pub mod config;
pub mod errors;
pub mod members;
pub mod paths;
pub mod platform;
pub mod process;
pub mod readiness;
pub mod registry;
pub mod runner;
pub mod shutdown;
pub mod stage;
pub mod topology;

#[cfg(test)]
mod test_support;

pub use backoff::{Backoff, RetryBudget};
pub use config::HarnessConfig;
pub use errors::{ConfigError, HarnessError, Result};
pub use members::MemberTracker;
pub use platform::Platform;
pub use process::{LaunchSpec, Liveness, ManagedProcess};
pub use readiness::{Probe, ReadinessError, TopologyProbe, wait_until_ready};
pub use runner::{RunnerState, ScriptRunner, ServerRunner};
pub use shutdown::{ShutdownOutcome, ShutdownPolicy, shutdown};
pub use stage::ScratchDir;
pub use topology::Topology;
