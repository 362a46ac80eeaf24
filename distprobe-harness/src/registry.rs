//! Finalizer registry for launched process groups.
//!
//! Every spawned script registers its process-group id here and deregisters
//! when its owner releases it. If the harness exits early (Ctrl-C, panic in
//! the orchestrator), `drain` kills whatever is still registered so no server
//! outlives the run.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use tracing::{debug, trace};

static GLOBAL: FinalizerRegistry = FinalizerRegistry::new();

/// The process-wide registry used by [`crate::process::ManagedProcess`].
pub fn global() -> &'static FinalizerRegistry {
    &GLOBAL
}

#[derive(Debug, Default)]
pub struct FinalizerRegistry {
    groups: Mutex<BTreeSet<u32>>,
}

impl FinalizerRegistry {
    pub const fn new() -> Self {
        Self {
            groups: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn register(&self, pgid: u32) {
        trace!("Registering process group {} for cleanup", pgid);
        self.groups.lock().insert(pgid);
    }

    pub fn deregister(&self, pgid: u32) {
        if self.groups.lock().remove(&pgid) {
            trace!("Deregistered process group {}", pgid);
        }
    }

    pub fn contains(&self, pgid: u32) -> bool {
        self.groups.lock().contains(&pgid)
    }

    pub fn len(&self) -> usize {
        self.groups.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.lock().is_empty()
    }

    /// Force-kill every registered group and empty the registry.
    ///
    /// Returns the number of groups signalled.
    pub fn drain(&self) -> usize {
        let groups = std::mem::take(&mut *self.groups.lock());
        for &pgid in &groups {
            debug!("Killing leftover process group {}", pgid);
            force_kill_group(pgid);
        }
        groups.len()
    }
}

/// Send SIGKILL to a whole process group, ignoring failures.
#[cfg(unix)]
pub(crate) fn force_kill_group(pgid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        trace!("SIGKILL to process group {} failed: {}", pgid, e);
    }
}

/// Whether any process in the group is still alive.
#[cfg(unix)]
pub(crate) fn group_alive(pgid: u32) -> bool {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pgid as i32), None).is_ok()
}

#[cfg(not(unix))]
pub(crate) fn force_kill_group(pgid: u32) {
    // Children are killed through their handles on this platform.
    trace!("No group kill available for {}", pgid);
}
