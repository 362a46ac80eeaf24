//! Tracking of domain members across readiness and shutdown polls.

use std::collections::HashMap;

use distprobe_control::{ControlError, ServerIdentity, ServerStatus};
use tracing::trace;

/// Members of a managed domain that have been seen settled.
///
/// A member enters the map once it reports `STARTED` or `DISABLED` and stays
/// there until a shutdown poll no longer lists it. Shutdown completion is
/// judged on what the control plane still lists, not on the map, so members
/// that were never seen settled still hold a shutdown open.
#[derive(Debug, Default, Clone)]
pub struct MemberTracker {
    members: HashMap<ServerIdentity, ServerStatus>,
}

impl MemberTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one startup poll into the map.
    ///
    /// Returns `true` once every reported member has been seen settled.
    pub fn observe_startup(&mut self, reported: &HashMap<ServerIdentity, ServerStatus>) -> bool {
        for (id, status) in reported {
            if status.is_settled() && self.members.insert(id.clone(), *status).is_none() {
                trace!("Member {} settled as {}", id, status);
            }
        }
        reported.keys().all(|id| self.members.contains_key(id))
    }

    /// Fold one shutdown poll into the map.
    ///
    /// Tracked members no longer reported are dropped and the rest take
    /// their reported status. Shutdown is complete only once the control
    /// plane lists no member at all, or is unreachable because the domain
    /// controller is gone; both clear the map. Other errors leave it
    /// unchanged and keep the poll going.
    pub fn observe_shutdown(
        &mut self,
        reported: &Result<HashMap<ServerIdentity, ServerStatus>, ControlError>,
    ) -> bool {
        match reported {
            Ok(statuses) if statuses.is_empty() => {
                self.members.clear();
                true
            }
            Ok(statuses) => {
                self.members.retain(|id, _| statuses.contains_key(id));
                for (id, status) in statuses {
                    if let Some(tracked) = self.members.get_mut(id) {
                        *tracked = *status;
                    }
                }
                false
            }
            Err(e) if e.is_unreachable() => {
                self.members.clear();
                true
            }
            Err(e) => {
                trace!("Member status query failed during shutdown: {}", e);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &ServerIdentity) -> bool {
        self.members.contains_key(id)
    }

    pub fn status(&self, id: &ServerIdentity) -> Option<ServerStatus> {
        self.members.get(id).copied()
    }

    pub fn snapshot(&self) -> &HashMap<ServerIdentity, ServerStatus> {
        &self.members
    }
}

#[cfg(test)]
mod tests;
