//! Control-plane double for unit tests.

use std::collections::{HashMap, VecDeque};

use distprobe_control::errors::Result as ControlResult;
use distprobe_control::{ControlError, ControlPlane, Operation, Outcome};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const STATE_OP: &str = "/:read-attribute";
pub const HOSTS_OP: &str = "/:read-children-names";
pub const MASTER_OP: &str = "/host=master:read-children-resources";

/// Answers each operation from a queue of canned results keyed by the
/// operation's display form. The last queued answer repeats; operations
/// with no answers are unreachable.
#[derive(Default)]
pub struct ScriptedControl {
    answers: Mutex<HashMap<String, VecDeque<ControlResult<Outcome>>>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedControl {
    pub fn answer(self, op: &str, outcome: ControlResult<Outcome>) -> Self {
        self.push(op, outcome);
        self
    }

    pub fn push(&self, op: &str, outcome: ControlResult<Outcome>) {
        self.answers
            .lock()
            .entry(op.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Replace every queued answer for `op`.
    pub fn set(&self, op: &str, outcome: ControlResult<Outcome>) {
        self.answers
            .lock()
            .insert(op.to_string(), VecDeque::from([outcome]));
    }

    /// Operations executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.log.lock().iter().filter(|o| *o == op).count()
    }
}

impl ControlPlane for ScriptedControl {
    async fn execute(&self, operation: &Operation) -> ControlResult<Outcome> {
        let key = operation.to_string();
        self.log.lock().push(key.clone());

        let mut answers = self.answers.lock();
        let Some(queue) = answers.get_mut(&key) else {
            return Err(unreachable());
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_else(|| Err(unreachable()))
        } else {
            queue
                .front()
                .map(clone_result)
                .unwrap_or_else(|| Err(unreachable()))
        }
    }
}

pub fn unreachable() -> ControlError {
    ControlError::Unreachable {
        endpoint: "http://localhost:9990/management".to_string(),
        reason: "connection refused".to_string(),
    }
}

fn clone_result(result: &ControlResult<Outcome>) -> ControlResult<Outcome> {
    match result {
        Ok(outcome) => Ok(outcome.clone()),
        Err(ControlError::Unreachable { .. }) => Err(unreachable()),
        Err(e) => Err(ControlError::Malformed {
            operation: "scripted".to_string(),
            detail: e.to_string(),
        }),
    }
}

pub fn server(group: &str, status: &str) -> Value {
    json!({ "group": group, "status": status })
}
