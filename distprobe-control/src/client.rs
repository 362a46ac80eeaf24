use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    errors::{ControlError, Result},
    protocol::{Address, Operation, Outcome, ServerIdentity, ServerStatus},
};

/// Path of the JSON management endpoint.
const MANAGEMENT_PATH: &str = "/management";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The three shapes the harness needs from a management endpoint.
///
/// Only `execute` is required; attribute reads and member status queries are
/// expressed as management operations by default.
#[allow(async_fn_in_trait)]
pub trait ControlPlane {
    async fn execute(&self, operation: &Operation) -> Result<Outcome>;

    /// Read a single attribute. A failed outcome is an error.
    async fn read_attribute(&self, address: &Address, name: &str) -> Result<Value> {
        let op = Operation::read_attribute(address.clone(), name);
        let outcome = self.execute(&op).await?;
        if !outcome.is_success() {
            return Err(ControlError::Failed {
                operation: op.to_string(),
                description: outcome.failure_text(),
            });
        }
        Ok(outcome.result().clone())
    }

    /// Status of every server configured on every host of a managed domain.
    async fn member_statuses(&self) -> Result<HashMap<ServerIdentity, ServerStatus>> {
        let hosts_op = Operation::read_children_names(Address::root(), "host");
        let hosts = expect_success(&hosts_op, self.execute(&hosts_op).await?)?;
        let hosts = hosts.as_array().ok_or_else(|| ControlError::Malformed {
            operation: hosts_op.to_string(),
            detail: format!("expected a list of host names, got {}", hosts),
        })?;

        let mut statuses = HashMap::new();
        for host in hosts.iter().filter_map(Value::as_str) {
            let op = Operation::read_children_resources(Address::host(host), "server-config");
            let servers = expect_success(&op, self.execute(&op).await?)?;
            let Some(servers) = servers.as_object() else {
                return Err(ControlError::Malformed {
                    operation: op.to_string(),
                    detail: format!("expected an object of server configs, got {}", servers),
                });
            };
            for (name, config) in servers {
                let group = config.get("group").and_then(Value::as_str).unwrap_or("");
                let status = config
                    .get("status")
                    .and_then(Value::as_str)
                    .map(ServerStatus::from_wire)
                    .unwrap_or(ServerStatus::Unknown);
                statuses.insert(ServerIdentity::new(host, group, name.as_str()), status);
            }
        }
        trace!("Member statuses: {:?}", statuses);
        Ok(statuses)
    }
}

impl<T: ControlPlane + ?Sized> ControlPlane for &T {
    async fn execute(&self, operation: &Operation) -> Result<Outcome> {
        (**self).execute(operation).await
    }
}

fn expect_success(op: &Operation, outcome: Outcome) -> Result<Value> {
    if outcome.is_success() {
        Ok(outcome.result.unwrap_or(Value::Null))
    } else {
        Err(ControlError::Failed {
            operation: op.to_string(),
            description: outcome.failure_text(),
        })
    }
}

/// Control-plane client speaking JSON over HTTP to the management endpoint.
pub struct HttpControlPlane {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpControlPlane {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ControlError::Request {
                endpoint: host.to_string(),
                source: e,
            })?;
        Ok(Self::with_client(client, host, port))
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, host: &str, port: u16) -> Self {
        Self {
            client,
            endpoint: management_url(host, port),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ControlPlane for HttpControlPlane {
    async fn execute(&self, operation: &Operation) -> Result<Outcome> {
        debug!("Executing {} against {}", operation, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(operation)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ControlError::Unreachable {
                        endpoint: self.endpoint.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    ControlError::Request {
                        endpoint: self.endpoint.clone(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ControlError::Request {
            endpoint: self.endpoint.clone(),
            source: e,
        })?;

        // Failed outcomes arrive with a 500 status but still carry a JSON body.
        match serde_json::from_slice::<Outcome>(&body) {
            Ok(outcome) => Ok(outcome),
            Err(e) if status.is_success() => Err(ControlError::Decode(e)),
            Err(_) => Err(ControlError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

/// Build the management URL, bracketing IPv6 literals.
pub fn management_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{}]:{}{}", host, port, MANAGEMENT_PATH)
    } else {
        format!("http://{}:{}{}", host, port, MANAGEMENT_PATH)
    }
}

#[cfg(test)]
mod tests;
