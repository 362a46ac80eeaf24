//! Wire types for the management control plane.
//!
//! Operations are JSON objects of the form
//! `{"operation": "<name>", "address": [{"host": "master"}], ...params}` and
//! every response carries an `outcome` of `success` or `failed`.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attribute holding the process state of a single server.
pub const SERVER_STATE: &str = "server-state";
/// Transient state reported while a server boots.
pub const STATE_STARTING: &str = "starting";
/// Transient state reported while a server shuts down.
pub const STATE_STOPPING: &str = "stopping";

pub const OUTCOME_SUCCESS: &str = "success";

/// Resource address: an ordered list of `(type, name)` pairs. The empty
/// address is the root resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address(Vec<(String, String)>);

impl Address {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Address of a host controller in a managed domain.
    pub fn host(name: impl Into<String>) -> Self {
        Self::root().push("host", name)
    }

    pub fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for (key, value) in &self.0 {
            write!(f, "/{}={}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            let mut segment = Map::new();
            segment.insert(key.clone(), Value::String(value.clone()));
            seq.serialize_element(&segment)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AddressVisitor;

        impl<'de> Visitor<'de> for AddressVisitor {
            type Value = Address;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a list of single-entry objects")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Address, A::Error> {
                let mut segments = Vec::new();
                while let Some(segment) = seq.next_element::<SegmentObject>()? {
                    segments.push((segment.0, segment.1));
                }
                Ok(Address(segments))
            }
        }

        deserializer.deserialize_seq(AddressVisitor)
    }
}

/// One `{"type": "name"}` address segment.
struct SegmentObject(String, String);

impl<'de> Deserialize<'de> for SegmentObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SegmentVisitor;

        impl<'de> Visitor<'de> for SegmentVisitor {
            type Value = SegmentObject;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an object with exactly one string entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SegmentObject, A::Error> {
                let (key, value) = map
                    .next_entry::<String, String>()?
                    .ok_or_else(|| de::Error::custom("empty address segment"))?;
                if map.next_key::<String>()?.is_some() {
                    return Err(de::Error::custom("address segment has more than one entry"));
                }
                Ok(SegmentObject(key, value))
            }
        }

        deserializer.deserialize_map(SegmentVisitor)
    }
}

/// A management operation to execute against an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operation")]
    pub name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Address::root(),
            params: Map::new(),
        }
    }

    pub fn at(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn read_attribute(address: Address, name: &str) -> Self {
        Self::new("read-attribute").at(address).param("name", name)
    }

    pub fn read_children_names(address: Address, child_type: &str) -> Self {
        Self::new("read-children-names")
            .at(address)
            .param("child-type", child_type)
    }

    pub fn read_children_resources(address: Address, child_type: &str) -> Self {
        Self::new("read-children-resources")
            .at(address)
            .param("child-type", child_type)
            .param("include-runtime", true)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.name)
    }
}

/// Response to an executed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(
        rename = "failure-description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failure_description: Option<Value>,
}

impl Outcome {
    pub fn success(result: Value) -> Self {
        Self {
            outcome: OUTCOME_SUCCESS.to_string(),
            result: Some(result),
            failure_description: None,
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            outcome: "failed".to_string(),
            result: None,
            failure_description: Some(Value::String(description.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == OUTCOME_SUCCESS
    }

    /// Human readable failure text; empty for successful outcomes.
    pub fn failure_text(&self) -> String {
        match &self.failure_description {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None if self.is_success() => String::new(),
            None => format!("outcome '{}' without description", self.outcome),
        }
    }

    pub fn result(&self) -> &Value {
        self.result.as_ref().unwrap_or(&Value::Null)
    }
}

/// Identity of one managed server in a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerIdentity {
    pub host: String,
    pub group: String,
    pub name: String,
}

impl ServerIdentity {
    pub fn new(
        host: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.group, self.name)
    }
}

/// Lifecycle status of a managed server as reported by its host controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerStatus {
    Disabled,
    Starting,
    Started,
    Stopping,
    Stopped,
    Failed,
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Disabled => "DISABLED",
            ServerStatus::Starting => "STARTING",
            ServerStatus::Started => "STARTED",
            ServerStatus::Stopping => "STOPPING",
            ServerStatus::Stopped => "STOPPED",
            ServerStatus::Failed => "FAILED",
            ServerStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse the wire spelling. Unrecognised values map to `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "DISABLED" => ServerStatus::Disabled,
            "STARTING" => ServerStatus::Starting,
            "STARTED" => ServerStatus::Started,
            "STOPPING" => ServerStatus::Stopping,
            "STOPPED" => ServerStatus::Stopped,
            "FAILED" => ServerStatus::Failed,
            _ => ServerStatus::Unknown,
        }
    }

    /// A settled member needs no further waiting during startup.
    pub fn is_settled(&self) -> bool {
        matches!(self, ServerStatus::Started | ServerStatus::Disabled)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
