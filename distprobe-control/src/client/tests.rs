use super::*;
use crate::protocol::SERVER_STATE;
use serde_json::json;

/// Answers operations from a fixed table keyed by `Operation` display.
struct TableClient {
    answers: HashMap<String, Outcome>,
}

impl TableClient {
    fn new(answers: &[(&str, Outcome)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl ControlPlane for TableClient {
    async fn execute(&self, operation: &Operation) -> Result<Outcome> {
        self.answers
            .get(&operation.to_string())
            .cloned()
            .ok_or_else(|| ControlError::Unreachable {
                endpoint: "table".to_string(),
                reason: format!("no answer for {}", operation),
            })
    }
}

#[tokio::test]
async fn test_read_attribute_returns_result() {
    let client = TableClient::new(&[("/:read-attribute", Outcome::success(json!("running")))]);
    let value = client
        .read_attribute(&Address::root(), SERVER_STATE)
        .await
        .unwrap();
    assert_eq!(value, json!("running"));
}

#[tokio::test]
async fn test_read_attribute_failed_outcome_is_error() {
    let client = TableClient::new(&[("/:read-attribute", Outcome::failed("not yet"))]);
    let err = client
        .read_attribute(&Address::root(), SERVER_STATE)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ControlError::Failed { ref description, .. } if description == "not yet")
    );
}

#[tokio::test]
async fn test_member_statuses_walks_hosts_and_server_configs() {
    let client = TableClient::new(&[
        ("/:read-children-names", Outcome::success(json!(["master", "slave"]))),
        (
            "/host=master:read-children-resources",
            Outcome::success(json!({
                "server-one": {"group": "main-server-group", "status": "STARTED"},
                "server-three": {"group": "other-server-group", "status": "DISABLED"}
            })),
        ),
        (
            "/host=slave:read-children-resources",
            Outcome::success(json!({
                "server-two": {"group": "main-server-group", "status": "STARTING"}
            })),
        ),
    ]);

    let statuses = client.member_statuses().await.unwrap();
    assert_eq!(statuses.len(), 3);
    assert_eq!(
        statuses[&ServerIdentity::new("master", "main-server-group", "server-one")],
        ServerStatus::Started
    );
    assert_eq!(
        statuses[&ServerIdentity::new("master", "other-server-group", "server-three")],
        ServerStatus::Disabled
    );
    assert_eq!(
        statuses[&ServerIdentity::new("slave", "main-server-group", "server-two")],
        ServerStatus::Starting
    );
}

#[tokio::test]
async fn test_member_statuses_missing_status_is_unknown() {
    let client = TableClient::new(&[
        ("/:read-children-names", Outcome::success(json!(["master"]))),
        (
            "/host=master:read-children-resources",
            Outcome::success(json!({"server-one": {"group": "g"}})),
        ),
    ]);
    let statuses = client.member_statuses().await.unwrap();
    assert_eq!(
        statuses[&ServerIdentity::new("master", "g", "server-one")],
        ServerStatus::Unknown
    );
}

#[tokio::test]
async fn test_member_statuses_rejects_non_list_hosts() {
    let client = TableClient::new(&[("/:read-children-names", Outcome::success(json!("master")))]);
    let err = client.member_statuses().await.unwrap_err();
    assert!(matches!(err, ControlError::Malformed { .. }));
}

#[tokio::test]
async fn test_member_statuses_propagates_failed_host_query() {
    let client = TableClient::new(&[(
        "/:read-children-names",
        Outcome::failed("domain controller booting"),
    )]);
    let err = client.member_statuses().await.unwrap_err();
    assert!(matches!(err, ControlError::Failed { .. }));
}

#[test]
fn test_management_url() {
    assert_eq!(
        management_url("localhost", 9990),
        "http://localhost:9990/management"
    );
    assert_eq!(management_url("::1", 9990), "http://[::1]:9990/management");
    assert_eq!(management_url("[::1]", 9990), "http://[::1]:9990/management");
}

#[tokio::test]
async fn test_http_client_reports_unreachable_endpoint() {
    // Bind then drop a listener to get a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = HttpControlPlane::new("127.0.0.1", port).unwrap();
    let err = client
        .execute(&Operation::new("whoami"))
        .await
        .unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got {err:?}");
}

#[tokio::test]
async fn test_reference_delegates_to_client() {
    let client = TableClient::new(&[("/:read-attribute", Outcome::success(json!("running")))]);
    let borrowed: &TableClient = &client;
    let value = ControlPlane::read_attribute(&borrowed, &Address::root(), "server-state")
        .await
        .unwrap();
    assert_eq!(value, json!("running"));
}
