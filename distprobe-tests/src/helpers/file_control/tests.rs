use super::*;
use distprobe_control::{Address, ServerIdentity, ServerStatus};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_state_is_unreachable() {
    let temp = TempDir::new().unwrap();
    let control = FileControlPlane::new(temp.path());

    let err = control
        .read_attribute(&Address::root(), SERVER_STATE)
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
    assert!(control.execute(&Operation::new("shutdown")).await.unwrap_err().is_unreachable());
}

#[tokio::test]
async fn test_reads_server_state_and_accepts_shutdown() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(SERVER_STATE_FILE), "running\n").unwrap();
    let control = FileControlPlane::new(temp.path());

    let state = control
        .read_attribute(&Address::root(), SERVER_STATE)
        .await
        .unwrap();
    assert_eq!(state, json!("running"));

    let outcome = control.execute(&Operation::new("shutdown")).await.unwrap();
    assert!(outcome.is_success());
    assert!(control.was_requested(SHUTDOWN_FILE));
}

#[tokio::test]
async fn test_member_statuses_from_file() {
    let temp = TempDir::new().unwrap();
    let members = json!({
        "master": {
            "server-one": {"group": "main-server-group", "status": "STARTED"},
            "server-two": {"group": "other-server-group", "status": "DISABLED"},
        }
    });
    fs::write(temp.path().join(MEMBERS_FILE), members.to_string()).unwrap();
    let control = FileControlPlane::new(temp.path());

    let statuses = control.member_statuses().await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(
        statuses[&ServerIdentity::new("master", "main-server-group", "server-one")],
        ServerStatus::Started
    );

    let outcome = control
        .execute(&Operation::new("stop-servers"))
        .await
        .unwrap();
    assert!(outcome.is_success());
    assert!(control.was_requested(STOP_SERVERS_FILE));
}

#[tokio::test]
async fn test_unknown_operation_fails() {
    let temp = TempDir::new().unwrap();
    let control = FileControlPlane::new(temp.path());
    let outcome = control.execute(&Operation::new("reload")).await.unwrap();
    assert!(!outcome.is_success());
}
