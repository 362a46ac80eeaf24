use super::*;

fn id(name: &str) -> ServerIdentity {
    ServerIdentity::new("master", "main-server-group", name)
}

fn report(entries: &[(&str, ServerStatus)]) -> HashMap<ServerIdentity, ServerStatus> {
    entries.iter().map(|(n, s)| (id(n), *s)).collect()
}

#[test]
fn test_startup_ready_once_all_settled() {
    let mut tracker = MemberTracker::new();

    let first = report(&[
        ("server-one", ServerStatus::Started),
        ("server-two", ServerStatus::Starting),
        ("server-three", ServerStatus::Disabled),
    ]);
    assert!(!tracker.observe_startup(&first));
    assert_eq!(tracker.len(), 2);

    let second = report(&[
        ("server-one", ServerStatus::Started),
        ("server-two", ServerStatus::Started),
        ("server-three", ServerStatus::Disabled),
    ]);
    assert!(tracker.observe_startup(&second));
    assert_eq!(tracker.len(), 3);
    assert_eq!(tracker.status(&id("server-three")), Some(ServerStatus::Disabled));
}

#[test]
fn test_started_member_is_retained() {
    let mut tracker = MemberTracker::new();
    tracker.observe_startup(&report(&[("server-one", ServerStatus::Started)]));

    // A later poll reporting it as starting again does not drop it
    let flapped = report(&[("server-one", ServerStatus::Starting)]);
    assert!(tracker.observe_startup(&flapped));
    assert!(tracker.contains(&id("server-one")));
}

#[test]
fn test_empty_startup_report_is_ready() {
    let mut tracker = MemberTracker::new();
    assert!(tracker.observe_startup(&HashMap::new()));
}

#[test]
fn test_failed_member_never_ready() {
    let mut tracker = MemberTracker::new();
    let reported = report(&[
        ("server-one", ServerStatus::Started),
        ("server-two", ServerStatus::Failed),
    ]);
    assert!(!tracker.observe_startup(&reported));
    assert!(!tracker.observe_startup(&reported));
}

#[test]
fn test_shutdown_drops_members_no_longer_reported() {
    let mut tracker = MemberTracker::new();
    tracker.observe_startup(&report(&[
        ("server-one", ServerStatus::Started),
        ("server-two", ServerStatus::Started),
        ("server-three", ServerStatus::Started),
    ]));

    let stopping = report(&[
        ("server-one", ServerStatus::Stopping),
        ("server-two", ServerStatus::Stopped),
    ]);
    assert!(!tracker.observe_shutdown(&Ok(stopping)));
    assert_eq!(tracker.len(), 2);
    assert_eq!(tracker.status(&id("server-two")), Some(ServerStatus::Stopped));

    assert!(tracker.observe_shutdown(&Ok(HashMap::new())));
    assert!(tracker.is_empty());
}

#[test]
fn test_shutdown_unreachable_clears() {
    let mut tracker = MemberTracker::new();
    tracker.observe_startup(&report(&[("server-one", ServerStatus::Started)]));

    let gone = Err(ControlError::Unreachable {
        endpoint: "http://localhost:9990/management".to_string(),
        reason: "connection refused".to_string(),
    });
    assert!(tracker.observe_shutdown(&gone));
}

#[test]
fn test_shutdown_other_errors_keep_members() {
    let mut tracker = MemberTracker::new();
    tracker.observe_startup(&report(&[("server-one", ServerStatus::Started)]));

    let failed = Err(ControlError::Failed {
        operation: "/:read-children-names".to_string(),
        description: "WFLYCTL0030".to_string(),
    });
    assert!(!tracker.observe_shutdown(&failed));
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_shutdown_waits_for_untracked_members() {
    let mut tracker = MemberTracker::new();
    tracker.observe_startup(&report(&[("server-one", ServerStatus::Started)]));

    // server-four was never seen settled but is still listed
    let stopping = report(&[("server-four", ServerStatus::Stopping)]);
    assert!(!tracker.observe_shutdown(&Ok(stopping)));
    assert!(tracker.is_empty());

    assert!(tracker.observe_shutdown(&Ok(HashMap::new())));
}

#[test]
fn test_shutdown_with_empty_map_still_needs_empty_report() {
    let mut tracker = MemberTracker::new();
    let running = report(&[("server-one", ServerStatus::Started)]);
    assert!(!tracker.observe_shutdown(&Ok(running)));
    assert!(tracker.is_empty());

    let failed = Err(ControlError::Http {
        status: 503,
        body: "service unavailable".to_string(),
    });
    assert!(!tracker.observe_shutdown(&failed));
}
