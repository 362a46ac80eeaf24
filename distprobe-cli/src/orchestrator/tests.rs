use super::*;

fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_help_output_accepts_usage_line() {
    let console = lines(&[
        "Usage: standalone.sh [args...]",
        "where args include:",
        "    -b=<value>    Set system property jboss.bind.address",
    ]);
    assert_eq!(check_help_output(Topology::Standalone, &console), Ok(()));

    let windows = lines(&["Usage: domain.bat [args...]"]);
    assert_eq!(check_help_output(Topology::Domain, &windows), Ok(()));
}

#[test]
fn test_help_output_requires_matching_mode() {
    let console = lines(&["Usage: standalone.sh [args...]"]);
    let err = check_help_output(Topology::Domain, &console).unwrap_err();
    assert!(err.contains("no usage line found"));
    assert!(err.contains("\tUsage: standalone.sh [args...]"));

    let no_args = lines(&["Usage: standalone.sh"]);
    assert!(check_help_output(Topology::Standalone, &no_args).is_err());
}

#[test]
fn test_help_output_rejects_invalid_option() {
    let console = lines(&[
        "Usage: standalone.sh [args...]",
        "Invalid option '--helpp'. Use --help for usage",
    ]);
    let err = check_help_output(Topology::Standalone, &console).unwrap_err();
    assert!(err.contains("an argument was rejected"));
}

#[test]
fn test_plan_defaults() {
    let plan = Plan::default();
    assert_eq!(plan.scenarios.len(), 4);
    assert_eq!(plan.topologies, Topology::ALL.to_vec());
    assert_eq!(Plan::only(Scenario::Cli).scenarios, vec![Scenario::Cli]);
    assert_eq!(Scenario::LogDir.to_string(), "log-dir");
}

#[cfg(unix)]
mod fake_dist {
    use super::*;
    use crate::report::Report;
    use distprobe_tests::helpers::fake_dist::FAILING_SCRIPT;
    use distprobe_tests::{FakeDistribution, FileControlPlane};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        dist: FakeDistribution,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let dist = FakeDistribution::create(temp.path()).unwrap();
            Self { temp, dist }
        }

        fn config(&self, names: &[&str]) -> HarnessConfig {
            self.dist
                .config(&self.temp.path().join("tmp"))
                .with_path_names(names.iter().map(|s| s.to_string()).collect())
        }

        fn orchestrator(&self, names: &[&str]) -> Orchestrator<FileControlPlane> {
            Orchestrator::new(self.config(names), self.dist.control_plane())
        }

        fn tmp(&self) -> std::path::PathBuf {
            self.temp.path().join("tmp")
        }
    }

    fn failures(report: &Report) -> Vec<&str> {
        report
            .entries()
            .iter()
            .filter_map(|e| e.failure.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn test_standalone_paths_pass_and_clean_up() {
        let fixture = Fixture::new();
        let orchestrator = fixture.orchestrator(&["wildfly spaced", "wildfly%home"]);
        let mut report = Report::new();

        orchestrator
            .run_paths(&[Topology::Standalone], &[], &mut report)
            .await;

        assert_eq!(report.len(), 2, "{:?}", failures(&report));
        assert!(report.is_success(), "{:?}", failures(&report));
        assert!(!fixture.tmp().join("wildfly spaced").exists());
        assert!(!fixture.tmp().join("wildfly%home").exists());
        assert!(
            fixture
                .tmp()
                .join("console-output/standalone-wildfly spaced.log")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_domain_path_passes() {
        let fixture = Fixture::new();
        let orchestrator = fixture.orchestrator(&["ni\u{00f1}o-dir"]);
        let mut report = Report::new();

        orchestrator
            .run_paths(&[Topology::Domain], &[], &mut report)
            .await;

        assert!(report.is_success(), "{:?}", failures(&report));
        assert_eq!(report.entries()[0].topology, Some(Topology::Domain));
    }

    #[tokio::test]
    async fn test_dead_server_is_a_failure_with_console() {
        let fixture = Fixture::new();
        fixture
            .dist
            .write_script("standalone.sh", FAILING_SCRIPT)
            .unwrap();
        let orchestrator = fixture.orchestrator(&["wildfly#home"]);
        let mut report = Report::new();

        orchestrator
            .run_paths(&[Topology::Standalone], &[], &mut report)
            .await;

        let failures = failures(&report);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("Attempted path: wildfly#home"));
        assert!(failures[0].contains("Address already in use"));
        assert!(!fixture.tmp().join("wildfly#home").exists());
    }

    #[tokio::test]
    async fn test_help_checks_both_scripts() {
        let fixture = Fixture::new();
        let orchestrator = fixture.orchestrator(&[]);
        let mut report = Report::new();

        orchestrator.run_help(&mut report).await;

        assert_eq!(report.len(), 2);
        assert!(report.is_success(), "{:?}", failures(&report));
        assert!(!fixture.tmp().join(WORKING_COPY).exists());
    }

    #[tokio::test]
    async fn test_help_that_keeps_running_fails() {
        let fixture = Fixture::new();
        fixture
            .dist
            .write_script("standalone.sh", "#!/bin/sh\necho booting\nsleep 30\n")
            .unwrap();
        let orchestrator = fixture
            .orchestrator(&[])
            .with_help_timeout(Duration::from_millis(500));
        let mut report = Report::new();

        orchestrator.run_help(&mut report).await;

        let failures = failures(&report);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("did not exit within"));
        assert!(failures[0].contains("\tbooting"));
    }

    #[tokio::test]
    async fn test_log_dir_overrides_pass() {
        let fixture = Fixture::new();
        let orchestrator = fixture
            .orchestrator(&[])
            .with_log_dir_hold(Duration::from_millis(200));
        let mut report = Report::new();

        orchestrator.run_log_dir(&mut report).await;

        assert_eq!(report.len(), LOG_DIR_NAMES.len());
        assert!(report.is_success(), "{:?}", failures(&report));
        for name in LOG_DIR_NAMES {
            assert!(!fixture.tmp().join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_cli_shutdown_passes() {
        let fixture = Fixture::new();
        let orchestrator = fixture.orchestrator(&["wildfly'home"]);
        let mut report = Report::new();

        orchestrator.run_cli(&mut report).await;

        assert!(report.is_success(), "{:?}", failures(&report));
        let console = std::fs::read_to_string(
            fixture.tmp().join("console-output/cli-wildfly'home.log"),
        )
        .unwrap();
        assert!(console.contains(r#"{"outcome" => "success"}"#));
    }

    #[tokio::test]
    async fn test_cli_that_does_not_shut_down_fails() {
        let fixture = Fixture::new();
        fixture
            .dist
            .write_script("jboss-cli.sh", "#!/bin/sh\necho 'Connection refused'\nexit 1\n")
            .unwrap();
        let mut config = fixture.config(&["wildfly@home"]);
        config.shutdown_timeout = Duration::from_secs(2);
        let orchestrator = Orchestrator::new(config, fixture.dist.control_plane());
        let mut report = Report::new();

        orchestrator.run_cli(&mut report).await;

        let failures = failures(&report);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("Failed to find a successful message"));
        assert!(failures[0].contains("\tConnection refused"));
        assert!(failures[0].contains("was not shut down via the cli"));
        assert!(!fixture.dist.control_plane().is_listening());
    }

    #[tokio::test]
    async fn test_run_follows_plan() {
        let fixture = Fixture::new();
        let orchestrator = fixture.orchestrator(&["wildfly spaced"]);
        let plan = Plan {
            scenarios: vec![Scenario::Help, Scenario::Paths],
            topologies: vec![Topology::Standalone],
            server_args: vec!["-b".to_string(), "127.0.0.1".to_string()],
        };

        let report = orchestrator.run(&plan).await;

        let scenarios: Vec<Scenario> = report.entries().iter().map(|e| e.scenario).collect();
        assert_eq!(
            scenarios,
            vec![Scenario::Help, Scenario::Help, Scenario::Paths]
        );
        assert!(report.is_success(), "{:?}", failures(&report));
    }
}
