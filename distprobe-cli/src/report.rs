//! Result table printed after a run.

use colored::Colorize;
use distprobe_harness::Topology;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{info, warn};

use crate::orchestrator::Scenario;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub scenario: Scenario,
    pub topology: Option<Topology>,
    /// Path name, log directory or argument the check was about
    pub subject: String,
    pub failure: Option<String>,
}

impl Entry {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<Entry>,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "SCENARIO")]
    scenario: String,
    #[tabled(rename = "MODE")]
    mode: String,
    #[tabled(rename = "PATH")]
    subject: String,
    #[tabled(rename = "RESULT")]
    result: String,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        scenario: Scenario,
        topology: Option<Topology>,
        subject: &str,
        result: Result<(), String>,
    ) {
        let mode = topology.map_or("-", |t| t.as_str());
        match &result {
            Ok(()) => info!("Success {} {} {}", scenario, mode, subject),
            Err(failure) => warn!("Failed {} {} {}: {}", scenario, mode, subject, failure),
        }
        self.entries.push(Entry {
            scenario,
            topology,
            subject: subject.to_string(),
            failure: result.err(),
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.passed()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Table of every entry followed by the transcript of each failure.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "No checks were run\n".to_string();
        }

        let rows: Vec<ReportRow> = self
            .entries
            .iter()
            .map(|entry| ReportRow {
                scenario: entry.scenario.to_string(),
                mode: entry
                    .topology
                    .map_or_else(|| "-".to_string(), |t| t.to_string()),
                subject: entry.subject.clone(),
                result: if entry.passed() {
                    "PASS".green().to_string()
                } else {
                    "FAIL".red().bold().to_string()
                },
            })
            .collect();

        let mut out = Table::new(rows).with(Style::blank()).to_string();
        out.push_str("\n\n");

        let failed = self.failure_count();
        let summary = format!("{} passed, {} failed", self.len() - failed, failed);
        if failed == 0 {
            out.push_str(&summary.green().to_string());
        } else {
            out.push_str(&summary.red().to_string());
        }
        out.push('\n');

        for entry in self.entries.iter().filter(|e| !e.passed()) {
            let header = format!(
                "{} {} '{}'",
                entry.scenario,
                entry.topology.map_or("-", |t| t.as_str()),
                entry.subject
            );
            out.push('\n');
            out.push_str(&header.bold().to_string());
            out.push('\n');
            out.push_str(entry.failure.as_deref().unwrap_or_default());
            out.push('\n');
        }
        out
    }
}
