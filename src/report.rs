// src/report.rs

//! End-of-run breakdown of an outcome ledger

use crate::installer::{InstallOutcome, OutcomeKind, OutcomeLedger};
use crate::packages::PackageKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;

/// Counts per outcome kind for one ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub installed: usize,
    pub already_installed: usize,
    pub failed: usize,
    pub dry_run: usize,
    /// Identifiers of failed packages with their last error
    pub failures: Vec<(String, String)>,
    /// Slowest package and how long it took
    #[serde(skip)]
    pub slowest: Option<(String, Duration)>,
}

impl Summary {
    pub fn from_ledger(ledger: &OutcomeLedger) -> Self {
        let mut summary = Summary::default();

        for outcome in ledger {
            summary.total += 1;
            match outcome.status {
                OutcomeKind::Installed => summary.installed += 1,
                OutcomeKind::AlreadyInstalled => summary.already_installed += 1,
                OutcomeKind::DryRun => summary.dry_run += 1,
                OutcomeKind::Failed => {
                    summary.failed += 1;
                    summary.failures.push((
                        outcome.identifier.clone(),
                        outcome.error.clone().unwrap_or_default(),
                    ));
                }
            }

            let slower = summary
                .slowest
                .as_ref()
                .is_none_or(|(_, longest)| outcome.duration > *longest);
            if slower && outcome.status != OutcomeKind::DryRun {
                summary.slowest = Some((outcome.identifier.clone(), outcome.duration));
            }
        }

        summary
    }

    pub fn count(&self, status: OutcomeKind) -> usize {
        match status {
            OutcomeKind::Installed => self.installed,
            OutcomeKind::AlreadyInstalled => self.already_installed,
            OutcomeKind::Failed => self.failed,
            OutcomeKind::DryRun => self.dry_run,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Render a human-readable breakdown
///
/// Outcome kinds with a zero count are omitted.
pub fn render_summary(title: &str, summary: &Summary, elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} package(s) in {:.1}s",
        title,
        summary.total,
        elapsed.as_secs_f64()
    );

    for status in OutcomeKind::ALL {
        let count = summary.count(status);
        if count > 0 {
            let _ = writeln!(out, "  {:<18} {}", format!("{}:", status), count);
        }
    }

    if let Some((identifier, duration)) = &summary.slowest {
        let _ = writeln!(out, "  slowest: {} ({:.1}s)", identifier, duration.as_secs_f64());
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "  Failed packages:");
        for (identifier, error) in &summary.failures {
            if error.is_empty() {
                let _ = writeln!(out, "    [FAILED] {}", identifier);
            } else {
                let _ = writeln!(out, "    [FAILED] {}: {}", identifier, error);
            }
        }
    }

    out
}

/// Machine-readable record of one install run, printed with `--json`
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub started_at: DateTime<Utc>,
    pub kind: PackageKind,
    pub dry_run: bool,
    pub cancelled: bool,
    pub summary: Summary,
    pub outcomes: Vec<&'a InstallOutcome>,
}

impl<'a> RunReport<'a> {
    pub fn new(
        started_at: DateTime<Utc>,
        kind: PackageKind,
        dry_run: bool,
        cancelled: bool,
        ledger: &'a OutcomeLedger,
    ) -> Self {
        Self {
            started_at,
            kind,
            dry_run,
            cancelled,
            summary: Summary::from_ledger(ledger),
            outcomes: ledger.iter().collect(),
        }
    }
}
