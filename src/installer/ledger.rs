// src/installer/ledger.rs

//! Per-run record of install outcomes

use crate::error::{Error, Result};
use crate::packages::PackageKind;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Terminal state of one package in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Present before the run; nothing was done
    AlreadyInstalled,
    /// Installed during this run
    Installed,
    /// Every install attempt failed
    Failed,
    /// Dry run; nothing was checked or installed
    DryRun,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 4] = [
        OutcomeKind::Installed,
        OutcomeKind::AlreadyInstalled,
        OutcomeKind::Failed,
        OutcomeKind::DryRun,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            OutcomeKind::AlreadyInstalled => "already installed",
            OutcomeKind::Installed => "installed",
            OutcomeKind::Failed => "failed",
            OutcomeKind::DryRun => "dry run",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Result of processing one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub identifier: String,
    pub kind: PackageKind,
    pub status: OutcomeKind,
    /// Wall-clock time of the idempotency check and all attempts
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Install calls made (0 when already installed or dry run)
    pub attempts: u32,
    /// Last install error, for failed packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallOutcome {
    pub fn new(identifier: impl Into<String>, kind: PackageKind, status: OutcomeKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            status,
            duration: Duration::ZERO,
            attempts: 0,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Outcomes of one run, at most one per package identifier
///
/// Keeps insertion order. A second outcome for an identifier that is
/// already recorded is rejected, so concurrent reporters cannot
/// duplicate an entry.
#[derive(Debug, Clone, Default)]
pub struct OutcomeLedger {
    outcomes: Vec<InstallOutcome>,
    seen: HashSet<String>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome
    ///
    /// Returns false (and drops the outcome) if the identifier is already present.
    pub fn record(&mut self, outcome: InstallOutcome) -> bool {
        if !self.seen.insert(outcome.identifier.clone()) {
            return false;
        }
        self.outcomes.push(outcome);
        true
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&InstallOutcome> {
        self.outcomes.iter().find(|o| o.identifier == identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter()
    }

    /// Number of outcomes with the given status
    pub fn count(&self, status: OutcomeKind) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Outcomes that ended in failure
    pub fn failed(&self) -> impl Iterator<Item = &InstallOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeKind::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Turn the first failure into an error
    pub fn check(&self) -> Result<()> {
        match self.failed().next() {
            Some(outcome) => Err(Error::PackageFailed {
                identifier: outcome.identifier.clone(),
                message: outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "install failed".to_string()),
            }),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a OutcomeLedger {
    type Item = &'a InstallOutcome;
    type IntoIter = std::slice::Iter<'a, InstallOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}
