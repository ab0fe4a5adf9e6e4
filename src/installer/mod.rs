// src/installer/mod.rs

//! Bounded-parallel package installation
//!
//! The [`Orchestrator`] installs a list of packages of one kind through a
//! [`PackageBackend`]:
//!
//! - Specs are deduplicated by identifier before dispatch, so the backend
//!   never sees two concurrent installs of the same package
//! - A fixed pool of `max_jobs` worker threads drains the queue in
//!   declaration order; idle workers block, they never poll
//! - Each package is checked with `is_installed` first and only installed
//!   when missing, with retries and exponential backoff per [`RetryPolicy`]
//! - Every package ends in exactly one [`InstallOutcome`] in the returned
//!   [`OutcomeLedger`]; install failures never abort the run
//!
//! `install_all` returns only after every dispatched package has reached a
//! terminal state.

mod cancel;
mod ledger;
mod retry;

pub use cancel::CancellationToken;
pub use ledger::{InstallOutcome, OutcomeKind, OutcomeLedger};
pub use retry::{DEFAULT_MAX_DELAY, RetryPolicy};

use crate::error::Result;
use crate::packages::{PackageBackend, PackageSpec};
use crate::progress::{ProgressTracker, SilentProgress};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Parameters of one install run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Maximum installs in flight at once
    pub max_jobs: usize,
    pub retry: RetryPolicy,
    /// Record every package as [`OutcomeKind::DryRun`] without touching the backend
    pub dry_run: bool,
    /// Cancel the run after the first failed package
    pub fail_fast: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            max_jobs: 4,
            retry: RetryPolicy::default(),
            dry_run: false,
            fail_fast: false,
        }
    }
}

/// Installs packages of a single kind with bounded concurrency
pub struct Orchestrator<'a> {
    backend: &'a dyn PackageBackend,
    options: InstallOptions,
    pool: rayon::ThreadPool,
    progress: Option<&'a dyn ProgressTracker>,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator with a worker pool of `options.max_jobs` threads
    pub fn new(backend: &'a dyn PackageBackend, options: InstallOptions) -> Result<Self> {
        let options = InstallOptions {
            max_jobs: options.max_jobs.max(1),
            ..options
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_jobs)
            .thread_name(|i| format!("devsetup-install-{}", i))
            .build()?;

        Ok(Self {
            backend,
            options,
            pool,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Report progress to the given tracker
    pub fn with_progress(mut self, progress: &'a dyn ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stop dispatching packages once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Token that stops this orchestrator from dispatching further packages
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Install every package in `specs`
    ///
    /// Never fails: per-package errors are folded into the ledger. If the
    /// cancellation token fires, packages not yet started are left out
    /// of the returned ledger.
    pub fn install_all(&self, specs: &[PackageSpec]) -> OutcomeLedger {
        let silent = SilentProgress::new();
        let progress: &dyn ProgressTracker = match self.progress {
            Some(progress) => progress,
            None => &silent,
        };

        let unique = self.dedup(specs);
        progress.set_length(unique.len() as u64);

        info!(
            "Installing {} {} package(s) with {} job(s){}",
            unique.len(),
            self.backend.kind(),
            self.options.max_jobs,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        if self.options.dry_run {
            let mut ledger = OutcomeLedger::new();
            for spec in unique {
                ledger.record(InstallOutcome::new(
                    spec.identifier.as_str(),
                    spec.kind,
                    OutcomeKind::DryRun,
                ));
                progress.increment(1);
            }
            return ledger;
        }

        let ledger = Mutex::new(OutcomeLedger::new());

        // FIFO so packages start in the order they were declared
        self.pool.scope_fifo(|scope| {
            for spec in unique.iter().copied() {
                let ledger = &ledger;
                scope.spawn_fifo(move |_| {
                    if self.cancel.is_cancelled() {
                        debug!("Cancelled before starting {}", spec.identifier);
                        return;
                    }

                    let outcome = self.install_one(spec, progress);
                    progress.increment(1);

                    if self.options.fail_fast && outcome.status == OutcomeKind::Failed {
                        warn!("{} failed, not starting further packages", spec.identifier);
                        self.cancel.cancel();
                    }

                    if !ledger.lock().record(outcome) {
                        warn!("Dropping duplicate outcome for {}", spec.identifier);
                    }
                });
            }
        });

        let ledger = ledger.into_inner();
        if self.cancel.is_cancelled() {
            warn!(
                "Run cancelled: {} of {} package(s) processed",
                ledger.len(),
                unique.len()
            );
        }
        ledger
    }

    /// Keep the first spec per identifier, dropping specs of other kinds
    fn dedup<'s>(&self, specs: &'s [PackageSpec]) -> Vec<&'s PackageSpec> {
        let kind = self.backend.kind();
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(specs.len());

        for spec in specs {
            if spec.kind != kind {
                warn!(
                    "Skipping {} ({}): {} backend only installs {} packages",
                    spec.identifier,
                    spec.kind,
                    self.backend.name(),
                    kind
                );
                continue;
            }
            if seen.insert(spec.identifier.as_str()) {
                unique.push(spec);
            } else {
                debug!(
                    "Skipping duplicate {} from category {}",
                    spec.identifier, spec.category
                );
            }
        }

        unique
    }

    /// Run one package through check, install and retry
    fn install_one(&self, spec: &PackageSpec, progress: &dyn ProgressTracker) -> InstallOutcome {
        let id = spec.identifier.as_str();
        let started = Instant::now();
        let retry = &self.options.retry;

        progress.set_message(&format!("Checking {}", id));
        if self.backend.is_installed(id) {
            debug!("{} is already installed", id);
            return InstallOutcome::new(id, spec.kind, OutcomeKind::AlreadyInstalled)
                .with_duration(started.elapsed());
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            progress.set_message(&format!("Installing {} (attempt {}/{})", id, attempt, retry.max_attempts));

            let err = match self.backend.install(id) {
                Ok(()) => {
                    info!("Installed {} in {:.1?}", id, started.elapsed());
                    return InstallOutcome::new(id, spec.kind, OutcomeKind::Installed)
                        .with_duration(started.elapsed())
                        .with_attempts(attempt);
                }
                Err(e) => e,
            };

            if !retry.has_next(attempt) {
                warn!("Giving up on {} after {} attempt(s): {}", id, attempt, err.message);
                return InstallOutcome::new(id, spec.kind, OutcomeKind::Failed)
                    .with_duration(started.elapsed())
                    .with_attempts(attempt)
                    .with_error(err.message);
            }

            // Backoff wait ends early when the run is cancelled
            let cancelled = self.cancel.is_cancelled() || {
                let delay = retry.delay_after(attempt);
                warn!(
                    "Install attempt {} for {} failed: {}, retrying in {:?}",
                    attempt, id, err.message, delay
                );
                self.cancel.wait_for(delay)
            };

            if cancelled {
                return InstallOutcome::new(id, spec.kind, OutcomeKind::Failed)
                    .with_duration(started.elapsed())
                    .with_attempts(attempt)
                    .with_error(format!("cancelled after {} attempt(s): {}", attempt, err.message));
            }
        }
    }
}

/// Install `specs` with a one-off [`Orchestrator`]
///
/// Only fails if the worker pool cannot be created.
pub fn install_all(
    specs: &[PackageSpec],
    backend: &dyn PackageBackend,
    options: InstallOptions,
) -> Result<OutcomeLedger> {
    Ok(Orchestrator::new(backend, options)?.install_all(specs))
}
