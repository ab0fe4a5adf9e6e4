// tests/integration_test.rs

//! Integration tests for devsetup
//!
//! These tests drive the install orchestrator end to end with an
//! instrumented in-memory backend.

use devsetup::config::ConfigLoader;
use devsetup::installer::{
    CancellationToken, InstallOptions, OutcomeKind, Orchestrator, RetryPolicy, install_all,
};
use devsetup::packages::{InstallError, PackageBackend, PackageKind, PackageSpec};
use devsetup::report::Summary;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// In-memory backend that records every call
#[derive(Default)]
struct StubBackend {
    installed: Mutex<HashSet<String>>,
    /// Number of failing install calls before success; u32::MAX fails forever
    failures: HashMap<String, u32>,
    delay: Duration,
    install_calls: Mutex<HashMap<String, u32>>,
    call_order: Mutex<Vec<String>>,
    is_installed_calls: AtomicUsize,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    /// Cancelled on the first install call
    cancel_on_install: Option<CancellationToken>,
}

impl StubBackend {
    fn new() -> Self {
        Self::default()
    }

    fn with_installed(self, ids: &[&str]) -> Self {
        self.installed
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        self
    }

    fn with_failures(mut self, id: &str, failures: u32) -> Self {
        self.failures.insert(id.to_string(), failures);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls_for(&self, id: &str) -> u32 {
        self.install_calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.install_calls.lock().unwrap().values().sum()
    }
}

impl PackageBackend for StubBackend {
    fn kind(&self) -> PackageKind {
        PackageKind::Library
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn is_installed(&self, identifier: &str) -> bool {
        self.is_installed_calls.fetch_add(1, Ordering::SeqCst);
        self.installed.lock().unwrap().contains(identifier)
    }

    fn install(&self, identifier: &str) -> Result<(), InstallError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        self.call_order.lock().unwrap().push(identifier.to_string());
        if let Some(token) = &self.cancel_on_install {
            token.cancel();
        }
        std::thread::sleep(self.delay);

        let call = {
            let mut calls = self.install_calls.lock().unwrap();
            let count = calls.entry(identifier.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let failures = self.failures.get(identifier).copied().unwrap_or(0);

        let result = if call <= failures {
            Err(InstallError::new(identifier, format!("attempt {} failed", call)))
        } else {
            self.installed.lock().unwrap().insert(identifier.to_string());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn specs(ids: &[&str]) -> Vec<PackageSpec> {
    ids.iter()
        .map(|id| PackageSpec::new(*id, PackageKind::Library, "core"))
        .collect()
}

fn options(max_jobs: usize, max_attempts: u32) -> InstallOptions {
    InstallOptions {
        max_jobs,
        retry: RetryPolicy::new(max_attempts, Duration::from_millis(1), 2),
        dry_run: false,
        fail_fast: false,
    }
}

#[test]
fn test_scenario_all_missing_all_succeed() {
    let backend = StubBackend::new();
    let ledger = install_all(&specs(&["git", "node", "docker"]), &backend, options(3, 3)).unwrap();

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.count(OutcomeKind::Installed), 3);
    assert_eq!(backend.total_calls(), 3);
    for outcome in &ledger {
        assert_eq!(outcome.attempts, 1);
    }
}

#[test]
fn test_scenario_already_installed_skips_install() {
    let backend = StubBackend::new().with_installed(&["git"]);
    let ledger = install_all(&specs(&["git"]), &backend, options(2, 3)).unwrap();

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("git").unwrap().status, OutcomeKind::AlreadyInstalled);
    assert_eq!(ledger.get("git").unwrap().attempts, 0);
    assert_eq!(backend.total_calls(), 0);
}

#[test]
fn test_scenario_flaky_install_retries() {
    let backend = StubBackend::new().with_failures("flaky", 1);
    let ledger = install_all(&specs(&["flaky"]), &backend, options(1, 3)).unwrap();

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("flaky").unwrap().status, OutcomeKind::Installed);
    assert_eq!(backend.calls_for("flaky"), 2);
}

#[test]
fn test_scenario_bounded_parallel_wall_clock() {
    let delay = Duration::from_millis(150);
    let backend = StubBackend::new().with_delay(delay);
    let orchestrator = Orchestrator::new(&backend, options(2, 1)).unwrap();

    let started = Instant::now();
    let ledger = orchestrator.install_all(&specs(&["a", "b", "c", "d", "e"]));
    let elapsed = started.elapsed();

    assert_eq!(ledger.count(OutcomeKind::Installed), 5);
    // ceil(5 / 2) rounds of installs: neither serial (5x) nor unbounded (1x)
    assert!(elapsed >= delay * 3, "finished too fast: {:?}", elapsed);
    assert!(elapsed < delay * 5, "ran serially: {:?}", elapsed);
    assert_eq!(backend.high_water.load(Ordering::SeqCst), 2);
}

#[test]
fn test_second_run_is_idempotent() {
    let backend = StubBackend::new();
    let list = specs(&["git", "node", "jq", "ripgrep"]);

    let first = install_all(&list, &backend, options(4, 2)).unwrap();
    assert_eq!(first.count(OutcomeKind::Installed), 4);
    let calls_after_first = backend.total_calls();

    let second = install_all(&list, &backend, options(4, 2)).unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(second.count(OutcomeKind::AlreadyInstalled), 4);
    assert_eq!(backend.total_calls(), calls_after_first);
}

#[test]
fn test_duplicates_installed_once() {
    let backend = StubBackend::new().with_delay(Duration::from_millis(20));
    let mut list = specs(&["a", "a", "b"]);
    list.push(PackageSpec::new("b", PackageKind::Library, "frontend"));

    let ledger = install_all(&list, &backend, options(4, 3)).unwrap();

    assert_eq!(ledger.len(), 2);
    assert_eq!(backend.calls_for("a"), 1);
    assert_eq!(backend.calls_for("b"), 1);
}

#[test]
fn test_in_flight_never_exceeds_max_jobs() {
    let ids: Vec<String> = (0..12).map(|i| format!("pkg-{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let list = specs(&id_refs);

    for max_jobs in 1..=4 {
        let backend = StubBackend::new().with_delay(Duration::from_millis(20));
        let ledger = install_all(&list, &backend, options(max_jobs, 1)).unwrap();

        assert_eq!(ledger.len(), 12);
        let high = backend.high_water.load(Ordering::SeqCst);
        assert!(high <= max_jobs, "max_jobs={} but saw {} in flight", max_jobs, high);
        assert!(high >= 1);
    }
}

#[test]
fn test_retry_exhaustion() {
    let backend = StubBackend::new().with_failures("broken", u32::MAX);
    let ledger = install_all(&specs(&["broken"]), &backend, options(1, 3)).unwrap();

    let outcome = ledger.get("broken").unwrap();
    assert_eq!(outcome.status, OutcomeKind::Failed);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.error.as_deref(), Some("attempt 3 failed"));
    assert_eq!(backend.calls_for("broken"), 3);
    assert!(ledger.has_failures());
}

#[test]
fn test_success_on_last_attempt() {
    let backend = StubBackend::new().with_failures("late", 3);
    let ledger = install_all(&specs(&["late"]), &backend, options(1, 4)).unwrap();

    assert_eq!(ledger.get("late").unwrap().status, OutcomeKind::Installed);
    assert_eq!(backend.calls_for("late"), 4);
}

#[test]
fn test_backoff_delays_retries() {
    let backend = StubBackend::new().with_failures("slow", 2);
    let retry = RetryPolicy::new(3, Duration::from_millis(50), 2);
    let started = Instant::now();
    let ledger = install_all(
        &specs(&["slow"]),
        &backend,
        InstallOptions {
            retry,
            ..options(1, 3)
        },
    )
    .unwrap();

    assert_eq!(ledger.get("slow").unwrap().status, OutcomeKind::Installed);
    // 50ms after the first failure, 100ms after the second
    assert!(started.elapsed() >= Duration::from_millis(150));
    assert!(ledger.get("slow").unwrap().duration >= Duration::from_millis(150));
}

#[test]
fn test_ledger_complete_with_mixed_outcomes() {
    let backend = StubBackend::new()
        .with_installed(&["git", "node"])
        .with_failures("broken", u32::MAX)
        .with_failures("flaky", 1);
    let list = specs(&["git", "jq", "broken", "node", "flaky", "jq", "git", "fd"]);

    let ledger = install_all(&list, &backend, options(3, 2)).unwrap();

    let unique: HashSet<_> = list.iter().map(|s| s.identifier.as_str()).collect();
    assert_eq!(ledger.len(), unique.len());
    for id in unique {
        assert!(ledger.contains(id), "missing outcome for {}", id);
    }

    let summary = Summary::from_ledger(&ledger);
    assert_eq!(summary.already_installed, 2);
    assert_eq!(summary.installed, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        summary.installed + summary.already_installed + summary.failed + summary.dry_run,
        summary.total
    );
}

#[test]
fn test_dry_run_touches_nothing() {
    let backend = StubBackend::new();
    let ledger = install_all(
        &specs(&["git", "node", "git"]),
        &backend,
        InstallOptions {
            dry_run: true,
            ..options(2, 3)
        },
    )
    .unwrap();

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.count(OutcomeKind::DryRun), 2);
    assert_eq!(backend.total_calls(), 0);
    assert_eq!(backend.is_installed_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancelled_before_start_returns_empty_ledger() {
    let backend = StubBackend::new();
    let token = CancellationToken::new();
    token.cancel();

    let orchestrator = Orchestrator::new(&backend, options(2, 3))
        .unwrap()
        .with_cancellation(token);
    let ledger = orchestrator.install_all(&specs(&["git", "node"]));

    assert!(ledger.is_empty());
    assert_eq!(backend.total_calls(), 0);
    assert_eq!(backend.is_installed_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_mid_run_keeps_in_flight_outcome() {
    let token = CancellationToken::new();
    let backend = StubBackend {
        cancel_on_install: Some(token.clone()),
        ..StubBackend::new()
    };

    let orchestrator = Orchestrator::new(&backend, options(1, 3))
        .unwrap()
        .with_cancellation(token.clone());
    let ledger = orchestrator.install_all(&specs(&["a", "b", "c", "d", "e"]));

    assert!(token.is_cancelled());
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.count(OutcomeKind::Installed), 1);
    assert_eq!(backend.total_calls(), 1);
}

#[test]
fn test_fail_fast_stops_dispatch() {
    let backend = StubBackend::new().with_failures("bad", u32::MAX);
    let orchestrator = Orchestrator::new(
        &backend,
        InstallOptions {
            fail_fast: true,
            ..options(1, 1)
        },
    )
    .unwrap();

    let ledger = orchestrator.install_all(&specs(&["a", "b", "bad", "c", "d"]));

    assert!(orchestrator.cancellation().is_cancelled());
    assert_eq!(ledger.get("bad").unwrap().status, OutcomeKind::Failed);
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.count(OutcomeKind::Failed), 1);
    assert!(ledger.contains("a") && ledger.contains("b"));
    assert!(!ledger.contains("c") && !ledger.contains("d"));
}

#[test]
fn test_fail_fast_on_first_declared_package() {
    let backend = StubBackend::new().with_failures("bad", u32::MAX);
    let orchestrator = Orchestrator::new(
        &backend,
        InstallOptions {
            fail_fast: true,
            ..options(1, 1)
        },
    )
    .unwrap();

    let ledger = orchestrator.install_all(&specs(&["bad", "a", "b", "c"]));

    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.get("bad").unwrap().status, OutcomeKind::Failed);
    assert_eq!(backend.total_calls(), 1);
}

#[test]
fn test_single_job_installs_in_declared_order() {
    let backend = StubBackend::new();
    let ledger = install_all(&specs(&["a", "b", "c", "d", "e"]), &backend, options(1, 1)).unwrap();

    let expected = vec!["a", "b", "c", "d", "e"];
    assert_eq!(*backend.call_order.lock().unwrap(), expected);
    let recorded: Vec<&str> = ledger.iter().map(|o| o.identifier.as_str()).collect();
    assert_eq!(recorded, expected);
}

#[test]
fn test_cancel_during_attempt_skips_backoff() {
    let token = CancellationToken::new();
    let backend = StubBackend {
        cancel_on_install: Some(token.clone()),
        ..StubBackend::new().with_failures("slow", u32::MAX)
    };
    let orchestrator = Orchestrator::new(
        &backend,
        InstallOptions {
            retry: RetryPolicy::new(3, Duration::from_secs(2), 2),
            ..options(1, 3)
        },
    )
    .unwrap()
    .with_cancellation(token);

    let started = Instant::now();
    let ledger = orchestrator.install_all(&specs(&["slow"]));

    assert!(started.elapsed() < Duration::from_secs(1), "waited {:?}", started.elapsed());
    let outcome = ledger.get("slow").unwrap();
    assert_eq!(outcome.status, OutcomeKind::Failed);
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.error.as_deref().unwrap().starts_with("cancelled"));
    assert_eq!(backend.calls_for("slow"), 1);
}

#[test]
fn test_cancel_interrupts_backoff_wait() {
    let backend = StubBackend::new().with_failures("slow", u32::MAX);
    let token = CancellationToken::new();
    let orchestrator = Orchestrator::new(
        &backend,
        InstallOptions {
            retry: RetryPolicy::new(3, Duration::from_secs(10), 2),
            ..options(1, 3)
        },
    )
    .unwrap()
    .with_cancellation(token.clone());

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        token.cancel();
    });

    let started = Instant::now();
    let ledger = orchestrator.install_all(&specs(&["slow"]));
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5), "waited {:?}", started.elapsed());
    assert_eq!(ledger.get("slow").unwrap().status, OutcomeKind::Failed);
    assert_eq!(backend.calls_for("slow"), 1);
}

#[test]
fn test_config_to_ledger_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packages.yaml");
    std::fs::write(
        &path,
        r#"
settings:
  max_jobs: 2
  retry_attempts: 2
  retry_delay: 0
categories:
  core:
    brew: [git, node]
    cask: [docker]
  frontend:
    brew: [node, pnpm]
  extras:
    enabled: false
    brew: [cowsay]
"#,
    )
    .unwrap();

    let config = ConfigLoader::from_path(&path).unwrap();
    let list: Vec<PackageSpec> = config
        .enabled_categories()
        .iter()
        .flat_map(|category| config.get_packages(category, PackageKind::Library))
        .collect();
    assert_eq!(list.len(), 4);

    let settings = config.settings();
    let backend = StubBackend::new().with_installed(&["git"]);
    let ledger = install_all(
        &list,
        &backend,
        InstallOptions {
            max_jobs: settings.max_jobs,
            retry: settings.retry_policy(),
            dry_run: false,
            fail_fast: false,
        },
    )
    .unwrap();

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.get("git").unwrap().status, OutcomeKind::AlreadyInstalled);
    assert_eq!(ledger.get("node").unwrap().status, OutcomeKind::Installed);
    assert_eq!(ledger.get("pnpm").unwrap().status, OutcomeKind::Installed);
    assert!(!ledger.contains("cowsay"));
    assert_eq!(backend.calls_for("node"), 1);
}

#[test]
fn test_missing_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = ConfigLoader::from_path(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(devsetup::Error::ConfigNotFound(_))));
}
