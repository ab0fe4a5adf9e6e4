// src/lib.rs

//! devsetup workstation provisioning
//!
//! Installs the packages declared in a YAML package list, with bounded
//! parallelism, idempotency checks and retries.
//!
//! # Architecture
//!
//! - Config: categories of packages per kind, plus run tunables
//! - Installer: worker pool that takes every package to a terminal outcome
//! - Packages: install backends per kind (Homebrew formulae and casks)
//! - Progress and report: live progress with ETA, end-of-run breakdown

pub mod config;
mod error;
pub mod installer;
pub mod packages;
pub mod progress;
pub mod report;

pub use error::{Error, Result};
