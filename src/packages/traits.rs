// src/packages/traits.rs

//! Common traits for package install backends

use super::PackageKind;
use thiserror::Error;

/// A single failed install attempt
///
/// Never fatal on its own: the installer retries and folds the final
/// result into the outcome ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to install {identifier}: {message}")]
pub struct InstallError {
    pub identifier: String,
    pub message: String,
}

impl InstallError {
    pub fn new(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            message: message.into(),
        }
    }
}

/// Common interface for install capabilities (Homebrew formulae, casks, etc.)
///
/// Implementations are shared across worker threads, so they must be
/// `Send + Sync`. Concurrent calls are only ever made for distinct
/// identifiers.
pub trait PackageBackend: Send + Sync {
    /// The kind of package this backend installs
    fn kind(&self) -> PackageKind;

    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Check whether the package is already present
    ///
    /// Must be side-effect free. Any failure to query counts as "not installed".
    fn is_installed(&self, identifier: &str) -> bool;

    /// Install the package
    ///
    /// May take minutes. Must be safe to call again after a failure.
    fn install(&self, identifier: &str) -> Result<(), InstallError>;
}
