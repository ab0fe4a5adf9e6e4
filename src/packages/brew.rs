// src/packages/brew.rs

//! Homebrew install backend
//!
//! Drives the `brew` executable for both package kinds: formulae for
//! [`PackageKind::Library`] and casks for [`PackageKind::Application`].

use super::traits::{InstallError, PackageBackend};
use super::PackageKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Default executable name, resolved through PATH
pub const DEFAULT_BREW_BINARY: &str = "brew";

/// Install backend that shells out to Homebrew
#[derive(Debug, Clone)]
pub struct HomebrewBackend {
    kind: PackageKind,
    binary: PathBuf,
}

impl HomebrewBackend {
    /// Create a backend using `brew` from PATH
    pub fn new(kind: PackageKind) -> Self {
        Self::with_binary(kind, DEFAULT_BREW_BINARY)
    }

    /// Create a backend using a specific `brew` executable
    pub fn with_binary(kind: PackageKind, binary: impl AsRef<Path>) -> Self {
        Self {
            kind,
            binary: binary.as_ref().to_path_buf(),
        }
    }

    fn kind_flag(&self) -> &'static str {
        match self.kind {
            PackageKind::Library => "--formula",
            PackageKind::Application => "--cask",
        }
    }

    /// Name used by `brew list`: tap-qualified identifiers (`owner/tap/name`)
    /// are listed under their final segment.
    fn list_name(identifier: &str) -> &str {
        identifier.rsplit('/').next().unwrap_or(identifier)
    }

    /// Last non-empty line of a command's stderr, for error messages
    fn last_line(output: &[u8]) -> Option<String> {
        String::from_utf8_lossy(output)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

impl PackageBackend for HomebrewBackend {
    fn kind(&self) -> PackageKind {
        self.kind
    }

    fn name(&self) -> &str {
        match self.kind {
            PackageKind::Library => "brew",
            PackageKind::Application => "brew cask",
        }
    }

    fn is_installed(&self, identifier: &str) -> bool {
        let status = Command::new(&self.binary)
            .args(["list", self.kind_flag(), "--versions"])
            .arg(Self::list_name(identifier))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                warn!("Failed to query {} for {}: {}", self.binary.display(), identifier, e);
                false
            }
        }
    }

    fn install(&self, identifier: &str) -> Result<(), InstallError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("install");
        if self.kind == PackageKind::Application {
            cmd.arg("--cask");
        }

        // Parallel installs must not each trigger `brew update` and race on its lock
        let output = cmd
            .arg(identifier)
            .env("HOMEBREW_NO_AUTO_UPDATE", "1")
            .env("HOMEBREW_NO_INSTALL_CLEANUP", "1")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                InstallError::new(
                    identifier,
                    format!("failed to run {}: {}", self.binary.display(), e),
                )
            })?;

        if output.status.success() {
            debug!("{} install {} succeeded", self.name(), identifier);
            return Ok(());
        }

        let message = Self::last_line(&output.stderr).unwrap_or_else(|| match output.status.code() {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        });
        Err(InstallError::new(identifier, message))
    }
}
