// src/packages/mod.rs

//! Package descriptions and install backends
//!
//! A [`PackageSpec`] names one installable unit. Each [`PackageKind`] is
//! served by a backend implementing the [`PackageBackend`] trait; the
//! Homebrew backend handles both formulae and casks.

pub mod brew;
pub mod traits;

pub use brew::HomebrewBackend;
pub use traits::{InstallError, PackageBackend};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of an installable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Command-line tools and libraries (Homebrew formulae)
    Library,
    /// GUI applications (Homebrew casks)
    Application,
}

impl PackageKind {
    pub const ALL: [PackageKind; 2] = [PackageKind::Library, PackageKind::Application];

    pub fn as_str(&self) -> &str {
        match self {
            PackageKind::Library => "library",
            PackageKind::Application => "application",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "library" | "formula" | "brew" => Ok(PackageKind::Library),
            "application" | "cask" => Ok(PackageKind::Application),
            _ => Err(format!("Invalid package kind: {}", s)),
        }
    }
}

/// A single package to install, as declared in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub identifier: String,
    pub kind: PackageKind,
    pub category: String,
}

impl PackageSpec {
    /// Create a new PackageSpec
    pub fn new(identifier: impl Into<String>, kind: PackageKind, category: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            category: category.into(),
        }
    }
}
