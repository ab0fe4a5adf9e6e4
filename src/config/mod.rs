// src/config/mod.rs

//! Declarative package list
//!
//! The package list is a YAML document mapping categories to the packages
//! they contain, one list per package kind, plus a `settings` section
//! with the run tunables:
//!
//! ```yaml
//! settings:
//!   max_jobs: 4
//!   retry_attempts: 3
//!   retry_delay: 2
//! categories:
//!   core:
//!     description: Command-line essentials
//!     brew: [git, node]
//!     cask: [docker]
//!   frontend:
//!     enabled: false
//!     brew: [pnpm]
//! ```
//!
//! Categories are enabled unless they say otherwise. Looking up a category
//! or kind that is not present yields an empty list, never an error.

pub mod settings;

pub use settings::{Settings, SettingsOverrides};

use crate::error::{Error, Result};
use crate::packages::{PackageKind, PackageSpec};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default package list location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "packages.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    categories: BTreeMap<String, Category>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Category {
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "formulae", deserialize_with = "null_as_empty")]
    brew: Vec<String>,
    #[serde(default, alias = "casks", deserialize_with = "null_as_empty")]
    cask: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

/// A key with no value (`brew:`) is an empty list
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Category {
    fn identifiers(&self, kind: PackageKind) -> &[String] {
        match kind {
            PackageKind::Library => &self.brew,
            PackageKind::Application => &self.cask,
        }
    }
}

/// Loaded and validated package list
#[derive(Debug)]
pub struct ConfigLoader {
    document: Document,
}

impl ConfigLoader {
    /// Load the package list from a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading package list from {}", path.display());

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.display().to_string()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Self::parse(&contents).map_err(|e| match e {
            Error::ConfigMalformed(msg) => {
                Error::ConfigMalformed(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse the package list from a YAML string
    pub fn parse(yaml: &str) -> Result<Self> {
        let document: Document = if yaml.trim().is_empty() {
            Document::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| Error::ConfigMalformed(e.to_string()))?
        };

        document.settings.validate().map_err(Error::ConfigMalformed)?;

        for (name, category) in &document.categories {
            for kind in PackageKind::ALL {
                if category.identifiers(kind).iter().any(|id| id.trim().is_empty()) {
                    return Err(Error::ConfigMalformed(format!(
                        "category '{}' has a blank {} identifier",
                        name, kind
                    )));
                }
            }
        }

        debug!("Loaded {} categories", document.categories.len());
        Ok(Self { document })
    }

    /// Packages of one kind declared in a category, in declaration order
    pub fn get_packages(&self, category: &str, kind: PackageKind) -> Vec<PackageSpec> {
        self.document
            .categories
            .get(category)
            .map(|c| {
                c.identifiers(kind)
                    .iter()
                    .map(|id| PackageSpec::new(id.trim(), kind, category))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a category exists and is enabled
    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.document
            .categories
            .get(category)
            .is_some_and(|c| c.enabled)
    }

    /// Whether a category is declared at all
    pub fn has_category(&self, category: &str) -> bool {
        self.document.categories.contains_key(category)
    }

    /// All category names, sorted
    pub fn categories(&self) -> Vec<&str> {
        self.document.categories.keys().map(String::as_str).collect()
    }

    /// Enabled category names, sorted
    pub fn enabled_categories(&self) -> Vec<&str> {
        self.document
            .categories
            .iter()
            .filter(|(_, c)| c.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Free-form description of a category
    pub fn description(&self, category: &str) -> Option<&str> {
        self.document
            .categories
            .get(category)
            .and_then(|c| c.description.as_deref())
    }

    /// Run tunables
    pub fn settings(&self) -> &Settings {
        &self.document.settings
    }
}
