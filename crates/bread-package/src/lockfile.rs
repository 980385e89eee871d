//! Package lockfile (bread.lock) for reproducible installs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::Result;

/// Comment lines written ahead of the TOML body
pub const LOCKFILE_HEADER: &str =
    "# This file is automatically @generated by Bread.\n# It is not intended for manual editing.\n\n";

/// Lockfile file name
pub const LOCKFILE_FILE: &str = "bread.lock";

/// Lockfile structure (bread.lock)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Lockfile {
    pub registry: String,
    #[serde(default, rename = "package")]
    pub packages: Vec<LockedPackage>,
}

impl Lockfile {
    /// Parse lockfile from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load lockfile from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Serialize to TOML with the generated-file header
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(format!("{LOCKFILE_HEADER}{}", toml::to_string(self)?))
    }

    /// Write lockfile to file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Group entries by package name, in document order.
    ///
    /// Used as resolution hints: a prior locked version that still satisfies
    /// the manifest constraint is preferred over a registry lookup.
    pub fn hint_map(&self) -> HashMap<String, Vec<LockedPackage>> {
        let mut map: HashMap<String, Vec<LockedPackage>> = HashMap::new();
        for pkg in &self.packages {
            map.entry(pkg.name.clone()).or_default().push(pkg.clone());
        }
        map
    }
}

/// Locked package entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedPackage {
    /// Registry-canonical `scope/name`
    pub name: String,
    /// Resolved version
    pub version: semver::Version,
    /// `[alias, spec]` pairs as they appeared in the package's own manifest,
    /// sorted by alias
    pub dependencies: Vec<(String, String)>,
}
