//! Project manifest parsing and types (bread.toml)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{PackageError, Result};

/// Manifest file name
pub const MANIFEST_FILE: &str = "bread.toml";

/// Project manifest (bread.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub package: PackageMetadata,
    #[serde(default, rename = "bread")]
    pub bread: BreadDirs,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "server-dependencies")]
    pub server_dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load manifest from file. A missing file is `ManifestMissing`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PackageError::ManifestMissing
            } else {
                PackageError::Filesystem(e)
            }
        })?;
        Self::from_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Dependency map for a realm
    pub fn dependencies_for(&self, realm: Realm) -> &BTreeMap<String, String> {
        match realm {
            Realm::Shared => &self.dependencies,
            Realm::Server => &self.server_dependencies,
            Realm::Dev => &self.dev_dependencies,
        }
    }

    /// Mutable dependency map for a realm
    pub fn dependencies_for_mut(&mut self, realm: Realm) -> &mut BTreeMap<String, String> {
        match realm {
            Realm::Shared => &mut self.dependencies,
            Realm::Server => &mut self.server_dependencies,
            Realm::Dev => &mut self.dev_dependencies,
        }
    }

    /// Output directory for a realm, relative paths resolved against `project_path`
    pub fn realm_dir(&self, project_path: &Path, realm: Realm) -> PathBuf {
        let configured = match realm {
            Realm::Shared => self.bread.shared_dir.as_deref(),
            Realm::Server => self.bread.server_dir.as_deref(),
            Realm::Dev => self.bread.dev_dir.as_deref(),
        };
        project_path.join(configured.unwrap_or(realm.default_dir()))
    }
}

/// Package identity and registry metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: semver::Version,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub realm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub private: bool,
}

/// Output directory overrides ([bread] table)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BreadDirs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_dir: Option<String>,
}

/// Installation namespace for a dependency and its transitive closure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Realm {
    Shared,
    Server,
    Dev,
}

impl Realm {
    pub const ALL: [Realm; 3] = [Realm::Shared, Realm::Server, Realm::Dev];

    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Shared => "shared",
            Realm::Server => "server",
            Realm::Dev => "dev",
        }
    }

    pub fn default_dir(&self) -> &'static str {
        match self {
            Realm::Shared => "Packages",
            Realm::Server => "ServerPackages",
            Realm::Dev => "DevPackages",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Realm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Realm::Shared),
            "server" => Ok(Realm::Server),
            "dev" => Ok(Realm::Dev),
            _ => Err(format!("unknown realm '{s}' (expected shared, server or dev)")),
        }
    }
}

/// A dependency entry split into its registry name and constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSpec {
    /// Registry-canonical `scope/name`
    pub name: String,
    /// Raw constraint expression, empty means latest
    pub constraint: String,
    /// The spec was a bare `scope/name` with no `@constraint` part
    pub bare_name: bool,
}

impl ParsedSpec {
    /// Split an `(alias, spec)` manifest entry.
    ///
    /// `Foo = "scope/foo@^1.2"` names the package in the spec; a bare
    /// `"scope/foo"` is taken as the package name with an open constraint;
    /// otherwise the alias is the package name and the spec is the constraint.
    pub fn parse(alias: &str, spec: &str) -> Result<Self> {
        let (name, constraint, bare_name) = if let Some((name, constraint)) = spec.split_once('@') {
            (name.to_string(), constraint.to_string(), false)
        } else if spec.contains('/') {
            (spec.to_string(), String::new(), true)
        } else {
            (alias.to_string(), spec.to_string(), false)
        };

        validate_package_name(&name)
            .map_err(|_| PackageError::InvalidPackageSpec(format!("{alias} = \"{spec}\"")))?;

        Ok(Self {
            name,
            constraint,
            bare_name,
        })
    }

    /// Short name: the part after the scope
    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }
}

/// Validate a `scope/name` identifier: exactly one slash, both parts non-empty
pub fn validate_package_name(name: &str) -> Result<()> {
    match name.split_once('/') {
        Some((scope, rest)) if !scope.is_empty() && !rest.is_empty() && !rest.contains('/') => {
            Ok(())
        }
        _ => Err(PackageError::InvalidProjectName(name.to_string())),
    }
}

/// Last path segment of a `scope/name` identifier
pub fn short_name(name: &str) -> &str {
    name.split_once('/').map(|(_, n)| n).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_manifest() {
        let toml = r#"
            [package]
            name = "user/proj"
            version = "0.1.0"
        "#;

        let manifest = Manifest::from_str(toml).unwrap();
        assert_eq!(manifest.package.name, "user/proj");
        assert_eq!(manifest.package.version.to_string(), "0.1.0");
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_parse_complete_manifest() {
        let toml = r#"
            [package]
            name = "user/proj"
            version = "1.2.3"
            registry = "https://github.com/UpliftGames/wally-index"
            realm = "shared"
            description = "A test project"
            authors = ["Alice <alice@example.com>"]
            license = "MIT"

            [bread]
            shared_dir = "Modules"

            [dependencies]
            Foo = "scope/foo@^1.0"

            [server-dependencies]
            Bar = "scope/bar@2.0.0"

            [dev-dependencies]
            TestKit = "scope/testkit@^0.1"
        "#;

        let manifest = Manifest::from_str(toml).unwrap();
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.server_dependencies.len(), 1);
        assert_eq!(manifest.dev_dependencies.len(), 1);
        assert_eq!(manifest.bread.shared_dir.as_deref(), Some("Modules"));
    }

    #[test]
    fn test_realm_dir_defaults() {
        let toml = r#"
            [package]
            name = "user/proj"
            version = "0.1.0"
        "#;

        let manifest = Manifest::from_str(toml).unwrap();
        let base = Path::new("/proj");
        assert_eq!(
            manifest.realm_dir(base, Realm::Shared),
            PathBuf::from("/proj/Packages")
        );
        assert_eq!(
            manifest.realm_dir(base, Realm::Server),
            PathBuf::from("/proj/ServerPackages")
        );
        assert_eq!(
            manifest.realm_dir(base, Realm::Dev),
            PathBuf::from("/proj/DevPackages")
        );
    }

    #[test]
    fn test_spec_with_constraint() {
        let spec = ParsedSpec::parse("Foo", "scope/foo@^1.2.0").unwrap();
        assert_eq!(spec.name, "scope/foo");
        assert_eq!(spec.constraint, "^1.2.0");
        assert!(!spec.bare_name);
        assert_eq!(spec.short_name(), "foo");
    }

    #[test]
    fn test_spec_bare_fullname() {
        let spec = ParsedSpec::parse("Foo", "scope/foo").unwrap();
        assert_eq!(spec.name, "scope/foo");
        assert_eq!(spec.constraint, "");
        assert!(spec.bare_name);
    }

    #[test]
    fn test_spec_alias_is_name() {
        let spec = ParsedSpec::parse("scope/foo", "^1.0.0").unwrap();
        assert_eq!(spec.name, "scope/foo");
        assert_eq!(spec.constraint, "^1.0.0");
        assert!(!spec.bare_name);
    }

    #[test]
    fn test_spec_invalid_name() {
        assert!(ParsedSpec::parse("Foo", "^1.0.0").is_err());
        assert!(ParsedSpec::parse("Foo", "a/b/c@1.0.0").is_err());
    }

    #[test]
    fn test_validate_package_name() {
        assert!(validate_package_name("user/proj").is_ok());
        assert!(validate_package_name("noslash").is_err());
        assert!(validate_package_name("/proj").is_err());
        assert!(validate_package_name("user/").is_err());
    }

    #[test]
    fn test_realm_round_trip() {
        for realm in Realm::ALL {
            assert_eq!(realm.as_str().parse::<Realm>().unwrap(), realm);
        }
        assert!("client".parse::<Realm>().is_err());
    }
}
