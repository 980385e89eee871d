//! Constraint-to-version resolution with lockfile bias

use semver::Version;
use std::collections::HashMap;

use crate::constraint::Constraint;
use crate::lockfile::LockedPackage;
use crate::registry::RegistryClient;
use crate::{PackageError, Result};

/// Resolve a constraint to a concrete version.
///
/// Lockfile hints win: the first prior locked version of the package that
/// still satisfies the constraint is returned without a registry lookup,
/// which is what makes reinstalls reproducible. Otherwise the highest
/// published version satisfying the constraint is selected.
pub async fn resolve_version(
    registry: &RegistryClient,
    name: &str,
    constraint: &Constraint,
    hints: &HashMap<String, Vec<LockedPackage>>,
) -> Result<Version> {
    if let Some(locked) = hints.get(name) {
        for pkg in locked {
            if constraint.matches(&pkg.version) {
                return Ok(pkg.version.clone());
            }
        }
    }

    let published = registry.list_versions(name).await?;
    select_version(&published, constraint).ok_or_else(|| PackageError::UnsatisfiableConstraint {
        name: name.to_string(),
        constraint: constraint.to_string(),
    })
}

/// Highest version in `published` satisfying `constraint`.
/// Entries that fail to parse as semver are skipped.
pub fn select_version(published: &[String], constraint: &Constraint) -> Option<Version> {
    let mut candidates: Vec<Version> = published
        .iter()
        .filter_map(|s| Version::parse(s).ok())
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .rev()
        .find(|v| constraint.matches(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(versions: &[&str]) -> Vec<String> {
        versions.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_highest_satisfying() {
        let versions = published(&["1.2.0", "1.2.5", "1.3.0", "2.0.0"]);
        let constraint = Constraint::parse("^1.2.0").unwrap();
        assert_eq!(
            select_version(&versions, &constraint),
            Some(Version::new(1, 3, 0))
        );
    }

    #[test]
    fn test_select_any_takes_latest() {
        let versions = published(&["0.9.0", "2.0.0", "1.5.0"]);
        assert_eq!(
            select_version(&versions, &Constraint::Any),
            Some(Version::new(2, 0, 0))
        );
    }

    #[test]
    fn test_select_skips_unparseable() {
        let versions = published(&["not-a-version", "1.0.0"]);
        assert_eq!(
            select_version(&versions, &Constraint::Any),
            Some(Version::new(1, 0, 0))
        );
    }

    #[test]
    fn test_select_none_matches() {
        let versions = published(&["1.0.0", "1.1.0"]);
        let constraint = Constraint::parse("^2.0.0").unwrap();
        assert_eq!(select_version(&versions, &constraint), None);
    }

    #[tokio::test]
    async fn test_hint_bias_skips_registry() {
        // No server behind this client: a registry lookup would error out,
        // so a successful resolve proves the hint short-circuited it.
        let registry = RegistryClient::with_base_url("http://127.0.0.1:9");
        let constraint = Constraint::parse("^1.2.0").unwrap();

        let mut hints = HashMap::new();
        hints.insert(
            "scope/foo".to_string(),
            vec![LockedPackage {
                name: "scope/foo".to_string(),
                version: Version::new(1, 2, 5),
                dependencies: vec![],
            }],
        );

        let version = resolve_version(&registry, "scope/foo", &constraint, &hints)
            .await
            .unwrap();
        assert_eq!(version, Version::new(1, 2, 5));
    }

    #[tokio::test]
    async fn test_stale_hint_is_ignored() {
        let registry = RegistryClient::with_base_url("http://127.0.0.1:9");
        let constraint = Constraint::parse("^2.0.0").unwrap();

        let mut hints = HashMap::new();
        hints.insert(
            "scope/foo".to_string(),
            vec![LockedPackage {
                name: "scope/foo".to_string(),
                version: Version::new(1, 2, 5),
                dependencies: vec![],
            }],
        );

        // Hint no longer satisfies, so the resolver falls through to the
        // (unreachable) registry and fails with a network error.
        let err = resolve_version(&registry, "scope/foo", &constraint, &hints)
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::Network(_)));
    }
}
