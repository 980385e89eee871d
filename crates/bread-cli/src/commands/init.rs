//! Project initialization command (bread init)

use anyhow::{bail, Context, Result};
use bread_package::manifest::{
    validate_package_name, BreadDirs, Manifest, PackageMetadata, MANIFEST_FILE,
};
use colored::Colorize;
use std::collections::BTreeMap;

/// Default registry index for new projects
const DEFAULT_REGISTRY: &str = "https://github.com/UpliftGames/wally-index";

/// Run the init command
pub fn run(name: &str) -> Result<()> {
    validate_package_name(name)
        .with_context(|| format!("project name must be in the format 'user/project', got '{name}'"))?;

    let manifest_path = std::path::Path::new(MANIFEST_FILE);
    if manifest_path.exists() {
        bail!("bread.toml already exists!");
    }

    let manifest = default_manifest(name);
    std::fs::write(manifest_path, manifest.to_toml_string()?)
        .context("failed to write bread.toml")?;

    println!("{} Initialized bread.toml for {}", "✓".green(), name);
    Ok(())
}

fn default_manifest(name: &str) -> Manifest {
    Manifest {
        package: PackageMetadata {
            name: name.to_string(),
            version: semver::Version::new(0, 1, 0),
            registry: DEFAULT_REGISTRY.to_string(),
            realm: "shared".to_string(),
            description: None,
            authors: Vec::new(),
            license: None,
            homepage: None,
            repository: None,
            exclude: Vec::new(),
            private: false,
        },
        bread: BreadDirs {
            shared_dir: Some("Packages".to_string()),
            server_dir: Some("ServerPackages".to_string()),
            dev_dir: Some("DevPackages".to_string()),
        },
        dependencies: BTreeMap::new(),
        server_dependencies: BTreeMap::new(),
        dev_dependencies: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest_round_trips() {
        let manifest = default_manifest("user/test");
        let toml = manifest.to_toml_string().unwrap();

        assert!(toml.contains("name = \"user/test\""));
        assert!(toml.contains("version = \"0.1.0\""));
        assert!(toml.contains("shared_dir = \"Packages\""));

        let parsed = Manifest::from_str(&toml).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_name_requires_slash() {
        assert!(validate_package_name("noslash").is_err());
        assert!(validate_package_name("user/proj").is_ok());
    }
}
