//! Add dependency command (bread add)

use anyhow::{anyhow, bail, Context, Result};
use bread_package::manifest::{Manifest, Realm, MANIFEST_FILE};
use bread_package::{InstallationContext, PackageError};
use colored::Colorize;

/// Run the add command: insert into the manifest, then install just this
/// package. The manifest edit is rolled back if the install fails.
pub async fn run(spec: &str, realm: &str, name: Option<&str>) -> Result<()> {
    let realm: Realm = realm.parse().map_err(|e: String| anyhow!(e))?;
    let project_dir = std::env::current_dir()?;
    let manifest_path = project_dir.join(MANIFEST_FILE);

    let original = std::fs::read_to_string(&manifest_path)
        .context("bread.toml not found, run `bread init` first")?;
    let mut manifest = Manifest::from_str(&original)?;

    let alias = match name {
        Some(n) => n.to_string(),
        None => default_alias(spec)?,
    };

    let deps = manifest.dependencies_for_mut(realm);
    if deps.contains_key(&alias) {
        return Err(PackageError::DuplicateDependency(alias).into());
    }
    deps.insert(alias.clone(), spec.to_string());

    std::fs::write(&manifest_path, manifest.to_toml_string()?)
        .context("failed to write bread.toml")?;
    println!("Added {alias} to {realm} dependencies");

    let ctx = InstallationContext::new(&project_dir)?;
    match ctx.install_single(&alias, spec, realm).await {
        Ok(version) => {
            println!("{} Installed {spec} ({version})", "✓".green());
            Ok(())
        }
        Err(err) => {
            std::fs::write(&manifest_path, original)
                .context("failed to roll back bread.toml")?;
            Err(anyhow!(err).context("installation failed, manifest change rolled back"))
        }
    }
}

/// Default alias: CamelCased last path segment of the package name, with `-`
/// introducing a word boundary (`scope/react-lua` → `ReactLua`)
fn default_alias(spec: &str) -> Result<String> {
    let name = spec.split_once('@').map(|(n, _)| n).unwrap_or(spec);
    let Some((_, last)) = name.rsplit_once('/') else {
        bail!("invalid package spec '{spec}': expected scope/name");
    };
    if last.is_empty() {
        bail!("invalid package spec '{spec}': empty package name");
    }

    Ok(last
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect())
}
