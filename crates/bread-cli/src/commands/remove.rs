//! Remove dependency command (bread remove)

use anyhow::{bail, Context, Result};
use bread_package::manifest::{Manifest, Realm, MANIFEST_FILE};
use bread_package::InstallationContext;
use colored::Colorize;
use std::sync::Arc;

/// Run the remove command: drop the alias from every realm where it appears,
/// then clean and reinstall so the on-disk index matches the manifest again.
pub async fn run(alias: &str) -> Result<()> {
    let project_dir = std::env::current_dir()?;
    let manifest_path = project_dir.join(MANIFEST_FILE);

    let mut manifest = Manifest::from_file(&manifest_path)
        .context("bread.toml not found, run `bread init` first")?;

    let mut found = false;
    for realm in Realm::ALL {
        if manifest.dependencies_for_mut(realm).remove(alias).is_some() {
            println!("{} Removed {alias} from {realm} dependencies", "✓".green());
            found = true;
        }
    }
    if !found {
        bail!("package {alias} not found in dependencies");
    }

    std::fs::write(&manifest_path, manifest.to_toml_string()?)
        .context("failed to write bread.toml")?;

    println!("Reinstalling packages...");
    let ctx = Arc::new(InstallationContext::new(&project_dir)?);
    ctx.clean()?;
    super::install::install_with_progress(ctx).await
}
