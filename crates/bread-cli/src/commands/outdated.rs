//! Outdated dependencies report (bread outdated)

use anyhow::{bail, Context, Result};
use bread_package::lockfile::{Lockfile, LOCKFILE_FILE};
use bread_package::manifest::{Manifest, MANIFEST_FILE};
use bread_package::resolver::select_version;
use bread_package::{Constraint, RegistryClient};
use colored::Colorize;

struct OutdatedPackage {
    name: String,
    current: semver::Version,
    latest: semver::Version,
}

/// Run the outdated command: compare each locked version against the latest
/// published version on the registry.
pub async fn run() -> Result<()> {
    let project_dir = std::env::current_dir()?;
    let manifest = Manifest::from_file(&project_dir.join(MANIFEST_FILE))
        .context("bread.toml not found, run `bread init` first")?;

    let lockfile_path = project_dir.join(LOCKFILE_FILE);
    if !lockfile_path.exists() {
        bail!("no bread.lock found. Run `bread install` first");
    }
    let lockfile = Lockfile::from_file(&lockfile_path)?;

    println!("Checking for updates...");
    let registry = RegistryClient::new();
    let mut outdated = Vec::new();

    for pkg in &lockfile.packages {
        // The root project entry has no registry counterpart
        if pkg.name == manifest.package.name {
            continue;
        }

        let published = match registry.list_versions(&pkg.name).await {
            Ok(versions) => versions,
            Err(err) => {
                eprintln!("{} failed to check {}: {err}", "⚠".yellow(), pkg.name);
                continue;
            }
        };

        let Some(latest) = select_version(&published, &Constraint::Any) else {
            continue;
        };
        if latest > pkg.version {
            outdated.push(OutdatedPackage {
                name: pkg.name.clone(),
                current: pkg.version.clone(),
                latest,
            });
        }
    }

    if outdated.is_empty() {
        println!("{} All packages are up to date!", "✓".green());
        return Ok(());
    }

    println!("\nOutdated packages:");
    for pkg in &outdated {
        println!(
            "  {} {} {} → {}",
            "↑".yellow(),
            pkg.name,
            pkg.current.to_string().red(),
            pkg.latest.to_string().green()
        );
    }
    println!(
        "\n{} package{} behind the registry",
        outdated.len(),
        if outdated.len() == 1 { "" } else { "s" }
    );

    Ok(())
}
