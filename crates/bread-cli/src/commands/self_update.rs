//! Self-update command (bread self-update)

use anyhow::{bail, Context, Result};
use colored::Colorize;
use semver::Version;
use serde::Deserialize;
use std::io::Write;
use std::time::Duration;

use crate::config::{APP_VERSION, REPO_NAME, REPO_OWNER};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

/// Run the self-update command: probe GitHub releases and replace the
/// running binary when a newer version is published.
pub async fn run() -> Result<()> {
    println!("Checking for updates...");

    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
    let url =
        format!("https://api.github.com/repos/{REPO_OWNER}/{REPO_NAME}/releases/latest");
    let release: Release = client
        .get(&url)
        .header("User-Agent", "bread/1.0")
        .send()
        .await
        .context("failed to reach GitHub")?
        .error_for_status()
        .context("release lookup failed")?
        .json()
        .await
        .context("malformed release metadata")?;

    let current = Version::parse(APP_VERSION).context("invalid embedded version")?;
    let latest = Version::parse(release.tag_name.trim_start_matches('v'))
        .with_context(|| format!("invalid release tag '{}'", release.tag_name))?;

    if latest <= current {
        println!("{} bread is already up to date (v{current})", "✓".green());
        return Ok(());
    }

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let Some(asset) = release
        .assets
        .iter()
        .find(|a| a.name.contains(os) && a.name.contains(arch))
    else {
        bail!(
            "no release asset for {os}-{arch}; download v{latest} manually from {}",
            release.html_url
        );
    };

    println!("Downloading v{latest}...");
    // The binary download itself relies on transport defaults, not the probe
    // timeout
    let bytes = reqwest::Client::new()
        .get(&asset.browser_download_url)
        .header("User-Agent", "bread/1.0")
        .send()
        .await?
        .error_for_status()
        .context("asset download failed")?
        .bytes()
        .await?;

    replace_current_exe(&bytes)?;

    println!(
        "{} Successfully updated to version v{latest}",
        "✓".green()
    );
    println!("Release notes: {}", release.html_url.cyan());
    Ok(())
}

/// Write the downloaded binary next to the current executable and swap it in
fn replace_current_exe(bytes: &[u8]) -> Result<()> {
    let exe = std::env::current_exe().context("cannot locate current executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .context("cannot stage update next to the executable")?;
    staged.write_all(bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))?;
    }

    staged
        .persist(&exe)
        .context("failed to replace the executable")?;
    Ok(())
}
