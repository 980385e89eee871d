//! Passive update notice
//!
//! Consults `~/.bread/update_cache.json` (24 h TTL) and prints a banner when
//! a newer release exists. Never fails a command: every error path degrades
//! to silence.

use chrono::{DateTime, Utc};
use colored::Colorize;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{APP_VERSION, REPO_NAME, REPO_OWNER};

const CHECK_INTERVAL_HOURS: i64 = 24;
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
struct CacheData {
    last_check: DateTime<Utc>,
    latest_version: String,
    changelog_url: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    html_url: String,
}

pub struct UpdateChecker {
    cache_file: Option<PathBuf>,
}

impl UpdateChecker {
    pub fn new() -> Self {
        if std::env::var_os("BREAD_NO_UPDATE_CHECK").is_some() {
            return Self { cache_file: None };
        }

        let cache_file = dirs::home_dir().map(|home| {
            let cache_dir = home.join(".bread");
            let _ = std::fs::create_dir_all(&cache_dir);
            cache_dir.join("update_cache.json")
        });

        Self { cache_file }
    }

    pub async fn check_for_updates(&self) {
        let Some(cache_file) = &self.cache_file else {
            return;
        };

        if let Some(cache) = self.load_cache() {
            if Utc::now() - cache.last_check < chrono::Duration::hours(CHECK_INTERVAL_HOURS) {
                display_if_newer(&cache.latest_version, &cache.changelog_url);
                return;
            }
        }

        let Some((latest_version, changelog_url)) = fetch_latest_release().await else {
            return;
        };

        let cache = CacheData {
            last_check: Utc::now(),
            latest_version: latest_version.clone(),
            changelog_url: changelog_url.clone(),
        };
        if let Ok(data) = serde_json::to_vec(&cache) {
            let _ = std::fs::write(cache_file, data);
        }

        display_if_newer(&latest_version, &changelog_url);
    }

    fn load_cache(&self) -> Option<CacheData> {
        let data = std::fs::read(self.cache_file.as_ref()?).ok()?;
        serde_json::from_slice(&data).ok()
    }
}

async fn fetch_latest_release() -> Option<(String, String)> {
    let client = reqwest::Client::builder()
        .timeout(PROBE_TIMEOUT)
        .build()
        .ok()?;

    let url =
        format!("https://api.github.com/repos/{REPO_OWNER}/{REPO_NAME}/releases/latest");
    let release: Release = client
        .get(&url)
        .header("User-Agent", "bread/1.0")
        .send()
        .await
        .ok()?
        .json()
        .await
        .ok()?;

    let version = release.tag_name.trim_start_matches('v').to_string();
    Some((version, release.html_url))
}

fn display_if_newer(latest: &str, changelog_url: &str) {
    let (Ok(current), Ok(latest_version)) = (Version::parse(APP_VERSION), Version::parse(latest))
    else {
        return;
    };

    if latest_version > current {
        let linebar = "┃  ".yellow();
        println!(
            "{linebar}{} {} → {}",
            "update available!".yellow(),
            APP_VERSION.red(),
            latest.green()
        );
        println!("{linebar}go to {} to download", changelog_url.cyan());
        println!();
    }
}
