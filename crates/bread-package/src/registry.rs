//! Registry client for the Wally v1 protocol
//!
//! Two endpoints: `package-metadata` (version listing, memoized in-process)
//! and `package-contents` (ZIP archives, capped by a download semaphore).

use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::{RwLock, Semaphore};

use crate::{PackageError, Result};

/// API host the published package index resolves to
pub const DEFAULT_REGISTRY_URL: &str = "https://api.wally.run";

/// Maximum number of in-flight archive downloads
pub const DOWNLOAD_CONCURRENCY: usize = 10;

/// Wally protocol compatibility tag sent with archive requests
const WALLY_VERSION: &str = "0.3.2";

#[derive(Debug, Deserialize)]
struct PackageMetadata {
    versions: Vec<MetadataEntry>,
}

#[derive(Debug, Deserialize)]
struct MetadataEntry {
    package: MetadataPackage,
}

#[derive(Debug, Deserialize)]
struct MetadataPackage {
    version: String,
}

/// HTTP client for a package registry
#[derive(Debug)]
pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
    metadata_cache: RwLock<HashMap<String, Vec<String>>>,
    download_slots: Semaphore,
}

impl RegistryClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_REGISTRY_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            metadata_cache: RwLock::new(HashMap::new()),
            download_slots: Semaphore::new(DOWNLOAD_CONCURRENCY),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the published versions of a package, in registry document order.
    ///
    /// Responses are memoized so parallel resolves hit the network at most
    /// once per package.
    pub async fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        if let Some(versions) = self.metadata_cache.read().await.get(name) {
            return Ok(versions.clone());
        }

        let url = format!("{}/v1/package-metadata/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PackageError::Registry {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        let meta: PackageMetadata = serde_json::from_slice(&response.bytes().await?)
            .map_err(|_| PackageError::Decode(name.to_string()))?;
        let versions: Vec<String> = meta.versions.into_iter().map(|v| v.package.version).collect();

        // Double-checked: a concurrent resolve may have filled the entry
        let mut cache = self.metadata_cache.write().await;
        Ok(cache
            .entry(name.to_string())
            .or_insert(versions)
            .clone())
    }

    /// Download the archive for a concrete package version.
    pub async fn fetch_archive(&self, name: &str, version: &semver::Version) -> Result<Bytes> {
        let _slot = self
            .download_slots
            .acquire()
            .await
            .expect("download semaphore closed");

        let url = format!("{}/v1/package-contents/{}/{}", self.base_url, name, version);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "bread/1.0")
            .header("Accept", "application/octet-stream")
            .header("Wally-Version", WALLY_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PackageError::PackageNotFound(format!("{name}@{version}")));
        }
        if !status.is_success() {
            return Err(PackageError::Download {
                name: format!("{name}@{version}"),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_list_versions_in_document_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/package-metadata/scope/foo");
            then.status(200).json_body(serde_json::json!({
                "versions": [
                    { "package": { "version": "1.2.0" } },
                    { "package": { "version": "2.0.0" } },
                    { "package": { "version": "1.3.0" } },
                ]
            }));
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let versions = client.list_versions("scope/foo").await.unwrap();
        assert_eq!(versions, vec!["1.2.0", "2.0.0", "1.3.0"]);
    }

    #[tokio::test]
    async fn test_list_versions_memoized() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/package-metadata/scope/foo");
            then.status(200)
                .json_body(serde_json::json!({ "versions": [] }));
        });

        let client = RegistryClient::with_base_url(server.base_url());
        client.list_versions("scope/foo").await.unwrap();
        client.list_versions("scope/foo").await.unwrap();
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_list_versions_non_200() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/package-metadata/scope/foo");
            then.status(500);
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let err = client.list_versions("scope/foo").await.unwrap_err();
        assert!(matches!(
            err,
            crate::PackageError::Registry { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_list_versions_malformed_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/package-metadata/scope/foo");
            then.status(200).body("not json");
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let err = client.list_versions("scope/foo").await.unwrap_err();
        assert!(matches!(err, crate::PackageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_archive_sends_protocol_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/package-contents/scope/foo/1.2.0")
                .header("User-Agent", "bread/1.0")
                .header("Accept", "application/octet-stream")
                .header("Wally-Version", "0.3.2");
            then.status(200).body(b"zipbytes");
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let bytes = client
            .fetch_archive("scope/foo", &semver::Version::new(1, 2, 0))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"zipbytes");
        mock.assert();
    }

    #[tokio::test]
    async fn test_fetch_archive_404_is_package_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/package-contents/scope/foo/9.9.9");
            then.status(404);
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let err = client
            .fetch_archive("scope/foo", &semver::Version::new(9, 9, 9))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::PackageError::PackageNotFound(id) if id == "scope/foo@9.9.9"));
    }

    #[tokio::test]
    async fn test_fetch_archive_other_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/package-contents/scope/foo/1.0.0");
            then.status(503);
        });

        let client = RegistryClient::with_base_url(server.base_url());
        let err = client
            .fetch_archive("scope/foo", &semver::Version::new(1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::PackageError::Download { status: 503, .. }
        ));
    }
}
