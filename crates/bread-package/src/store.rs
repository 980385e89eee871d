//! Content-addressed on-disk package index
//!
//! Each realm directory holds an `_Index/` of unpacked archives keyed by
//! `<scope>_<name>@<version>`, with the archive contents under the package's
//! short name. Extraction never writes outside the versioned folder.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::manifest::{short_name, Realm};
use crate::registry::RegistryClient;
use crate::{PackageError, Result};

/// Name of the index directory inside each realm
pub const INDEX_DIR: &str = "_Index";

/// Versioned folder name: `scope/name` + version → `scope_name@version`
pub fn package_dir_name(name: &str, version: &semver::Version) -> String {
    format!("{}@{version}", name.replacen('/', "_", 1))
}

/// Owns the three realm output directories and the archives unpacked into them
#[derive(Debug, Clone)]
pub struct PackageStore {
    shared_dir: PathBuf,
    server_dir: PathBuf,
    dev_dir: PathBuf,
}

impl PackageStore {
    pub fn new(shared_dir: PathBuf, server_dir: PathBuf, dev_dir: PathBuf) -> Self {
        Self {
            shared_dir,
            server_dir,
            dev_dir,
        }
    }

    /// Realm output directory
    pub fn realm_dir(&self, realm: Realm) -> &Path {
        match realm {
            Realm::Shared => &self.shared_dir,
            Realm::Server => &self.server_dir,
            Realm::Dev => &self.dev_dir,
        }
    }

    /// `_Index` directory of a realm
    pub fn index_dir(&self, realm: Realm) -> PathBuf {
        self.realm_dir(realm).join(INDEX_DIR)
    }

    /// Versioned folder: `D(realm)/_Index/<scope>_<name>@<version>`
    pub fn package_root(&self, realm: Realm, name: &str, version: &semver::Version) -> PathBuf {
        self.index_dir(realm).join(package_dir_name(name, version))
    }

    /// Unpacked contents: `D(realm)/_Index/<scope>_<name>@<version>/<name>`
    pub fn package_dir(&self, realm: Realm, name: &str, version: &semver::Version) -> PathBuf {
        self.package_root(realm, name, version).join(short_name(name))
    }

    /// Download and unpack a package version into the realm's index.
    ///
    /// Already-extracted packages are returned without network I/O, which is
    /// what makes the index safe to reuse across runs and across the walk's
    /// racing siblings.
    pub async fn fetch_and_unpack(
        &self,
        registry: &RegistryClient,
        name: &str,
        version: &semver::Version,
        realm: Realm,
    ) -> Result<PathBuf> {
        let package_dir = self.package_dir(realm, name, version);
        if package_dir.exists() {
            return Ok(package_dir);
        }

        let bytes = registry.fetch_archive(name, version).await?;

        let target = package_dir.clone();
        tokio::task::spawn_blocking(move || unpack_archive(&bytes, &target))
            .await
            .map_err(|e| PackageError::Filesystem(io::Error::other(e)))??;

        Ok(package_dir)
    }

    /// Remove all three realm directories. Missing directories are fine.
    pub fn clean(&self) -> Result<()> {
        for dir in [&self.shared_dir, &self.server_dir, &self.dev_dir] {
            match fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Spool the archive to a temp file and extract it under `package_dir`
fn unpack_archive(bytes: &[u8], package_dir: &Path) -> Result<()> {
    let mut spool = tempfile::tempfile()?;
    spool.write_all(bytes)?;

    let mut archive = zip::ZipArchive::new(spool)?;
    fs::create_dir_all(package_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let target = safe_entry_path(package_dir, entry.name())?;

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(0o644))?;
        }
    }

    Ok(())
}

/// Resolve an archive-internal name under `package_dir`, rejecting entries
/// whose normalized path would land outside it (Zip Slip).
fn safe_entry_path(package_dir: &Path, entry_name: &str) -> Result<PathBuf> {
    let denied = || PackageError::PathTraversalDenied(entry_name.to_string());

    let candidate = package_dir.join(entry_name);
    let mut components = Vec::new();
    for component in candidate.components() {
        match component {
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(denied());
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }

    let resolved: PathBuf = components.iter().collect();
    if !resolved.starts_with(package_dir) {
        return Err(denied());
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(root: &Path) -> PackageStore {
        PackageStore::new(
            root.join("Packages"),
            root.join("ServerPackages"),
            root.join("DevPackages"),
        )
    }

    #[test]
    fn test_package_dir_name() {
        assert_eq!(
            package_dir_name("scope/foo", &semver::Version::new(1, 2, 3)),
            "scope_foo@1.2.3"
        );
    }

    #[test]
    fn test_index_layout_paths() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path());
        let version = semver::Version::new(1, 0, 0);

        assert_eq!(
            store.package_dir(Realm::Shared, "scope/foo", &version),
            temp.path().join("Packages/_Index/scope_foo@1.0.0/foo")
        );
        assert_eq!(
            store.package_root(Realm::Dev, "scope/foo", &version),
            temp.path().join("DevPackages/_Index/scope_foo@1.0.0")
        );
    }

    #[test]
    fn test_safe_entry_path_accepts_nested() {
        let base = Path::new("/pkg/_Index/scope_foo@1.0.0/foo");
        let path = safe_entry_path(base, "src/init.lua").unwrap();
        assert_eq!(path, base.join("src/init.lua"));
    }

    #[test]
    fn test_safe_entry_path_rejects_traversal() {
        let base = Path::new("/pkg/_Index/scope_foo@1.0.0/foo");
        assert!(matches!(
            safe_entry_path(base, "../../pwned"),
            Err(PackageError::PathTraversalDenied(_))
        ));
        assert!(matches!(
            safe_entry_path(base, "a/../../../../etc/passwd"),
            Err(PackageError::PathTraversalDenied(_))
        ));
    }

    #[test]
    fn test_safe_entry_path_tolerates_curdir() {
        let base = Path::new("/pkg/foo");
        let path = safe_entry_path(base, "./init.lua").unwrap();
        assert_eq!(path, base.join("init.lua"));
    }

    #[test]
    fn test_unpack_archive_writes_files() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("foo");

        let bytes = make_test_zip(&[("init.lua", "return {}"), ("src/util.lua", "-- util")]);
        unpack_archive(&bytes, &target).unwrap();

        assert_eq!(
            std::fs::read_to_string(target.join("init.lua")).unwrap(),
            "return {}"
        );
        assert!(target.join("src/util.lua").exists());
    }

    #[test]
    fn test_unpack_archive_rejects_escaping_entry() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("inner").join("foo");
        std::fs::create_dir_all(&target).unwrap();

        let bytes = make_test_zip(&[("../../pwned", "owned")]);
        let err = unpack_archive(&bytes, &target).unwrap_err();
        assert!(matches!(err, PackageError::PathTraversalDenied(_)));
        assert!(!temp.path().join("pwned").exists());
    }

    #[test]
    fn test_clean_removes_realm_dirs() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path());
        std::fs::create_dir_all(temp.path().join("Packages/_Index")).unwrap();
        std::fs::create_dir_all(temp.path().join("DevPackages")).unwrap();

        store.clean().unwrap();
        assert!(!temp.path().join("Packages").exists());
        assert!(!temp.path().join("DevPackages").exists());

        // Second clean with nothing present still succeeds
        store.clean().unwrap();
    }

    fn make_test_zip(files: &[(&str, &str)]) -> Vec<u8> {
        use std::io::Cursor;
        use zip::write::FileOptions;

        let cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(cursor);
        for (name, contents) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        let cursor = writer.finish().unwrap();
        cursor.into_inner()
    }
}
