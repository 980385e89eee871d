//! Install orchestration
//!
//! Seeds the dependency walk from the manifest's three realms, drives
//! concurrent resolution and download, deduplicates by
//! `(realm, fullname, version)`, writes link files and finally the lockfile.

use futures::future::{self, BoxFuture};
use semver::Version;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::constraint::Constraint;
use crate::linker;
use crate::lockfile::{LockedPackage, Lockfile, LOCKFILE_FILE};
use crate::manifest::{Manifest, ParsedSpec, Realm, MANIFEST_FILE};
use crate::registry::RegistryClient;
use crate::resolver;
use crate::store::PackageStore;
use crate::{PackageError, Result};

/// Registry tag written into the lockfile
const LOCKFILE_REGISTRY: &str = "test";

/// Progress notifications emitted while the walk runs.
///
/// The engine works without a subscriber; a UI that wants a progress display
/// is a pure consumer of this stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// A package version finished downloading and unpacking
    PackageInstalled { name: String, version: Version },
    /// A dependency used the bare `scope/name` spec form; prefer an explicit
    /// `scope/name@constraint`
    BareNameSpec { alias: String, spec: String },
}

/// Dependency manifest of an installed package. Absence of the file means an
/// empty dependency set; everything but the dependency map is ignored.
#[derive(Debug, Default, Deserialize)]
struct InstalledManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// One install invocation: manifest, lockfile hints and shared walk state
#[derive(Debug)]
pub struct InstallationContext {
    manifest: Manifest,
    project_path: PathBuf,
    store: PackageStore,
    registry: RegistryClient,
    lockfile_hints: HashMap<String, Vec<LockedPackage>>,
    /// Visited `(realm, fullname, version)` triples. Insert-returns-false is
    /// the compare-and-swap that lets exactly one walker win a package.
    visited: Mutex<HashSet<(Realm, String, Version)>>,
    /// `fullname@version` → locked entry, single writer per key (the winner)
    packages: Mutex<HashMap<String, LockedPackage>>,
    events: Mutex<Option<UnboundedSender<InstallEvent>>>,
}

impl InstallationContext {
    /// Read `bread.toml` (and `bread.lock` when present) from a project
    /// directory.
    pub fn new(project_path: impl AsRef<Path>) -> Result<Self> {
        let project_path = project_path.as_ref().to_path_buf();
        let manifest = Manifest::from_file(&project_path.join(MANIFEST_FILE))?;

        let lockfile_path = project_path.join(LOCKFILE_FILE);
        let lockfile_hints = if lockfile_path.exists() {
            Lockfile::from_file(&lockfile_path)?.hint_map()
        } else {
            HashMap::new()
        };

        let store = PackageStore::new(
            manifest.realm_dir(&project_path, Realm::Shared),
            manifest.realm_dir(&project_path, Realm::Server),
            manifest.realm_dir(&project_path, Realm::Dev),
        );

        Ok(Self {
            manifest,
            project_path,
            store,
            registry: RegistryClient::new(),
            lockfile_hints,
            visited: Mutex::new(HashSet::new()),
            packages: Mutex::new(HashMap::new()),
            events: Mutex::new(None),
        })
    }

    /// Point the engine at a different registry API host
    pub fn with_registry_url(mut self, base_url: impl Into<String>) -> Self {
        self.registry = RegistryClient::with_base_url(base_url);
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    /// Total number of root dependencies across the three realms
    pub fn root_dependency_count(&self) -> usize {
        Realm::ALL
            .iter()
            .map(|realm| self.manifest.dependencies_for(*realm).len())
            .sum()
    }

    /// Attach a progress listener. Events emitted before this call are lost.
    pub fn subscribe(&self) -> UnboundedReceiver<InstallEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().expect("event sender poisoned") = Some(tx);
        rx
    }

    fn emit(&self, event: InstallEvent) {
        if let Some(tx) = self.events.lock().expect("event sender poisoned").as_ref() {
            // A dropped receiver just means nobody is rendering progress
            let _ = tx.send(event);
        }
    }

    /// Install every dependency of the manifest, write link files and the
    /// lockfile.
    pub async fn install_all(&self) -> Result<()> {
        let mut work: Vec<(Realm, String, String)> = Vec::new();
        for realm in Realm::ALL {
            let deps = self.manifest.dependencies_for(realm);
            if deps.is_empty() {
                continue;
            }
            fs::create_dir_all(self.store.index_dir(realm))?;
            for (alias, spec) in deps {
                work.push((realm, alias.clone(), spec.clone()));
            }
        }

        if work.is_empty() {
            return self.write_lockfile();
        }

        let roots = work.iter().map(|(realm, alias, spec)| async {
            let version = self.install(alias.clone(), spec.clone(), *realm).await?;
            Ok::<_, PackageError>((*realm, alias.clone(), spec.clone(), version))
        });
        let resolved_roots = future::try_join_all(roots).await?;

        for (realm, alias, spec, version) in &resolved_roots {
            let parsed = ParsedSpec::parse(alias, spec)?;
            linker::write_root_stub(&self.store, *realm, &parsed.name, version)?;
        }

        self.write_lockfile()
    }

    /// Install one package and write its root stub, without walking its
    /// transitive dependencies. Used by `bread add`.
    pub async fn install_single(&self, alias: &str, spec: &str, realm: Realm) -> Result<Version> {
        fs::create_dir_all(self.store.index_dir(realm))?;

        let parsed = ParsedSpec::parse(alias, spec)?;
        if parsed.bare_name {
            self.emit(InstallEvent::BareNameSpec {
                alias: alias.to_string(),
                spec: spec.to_string(),
            });
        }
        let constraint = Constraint::parse(&parsed.constraint)?;
        let version =
            resolver::resolve_version(&self.registry, &parsed.name, &constraint, &HashMap::new())
                .await?;

        self.store
            .fetch_and_unpack(&self.registry, &parsed.name, &version, realm)
            .await?;
        linker::write_root_stub(&self.store, realm, &parsed.name, &version)?;

        self.emit(InstallEvent::PackageInstalled {
            name: parsed.name,
            version: version.clone(),
        });
        Ok(version)
    }

    /// Wipe the three realm output directories
    pub fn clean(&self) -> Result<()> {
        self.store.clean()
    }

    /// The recursive walk. Returns the resolved version whether this call won
    /// the visited race or lost it.
    fn install(&self, alias: String, spec: String, realm: Realm) -> BoxFuture<'_, Result<Version>> {
        Box::pin(async move {
            let parsed = ParsedSpec::parse(&alias, &spec)?;
            if parsed.bare_name {
                self.emit(InstallEvent::BareNameSpec {
                    alias: alias.clone(),
                    spec: spec.clone(),
                });
            }
            let constraint = Constraint::parse(&parsed.constraint)?;
            let version = resolver::resolve_version(
                &self.registry,
                &parsed.name,
                &constraint,
                &self.lockfile_hints,
            )
            .await?;

            {
                let mut visited = self.visited.lock().expect("visited set poisoned");
                if !visited.insert((realm, parsed.name.clone(), version.clone())) {
                    return Ok(version);
                }
            }

            self.store
                .fetch_and_unpack(&self.registry, &parsed.name, &version, realm)
                .await?;
            self.emit(InstallEvent::PackageInstalled {
                name: parsed.name.clone(),
                version: version.clone(),
            });

            let deps = self.read_package_dependencies(&parsed.name, &version, realm)?;

            self.packages
                .lock()
                .expect("packages map poisoned")
                .insert(
                    format!("{}@{}", parsed.name, version),
                    LockedPackage {
                        name: parsed.name.clone(),
                        version: version.clone(),
                        dependencies: deps
                            .iter()
                            .map(|(a, s)| (a.clone(), s.clone()))
                            .collect(),
                    },
                );

            let children = deps.iter().map(|(dep_alias, dep_spec)| {
                let dep_alias = dep_alias.clone();
                let dep_spec = dep_spec.clone();
                async move {
                    let dep_version = self.install(dep_alias.clone(), dep_spec.clone(), realm).await?;
                    Ok::<_, PackageError>((dep_alias, dep_spec, dep_version))
                }
            });
            let resolved = future::try_join_all(children).await?;

            let parent_root = self.store.package_root(realm, &parsed.name, &version);
            for (dep_alias, dep_spec, dep_version) in &resolved {
                let dep = ParsedSpec::parse(dep_alias, dep_spec)?;
                linker::write_nested_stub(&self.store, realm, &parent_root, &dep.name, dep_version)?;
            }

            Ok(version)
        })
    }

    /// Dependency map of an installed package, `wally.toml` preferred over
    /// `bread.toml`. No manifest at all means no dependencies.
    fn read_package_dependencies(
        &self,
        name: &str,
        version: &Version,
        realm: Realm,
    ) -> Result<BTreeMap<String, String>> {
        let package_dir = self.store.package_dir(realm, name, version);

        for file_name in ["wally.toml", "bread.toml"] {
            let path = package_dir.join(file_name);
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                let manifest: InstalledManifest = toml::from_str(&content)?;
                return Ok(manifest.dependencies);
            }
        }

        Ok(BTreeMap::new())
    }

    /// Collect locked packages, append the synthesized root entry and write
    /// `bread.lock` sorted by name.
    fn write_lockfile(&self) -> Result<()> {
        let mut packages: Vec<LockedPackage> = self
            .packages
            .lock()
            .expect("packages map poisoned")
            .values()
            .cloned()
            .collect();
        packages.push(self.root_locked_package());
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        let lockfile = Lockfile {
            registry: LOCKFILE_REGISTRY.to_string(),
            packages,
        };
        lockfile.write_to_file(&self.project_path.join(LOCKFILE_FILE))
    }

    /// Root entry: the project itself, deps = merge of all three realm maps
    fn root_locked_package(&self) -> LockedPackage {
        let mut deps: Vec<(String, String)> = Vec::new();
        for realm in Realm::ALL {
            for (alias, spec) in self.manifest.dependencies_for(realm) {
                deps.push((alias.clone(), spec.clone()));
            }
        }
        deps.sort_by(|a, b| a.0.cmp(&b.0));

        LockedPackage {
            name: self.manifest.package.name.clone(),
            version: self.manifest.package.version.clone(),
            dependencies: deps,
        }
    }
}
