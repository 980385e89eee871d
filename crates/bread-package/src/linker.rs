//! Link-file (stub) generation
//!
//! Every dependency gets a small generated module that forwards `require` to
//! the indexed package and republishes its exported type aliases so consumer
//! code keeps full type information across the indirection.

use std::fs;
use std::path::Path;

use crate::manifest::{short_name, Realm};
use crate::store::{package_dir_name, PackageStore, INDEX_DIR};
use crate::types::{strip_generic_defaults, ExportedType, TypeExtractor};
use crate::Result;

/// Require expression targeting an indexed package
pub fn require_path(name: &str, version: &semver::Version) -> String {
    format!(
        "require(script.Parent.{INDEX_DIR}[\"{}\"][\"{}\"])",
        package_dir_name(name, version),
        short_name(name)
    )
}

/// Render the stub module for a package, re-exporting `types`
pub fn stub_contents(name: &str, version: &semver::Version, types: &[ExportedType]) -> String {
    let id = package_dir_name(name, version);
    let require = require_path(name, version);

    if types.is_empty() {
        return format!("--Bread\n--{id}\nreturn {require}\n");
    }

    let mut lines = vec![
        "--Bread".to_string(),
        format!("--{id}"),
        format!("local _Package = {require}"),
    ];
    for t in types {
        lines.push(format!(
            "export type {}{} = _Package.{}{}",
            t.name,
            t.generics,
            t.name,
            strip_generic_defaults(&t.generics)
        ));
    }
    lines.push("return _Package".to_string());

    lines.join("\n") + "\n"
}

/// Stub for an installed package, with types scanned from its entry file
fn stub_for_installed(store: &PackageStore, realm: Realm, name: &str, version: &semver::Version) -> String {
    let package_dir = store.package_dir(realm, name, version);
    let types = TypeExtractor::new().extract_from_package(&package_dir, short_name(name));
    stub_contents(name, version, &types)
}

/// Write a root stub at `D(realm)/<short-name>.lua`
pub fn write_root_stub(
    store: &PackageStore,
    realm: Realm,
    name: &str,
    version: &semver::Version,
) -> Result<()> {
    let link_path = store
        .realm_dir(realm)
        .join(format!("{}.lua", short_name(name)));
    fs::write(link_path, stub_for_installed(store, realm, name, version))?;
    Ok(())
}

/// Write a nested stub at `D(realm)/_Index/<parent-id>/<dep-short-name>.lua`
/// so modules inside the parent package can resolve their own dependency.
pub fn write_nested_stub(
    store: &PackageStore,
    realm: Realm,
    parent_root: &Path,
    dep_name: &str,
    dep_version: &semver::Version,
) -> Result<()> {
    let link_path = parent_root.join(format!("{}.lua", short_name(dep_name)));
    fs::write(
        link_path,
        stub_for_installed(store, realm, dep_name, dep_version),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> semver::Version {
        semver::Version::parse(s).unwrap()
    }

    #[test]
    fn test_require_path_format() {
        assert_eq!(
            require_path("scope/foo", &v("1.3.0")),
            "require(script.Parent._Index[\"scope_foo@1.3.0\"][\"foo\"])"
        );
    }

    #[test]
    fn test_stub_without_types() {
        let stub = stub_contents("scope/foo", &v("1.3.0"), &[]);
        assert_eq!(
            stub,
            "--Bread\n--scope_foo@1.3.0\nreturn require(script.Parent._Index[\"scope_foo@1.3.0\"][\"foo\"])\n"
        );
    }

    #[test]
    fn test_stub_with_types() {
        let types = vec![
            ExportedType {
                name: "Config".to_string(),
                generics: String::new(),
            },
            ExportedType {
                name: "Result".to_string(),
                generics: "<T, E = string>".to_string(),
            },
        ];

        let stub = stub_contents("scope/foo", &v("1.0.0"), &types);
        let expected = "--Bread\n\
                        --scope_foo@1.0.0\n\
                        local _Package = require(script.Parent._Index[\"scope_foo@1.0.0\"][\"foo\"])\n\
                        export type Config = _Package.Config\n\
                        export type Result<T, E = string> = _Package.Result<T, E>\n\
                        return _Package\n";
        assert_eq!(stub, expected);
    }

    #[test]
    fn test_root_stub_scans_package_types() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = PackageStore::new(
            temp.path().join("Packages"),
            temp.path().join("ServerPackages"),
            temp.path().join("DevPackages"),
        );
        let version = v("0.1.0");

        let package_dir = store.package_dir(Realm::Shared, "scope/foo", &version);
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(
            package_dir.join("init.luau"),
            "export type Result<T, E = string> = { ok: boolean }\n",
        )
        .unwrap();
        std::fs::create_dir_all(store.realm_dir(Realm::Shared)).unwrap();

        write_root_stub(&store, Realm::Shared, "scope/foo", &version).unwrap();

        let stub =
            std::fs::read_to_string(store.realm_dir(Realm::Shared).join("foo.lua")).unwrap();
        assert!(stub.contains("local _Package = require(script.Parent._Index[\"scope_foo@0.1.0\"][\"foo\"])"));
        assert!(stub.contains("export type Result<T, E = string> = _Package.Result<T, E>"));
        assert!(stub.ends_with("return _Package\n"));
    }
}
