//! Bread package installation engine
//!
//! Resolves, downloads and links Wally-compatible packages declared in a
//! `bread.toml` manifest, producing a content-addressed `_Index` layout per
//! realm plus a reproducible `bread.lock`.

pub mod constraint;
pub mod installer;
pub mod linker;
pub mod lockfile;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod types;

pub use constraint::Constraint;
pub use installer::{InstallEvent, InstallationContext};
pub use lockfile::{LockedPackage, Lockfile};
pub use manifest::{Manifest, PackageMetadata, Realm};
pub use registry::RegistryClient;
pub use store::PackageStore;
pub use types::{ExportedType, TypeExtractor};

/// Package management errors
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("bread.toml not found, run `bread init` first")]
    ManifestMissing,

    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),

    #[error("failed to serialize manifest: {0}")]
    ManifestSerialize(#[from] toml::ser::Error),

    #[error("invalid project name '{0}': expected the form user/project")]
    InvalidProjectName(String),

    #[error("invalid package spec '{0}'")]
    InvalidPackageSpec(String),

    #[error("invalid version constraint '{0}'")]
    InvalidConstraint(String),

    #[error("no version of {name} satisfies '{constraint}'")]
    UnsatisfiableConstraint { name: String, constraint: String },

    #[error("package {0} not found on the registry")]
    PackageNotFound(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("registry returned HTTP {status} for {name}")]
    Registry { name: String, status: u16 },

    #[error("malformed registry response for {0}")]
    Decode(String),

    #[error("failed to download {name}: HTTP {status}")]
    Download { name: String, status: u16 },

    #[error("bad package archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive entry escapes its package directory: {0}")]
    PathTraversalDenied(String),

    #[error("io error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("package {0} already present in manifest")]
    DuplicateDependency(String),
}

pub type Result<T> = std::result::Result<T, PackageError>;
