//! Host project layout and access to installed package manifests for detach.
//!
//! This crate provides the on-disk view of a project: `ProjectLayout` for the
//! host root, the tool package root, `node_modules` and dev-server paths, and
//! the `PackageRepository` capability that returns the manifest of an installed
//! package by name (`InstalledPackages` on disk, `FixturePackages` in memory).

pub mod layout;
pub mod repository;

pub use layout::ProjectLayout;
pub use repository::{FixturePackages, InstalledPackages, PackageRepository};

use detach_schema::PackageManifest;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("installed package '{package}' has no readable manifest at {}", path.display())]
    PackageNotFound { package: String, path: PathBuf },
    #[error("installed package '{package}' has an invalid manifest: {source}")]
    InvalidManifest {
        package: String,
        #[source]
        source: detach_schema::ManifestError,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] detach_schema::ManifestError),
}

/// Write `content` to `dest` through a temporary file in the same directory.
pub fn write_atomic(dest: &Path, content: &str) -> Result<(), ProjectError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| ProjectError::Io(e.error))?;
    Ok(())
}

/// Write a manifest atomically, two-space indented with a trailing line ending.
pub fn write_manifest(dest: &Path, manifest: &PackageManifest) -> Result<(), ProjectError> {
    write_atomic(dest, &manifest.to_json_pretty()?)
}
