use crate::layout::{package_dir, ProjectLayout};
use crate::ProjectError;
use detach_schema::{parse_manifest_str, ManifestError, PackageManifest, PackageName, MANIFEST_FILE};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Looks up the manifest of an installed package by name.
pub trait PackageRepository {
    fn manifest(&self, package: &str) -> Result<PackageManifest, ProjectError>;
}

/// Reads manifests from a project's `node_modules` directory.
#[derive(Debug, Clone)]
pub struct InstalledPackages {
    node_modules: PathBuf,
}

impl InstalledPackages {
    pub fn new(layout: &ProjectLayout) -> Self {
        Self {
            node_modules: layout.node_modules_dir(),
        }
    }

    pub fn manifest_path(&self, package: &str) -> PathBuf {
        package_dir(&self.node_modules, &PackageName::new(package)).join(MANIFEST_FILE)
    }
}

impl PackageRepository for InstalledPackages {
    fn manifest(&self, package: &str) -> Result<PackageManifest, ProjectError> {
        let path = self.manifest_path(package);
        debug!("reading installed manifest {}", path.display());
        let content = fs::read_to_string(&path).map_err(|_| ProjectError::PackageNotFound {
            package: package.to_owned(),
            path: path.clone(),
        })?;
        parse_manifest_str(&content).map_err(|source| ProjectError::InvalidManifest {
            package: package.to_owned(),
            source,
        })
    }
}

/// In-memory manifests keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct FixturePackages {
    packages: HashMap<String, PackageManifest>,
}

impl FixturePackages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: &str, manifest: PackageManifest) {
        self.packages.insert(package.to_owned(), manifest);
    }

    /// Add a package from manifest JSON text.
    pub fn with_json(mut self, package: &str, json: &str) -> Result<Self, ManifestError> {
        let manifest = parse_manifest_str(json)?;
        self.insert(package, manifest);
        Ok(self)
    }
}

impl PackageRepository for FixturePackages {
    fn manifest(&self, package: &str) -> Result<PackageManifest, ProjectError> {
        self.packages
            .get(package)
            .cloned()
            .ok_or_else(|| ProjectError::PackageNotFound {
                package: package.to_owned(),
                path: PathBuf::from(package).join(MANIFEST_FILE),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_packages_reads_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules").join("@babel").join("core");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join(MANIFEST_FILE),
            r#"{"name": "@babel/core", "version": "7.0.0"}"#,
        )
        .unwrap();

        let layout = ProjectLayout::new(dir.path(), &PackageName::new("toolpkg"));
        let repo = InstalledPackages::new(&layout);
        let manifest = repo.manifest("@babel/core").unwrap();
        assert_eq!(manifest.get("version").and_then(|v| v.as_str()), Some("7.0.0"));
    }

    #[test]
    fn installed_packages_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path(), &PackageName::new("toolpkg"));
        let repo = InstalledPackages::new(&layout);
        assert!(matches!(
            repo.manifest("babel-jest"),
            Err(ProjectError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn installed_packages_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules").join("broken");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join(MANIFEST_FILE), "{ not json").unwrap();

        let layout = ProjectLayout::new(dir.path(), &PackageName::new("toolpkg"));
        let err = InstalledPackages::new(&layout).manifest("broken").unwrap_err();
        assert!(matches!(err, ProjectError::InvalidManifest { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn fixture_packages_lookup() {
        let repo = FixturePackages::new()
            .with_json("babel-jest", r#"{"dependencies": {"babel-core": "6.0.0"}}"#)
            .unwrap();
        assert!(repo.manifest("babel-jest").is_ok());
        assert!(repo.manifest("other").is_err());
    }
}
