//! Local package store.
//!
//! Layout:
//!
//! ```text
//! <store>/<name>/<version>/<package-id>/include/...
//! <store>/<name>/<version>/<package-id>/lib/...
//! <store>/<name>/<version>/<package-id>.toml
//! ```
//!
//! The package id is derived from the recipe's content, so rebuilding an
//! unchanged recipe lands in the same root. The store doubles as a
//! dependency resolver: a committed package satisfies any later recipe
//! that requires the same name and version.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::Dependency;
use crate::Recipe;
use crate::executor::{DependencyResolver, ExecuteError, PackageInfo, ResolvedDependency};

/// Manifest written next to each committed package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub package_id: String,
    pub name: String,
    pub version: String,
    pub libs: Vec<String>,
    pub pkg_config: String,
}

/// A committed package found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPackage {
    pub manifest: Manifest,
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Package root for a recipe.
    pub fn package_root(&self, recipe: &Recipe) -> PathBuf {
        self.version_dir(&recipe.name, &recipe.version)
            .join(recipe.package_id())
    }

    fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    /// Clear any previous build of this exact recipe and return its root.
    pub fn prepare(&self, recipe: &Recipe) -> Result<PathBuf, ExecuteError> {
        let root = self.package_root(recipe);
        if root.exists() {
            std::fs::remove_dir_all(&root)?;
        }
        let manifest = root.with_extension("toml");
        if manifest.exists() {
            std::fs::remove_file(&manifest)?;
        }
        Ok(root)
    }

    /// Record a successfully staged package.
    pub fn commit(&self, recipe: &Recipe, info: &PackageInfo) -> Result<StoredPackage, ExecuteError> {
        let root = self.package_root(recipe);
        std::fs::create_dir_all(&root)?;

        let manifest = Manifest {
            package_id: recipe.package_id(),
            name: info.name.clone(),
            version: info.version.clone(),
            libs: info.libs.clone(),
            pkg_config: info.pkg_config.clone(),
        };
        let text = toml::to_string_pretty(&manifest).map_err(std::io::Error::other)?;
        std::fs::write(root.with_extension("toml"), text)?;

        Ok(StoredPackage { manifest, root })
    }

    /// All committed packages, sorted by name, version and id.
    pub fn list(&self) -> Result<Vec<StoredPackage>, ExecuteError> {
        let mut packages = Vec::new();
        if !self.root.is_dir() {
            return Ok(packages);
        }
        for name in subdirs(&self.root)? {
            for version in subdirs(&name)? {
                packages.extend(manifests_in(&version)?.into_iter().map(|(p, _)| p));
            }
        }
        packages.sort_by(|a, b| {
            (&a.manifest.name, &a.manifest.version, &a.manifest.package_id).cmp(&(
                &b.manifest.name,
                &b.manifest.version,
                &b.manifest.package_id,
            ))
        });
        Ok(packages)
    }

    /// Most recently committed package for an exact name and version.
    pub fn find(&self, name: &str, version: &str) -> Result<Option<StoredPackage>, ExecuteError> {
        let dir = self.version_dir(name, version);
        if !dir.is_dir() {
            return Ok(None);
        }
        let newest = manifests_in(&dir)?
            .into_iter()
            .max_by_key(|(_, modified)| *modified)
            .map(|(p, _)| p);
        Ok(newest)
    }
}

impl DependencyResolver for PackageStore {
    fn resolve(&self, dependency: &Dependency) -> Result<ResolvedDependency, ExecuteError> {
        let unresolved = |reason: String| ExecuteError::UnresolvedDependency {
            name: dependency.name.clone(),
            version: dependency.version.clone(),
            reason,
        };

        let stored = self
            .find(&dependency.name, &dependency.version)?
            .ok_or_else(|| unresolved(format!("not in store {}", self.root.display())))?;

        let mut resolved =
            ResolvedDependency::from_root(dependency, &stored.root, stored.manifest.libs.clone());
        if dependency.pkg_config.is_none() {
            resolved.pkg_config = stored.manifest.pkg_config;
        }
        Ok(resolved)
    }
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, ExecuteError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.path());
        }
    }
    Ok(out)
}

/// Manifests with an existing package root in one `<name>/<version>` dir.
fn manifests_in(dir: &Path) -> Result<Vec<(StoredPackage, SystemTime)>, ExecuteError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let root = path.with_extension("");
        if !root.is_dir() {
            continue;
        }
        let text = std::fs::read_to_string(&path)?;
        let Ok(manifest) = toml::from_str::<Manifest>(&text) else {
            crate::output::warning(&format!("skipping unreadable manifest {}", path.display()));
            continue;
        };
        let modified = std::fs::metadata(&path)?.modified()?;
        out.push((StoredPackage { manifest, root }, modified));
    }
    Ok(out)
}
