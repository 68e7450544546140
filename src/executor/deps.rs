//! Dependency declaration and the resolver seam.
//!
//! The executor never resolves dependencies itself. It records what the
//! recipe requires and asks a [`DependencyResolver`] where each
//! requirement lives on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::Dependency;
use crate::output;

use super::error::ExecuteError;

/// A dependency located by a resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub dependency: Dependency,
    /// Package root of the dependency.
    pub root: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    pub libs: Vec<String>,
    /// pkg-config module name the descriptor is written under.
    pub pkg_config: String,
}

impl ResolvedDependency {
    /// Standard `include/` + `lib/` layout under `root`.
    pub fn from_root(dependency: &Dependency, root: impl Into<PathBuf>, libs: Vec<String>) -> Self {
        let root = root.into();
        let pkg_config = dependency
            .pkg_config
            .clone()
            .unwrap_or_else(|| dependency.name.clone());
        Self {
            dependency: dependency.clone(),
            include_dirs: vec![root.join("include")],
            lib_dirs: vec![root.join("lib")],
            root,
            libs,
            pkg_config,
        }
    }
}

/// External collaborator that maps name+version to an on-disk package.
pub trait DependencyResolver {
    fn resolve(&self, dependency: &Dependency) -> Result<ResolvedDependency, ExecuteError>;
}

/// Record the recipe's requirements in declaration order.
///
/// No resolution happens here; an empty list is valid.
pub fn declare(deps: &[Dependency]) -> Vec<Dependency> {
    for dep in deps {
        output::detail(&format!("requires {}", dep));
    }
    deps.to_vec()
}

/// Hand each declared requirement to the resolver, preserving order.
pub fn resolve_all(
    resolver: &dyn DependencyResolver,
    declared: &[Dependency],
) -> Result<Vec<ResolvedDependency>, ExecuteError> {
    declared.iter().map(|dep| resolver.resolve(dep)).collect()
}

/// Resolver for recipes that must not have dependencies; fails on any.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unresolved;

impl DependencyResolver for Unresolved {
    fn resolve(&self, dependency: &Dependency) -> Result<ResolvedDependency, ExecuteError> {
        Err(ExecuteError::UnresolvedDependency {
            name: dependency.name.clone(),
            version: dependency.version.clone(),
            reason: "no resolver configured".to_string(),
        })
    }
}

/// Explicit name -> package root mapping, with an optional fallback.
#[derive(Default)]
pub struct StaticResolver {
    roots: HashMap<String, PathBuf>,
    fallback: Option<Box<dyn DependencyResolver>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `name` to a package root laid out as `include/` + `lib/`.
    pub fn with(mut self, name: impl Into<String>, root: impl AsRef<Path>) -> Self {
        self.roots.insert(name.into(), root.as_ref().to_path_buf());
        self
    }

    /// Consult `resolver` for names not mapped explicitly.
    pub fn fallback(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.fallback = Some(Box::new(resolver));
        self
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(&self, dependency: &Dependency) -> Result<ResolvedDependency, ExecuteError> {
        if let Some(root) = self.roots.get(&dependency.name) {
            return Ok(ResolvedDependency::from_root(
                dependency,
                root,
                vec![dependency.name.clone()],
            ));
        }
        match &self.fallback {
            Some(resolver) => resolver.resolve(dependency),
            None => Unresolved.resolve(dependency),
        }
    }
}
