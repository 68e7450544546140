//! Recipe executor - runs a recipe through source, config, build, package and info.

mod acquire;
mod build;
mod context;
pub mod deps;
mod error;
mod extract;
mod package;
pub mod pkgconfig;
mod util;
mod workdir;

pub use context::Context;
pub use deps::{DependencyResolver, ResolvedDependency, StaticResolver, Unresolved};
pub use error::{ExecuteError, PhaseError};
pub use util::CommandOutput;
pub use workdir::{DirScope, WorkDir};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::output;
use crate::{Dependency, Recipe};

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Source,
    Config,
    Build,
    Package,
    Info,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Source,
        Phase::Config,
        Phase::Build,
        Phase::Package,
        Phase::Info,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Source => "source",
            Phase::Config => "config",
            Phase::Build => "build",
            Phase::Package => "package",
            Phase::Info => "info",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Linkage metadata handed to downstream build systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub libs: Vec<String>,
    pub pkg_config: String,
}

/// Everything a successful pipeline run produced.
#[derive(Debug, Clone)]
pub struct Execution {
    /// Completed phases, in order.
    pub phases: Vec<Phase>,
    pub source_dir: PathBuf,
    pub config_files: Vec<PathBuf>,
    /// Captured output of every build command, in run order.
    pub build_output: Vec<CommandOutput>,
    pub staged: Vec<PathBuf>,
    pub info: PackageInfo,
}

/// Recipe executor that runs the phases of a recipe.
pub struct Executor {
    ctx: Context,
    resolver: Box<dyn DependencyResolver>,
}

impl Executor {
    /// Create a new executor with the given context.
    ///
    /// Without a resolver any declared dependency fails the config phase.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            resolver: Box::new(Unresolved),
        }
    }

    /// Set the dependency resolver.
    pub fn with_resolver(mut self, resolver: impl DependencyResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Execute a complete recipe.
    ///
    /// Phases run strictly in order; the first failure stops the pipeline
    /// and nothing after it runs.
    pub fn execute(&self, recipe: &Recipe) -> Result<Execution, PhaseError> {
        let mut completed = Vec::new();

        let source_dir = run_phase(Phase::Source, &mut completed, || self.acquire_source(recipe))?;

        let config_files = run_phase(Phase::Config, &mut completed, || {
            let declared = self.declare_dependencies(&recipe.deps);
            let resolved = self.resolve_dependencies(&declared)?;
            self.generate_build_config(&source_dir, &resolved)
        })?;

        let build_output = run_phase(Phase::Build, &mut completed, || self.run_build(&source_dir, recipe))?;

        let staged = run_phase(Phase::Package, &mut completed, || self.package(recipe, &source_dir))?;

        let info = run_phase(Phase::Info, &mut completed, || {
            Ok(Self::describe_package_info(recipe))
        })?;

        Ok(Execution {
            phases: completed,
            source_dir,
            config_files,
            build_output,
            staged,
            info,
        })
    }

    /// Acquire the recipe's source into the work directory.
    pub fn acquire_source(&self, recipe: &Recipe) -> Result<PathBuf, ExecuteError> {
        acquire::acquire(&self.ctx, recipe)
    }

    /// Record requirements for the resolver.
    pub fn declare_dependencies(&self, deps: &[Dependency]) -> Vec<Dependency> {
        deps::declare(deps)
    }

    /// Locate declared requirements through the configured resolver.
    pub fn resolve_dependencies(
        &self,
        declared: &[Dependency],
    ) -> Result<Vec<ResolvedDependency>, ExecuteError> {
        deps::resolve_all(self.resolver.as_ref(), declared)
    }

    /// Write pkg-config descriptors into the source tree.
    pub fn generate_build_config(
        &self,
        source_dir: &Path,
        resolved: &[ResolvedDependency],
    ) -> Result<Vec<PathBuf>, ExecuteError> {
        pkgconfig::generate(source_dir, resolved)
    }

    /// Run the build commands inside the source tree.
    pub fn run_build(&self, source_dir: &Path, recipe: &Recipe) -> Result<Vec<CommandOutput>, ExecuteError> {
        let work_dir = WorkDir::new(&self.ctx.work_dir);
        build::build(&self.ctx, &work_dir, source_dir, recipe)
    }

    /// Stage artifacts into the package directory.
    pub fn package(&self, recipe: &Recipe, source_dir: &Path) -> Result<Vec<PathBuf>, ExecuteError> {
        package::package(recipe, source_dir, &self.ctx.package_dir)
    }

    /// Static linkage metadata; no side effects.
    pub fn describe_package_info(recipe: &Recipe) -> PackageInfo {
        PackageInfo {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            libs: recipe.libs(),
            pkg_config: recipe.pkg_config_name(),
        }
    }
}

fn run_phase<T>(
    phase: Phase,
    completed: &mut Vec<Phase>,
    f: impl FnOnce() -> Result<T, ExecuteError>,
) -> Result<T, PhaseError> {
    output::sub_action(phase.name());
    match f() {
        Ok(value) => {
            completed.push(phase);
            Ok(value)
        }
        Err(error) => Err(PhaseError {
            phase,
            error,
            completed: completed.clone(),
        }),
    }
}
