//! Execution context providing configuration for recipe execution.

use std::path::PathBuf;

/// Execution context providing configuration for recipe execution.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory sources are acquired into
    pub work_dir: PathBuf,
    /// Package root artifacts are staged into
    pub package_dir: PathBuf,
    /// Number of parallel jobs exported to build commands
    pub nproc: usize,
    /// If true, echo command output as it is captured
    pub verbose: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("recipe-build"),
            package_dir: std::env::temp_dir().join("recipe-package"),
            nproc: num_cpus::get(),
            verbose: false,
        }
    }
}

impl Context {
    /// Create a new context with the given work and package directories.
    pub fn new(work_dir: impl Into<PathBuf>, package_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            package_dir: package_dir.into(),
            ..Default::default()
        }
    }

    /// Set the number of build jobs.
    pub fn nproc(mut self, nproc: usize) -> Self {
        self.nproc = nproc.max(1);
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
