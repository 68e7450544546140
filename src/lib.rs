//! Declarative package recipe executor
//!
//! A recipe names a package, where its source comes from, which packages it
//! depends on, how to build it and which built files make up the package.
//! The executor runs one recipe through a fixed pipeline:
//!
//! 1. `source` - clone the git repository or download and extract the archive
//! 2. `config` - declare dependencies, resolve them, write pkg-config descriptors
//! 3. `build` - run the build commands inside the source tree
//! 4. `package` - copy matching artifacts into `include/` and `lib/`
//! 5. `info` - report the libraries downstream consumers link against
//!
//! # Example Recipe
//!
//! ```toml
//! name = "catui"
//! version = "0.1.3"
//! description = "IPC based application library"
//! license = "MIT"
//!
//! [source]
//! git = "git@github.com:gulachek/catui.git"
//!
//! [[dependencies]]
//! name = "msgstream"
//! version = "0.3.1"
//!
//! [build]
//! commands = ["npm install", "node make.mjs catui"]
//!
//! [[artifacts]]
//! pattern = "*.h"
//! from = "include"
//! kind = "include"
//!
//! [[artifacts]]
//! pattern = "libcatui.dylib"
//! from = "build"
//! kind = "lib"
//! ```
//!
//! Archive sources use a version template instead of a fixed URL:
//!
//! ```toml
//! [source]
//! archive = "https://github.com/gulachek/catui/archive/refs/heads/v{version}.zip"
//! ```
//!
//! # Variables Available to Build Commands
//!
//! - `PKG_CONFIG_PATH` - generated descriptors first, then the inherited value
//! - `NPROC` - Number of CPUs
//! - `SOURCE_DIR` - Acquired source tree
//! - `PACKAGE_DIR` - Package root being staged

pub mod executor;
pub mod output;
mod recipe;
pub mod store;

pub use executor::{
    CommandOutput, Context, ExecuteError, Execution, Executor, PackageInfo, Phase, PhaseError,
};
pub use recipe::{
    ArchiveSource, ArtifactKind, ArtifactRule, BuildSpec, Dependency, GitSource, InfoSpec, Recipe,
    RecipeError, SourceSpec, is_valid_name, shared_lib_ext,
};
pub use store::PackageStore;
