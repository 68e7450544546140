//! Build phase - runs the recipe's commands inside the source tree.

use std::path::Path;

use crate::Recipe;

use super::context::Context;
use super::error::ExecuteError;
use super::pkgconfig::PKGCONFIG_DIR;
use super::util::{CommandOutput, run_shell};
use super::workdir::WorkDir;

/// Execute the build phase, returning each command's captured output.
///
/// The source directory (and the optional build subdirectory) is entered
/// for the duration of the phase only.
pub fn build(
    ctx: &Context,
    work_dir: &WorkDir,
    source_dir: &Path,
    recipe: &Recipe,
) -> Result<Vec<CommandOutput>, ExecuteError> {
    let _source = work_dir.enter(source_dir)?;
    let _sub = match &recipe.build.dir {
        Some(dir) => Some(work_dir.enter(recipe.expand(dir))?),
        None => None,
    };

    let env = build_env(ctx, source_dir);
    let mut outputs = Vec::with_capacity(recipe.build.commands.len());
    for cmd in &recipe.build.commands {
        let cmd = recipe.expand(cmd);
        outputs.push(run_shell(&work_dir.current(), &cmd, &env, ctx.verbose)?);
    }
    Ok(outputs)
}

/// Environment exported to every build command.
fn build_env(ctx: &Context, source_dir: &Path) -> Vec<(&'static str, String)> {
    let pkgconfig = source_dir.join(PKGCONFIG_DIR).display().to_string();
    let pkg_config_path = match std::env::var("PKG_CONFIG_PATH") {
        Ok(existing) if !existing.is_empty() => format!("{}:{}", pkgconfig, existing),
        _ => pkgconfig,
    };

    vec![
        ("PKG_CONFIG_PATH", pkg_config_path),
        ("NPROC", ctx.nproc.to_string()),
        ("SOURCE_DIR", source_dir.display().to_string()),
        ("PACKAGE_DIR", ctx.package_dir.display().to_string()),
    ]
}
