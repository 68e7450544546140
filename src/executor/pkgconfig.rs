//! Config generation - one pkg-config descriptor per resolved dependency.

use std::path::{Path, PathBuf};

use crate::output;

use super::deps::ResolvedDependency;
use super::error::ExecuteError;

/// Subdirectory of the source tree descriptors are written into.
pub const PKGCONFIG_DIR: &str = "pkgconfig";

/// Render the `.pc` text for a dependency.
pub fn render(dep: &ResolvedDependency) -> String {
    let mut pc = format!("prefix={}\n", dep.root.display());

    if let Some(include) = dep.include_dirs.first() {
        pc.push_str(&format!("includedir={}\n", with_prefix(&dep.root, include)));
    }
    if let Some(lib) = dep.lib_dirs.first() {
        pc.push_str(&format!("libdir={}\n", with_prefix(&dep.root, lib)));
    }

    pc.push('\n');
    pc.push_str(&format!("Name: {}\n", dep.pkg_config));
    pc.push_str(&format!(
        "Description: {} package staged by recipe\n",
        dep.dependency.name
    ));
    pc.push_str(&format!("Version: {}\n", dep.dependency.version));

    let mut libs: Vec<String> = Vec::new();
    for (i, dir) in dep.lib_dirs.iter().enumerate() {
        libs.push(if i == 0 {
            "-L${libdir}".to_string()
        } else {
            format!("-L{}", dir.display())
        });
    }
    libs.extend(dep.libs.iter().map(|l| format!("-l{}", l)));
    pc.push_str(&format!("Libs: {}\n", libs.join(" ")));

    let cflags: Vec<String> = dep
        .include_dirs
        .iter()
        .enumerate()
        .map(|(i, dir)| {
            if i == 0 {
                "-I${includedir}".to_string()
            } else {
                format!("-I{}", dir.display())
            }
        })
        .collect();
    pc.push_str(&format!("Cflags: {}\n", cflags.join(" ")));

    pc
}

/// `${prefix}`-relative form of `dir` when it lives under `root`.
fn with_prefix(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => "${prefix}".to_string(),
        Ok(rel) => format!("${{prefix}}/{}", rel.display()),
        Err(_) => dir.display().to_string(),
    }
}

/// Write descriptors under `<source_dir>/pkgconfig/`.
///
/// With nothing resolved this touches nothing at all.
pub fn generate(source_dir: &Path, resolved: &[ResolvedDependency]) -> Result<Vec<PathBuf>, ExecuteError> {
    if resolved.is_empty() {
        return Ok(Vec::new());
    }

    let dir = source_dir.join(PKGCONFIG_DIR);
    std::fs::create_dir_all(&dir).map_err(|source| ExecuteError::ConfigWriteError {
        path: dir.clone(),
        source,
    })?;

    let mut written = Vec::with_capacity(resolved.len());
    for dep in resolved {
        let path = dir.join(format!("{}.pc", dep.pkg_config));
        std::fs::write(&path, render(dep)).map_err(|source| ExecuteError::ConfigWriteError {
            path: path.clone(),
            source,
        })?;
        output::detail(&format!("wrote {}", path.display()));
        written.push(path);
    }
    Ok(written)
}
