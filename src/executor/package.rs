//! Package phase - stages built artifacts into `include/` and `lib/`.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::output;
use crate::{ArtifactRule, Recipe};

use super::error::ExecuteError;

/// `*` also crosses `/`, so `*.h` picks up headers in nested directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Execute the package phase, returning the staged files in copy order.
///
/// A required rule without matches aborts the phase; whatever earlier
/// rules already copied stays in place.
pub fn package(
    recipe: &Recipe,
    source_dir: &Path,
    package_dir: &Path,
) -> Result<Vec<PathBuf>, ExecuteError> {
    let mut staged = Vec::new();
    for rule in &recipe.artifacts {
        let copied = stage_rule(recipe, rule, source_dir, package_dir)?;
        staged.extend(copied);
    }
    Ok(staged)
}

fn stage_rule(
    recipe: &Recipe,
    rule: &ArtifactRule,
    source_dir: &Path,
    package_dir: &Path,
) -> Result<Vec<PathBuf>, ExecuteError> {
    let pattern_text = recipe.expand(&rule.pattern);
    let missing = || ExecuteError::ArtifactMissing {
        pattern: pattern_text.clone(),
    };
    let pattern = Pattern::new(&pattern_text).map_err(|_| missing())?;

    let from = source_dir.join(recipe.expand(&rule.from));
    let dest_root = package_dir.join(rule.kind.subdir());

    let mut copied = Vec::new();
    for rel in matching_files(&from, &pattern)? {
        let dest = dest_root.join(&rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(from.join(&rel), &dest)?;
        output::detail(&format!("{}/{}", rule.kind, rel.display()));
        copied.push(dest);
    }

    if copied.is_empty() {
        if rule.required {
            return Err(missing());
        }
        output::skip(&format!("optional artifact {} not found", pattern_text));
    }
    Ok(copied)
}

/// Relative paths of regular files under `root` matching `pattern`, sorted.
///
/// Traversal errors (unreadable directories) fail instead of looking like
/// missing artifacts.
fn matching_files(root: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>, ExecuteError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.path().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if pattern.matches_path_with(rel, MATCH_OPTIONS) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECIPE: &str = r#"
name = "catui"
version = "0.1.3"
[source]
git = "git@github.com:gulachek/catui.git"

[[artifacts]]
pattern = "*.h"
from = "include"
kind = "include"

[[artifacts]]
pattern = "libcatui.dylib"
from = "build"
kind = "lib"
"#;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, path.display().to_string()).unwrap();
    }

    #[test]
    fn test_package_partitions_by_kind() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("catui");
        touch(&src.join("include/catui.h"));
        touch(&src.join("include/gulachek/catui.hpp"));
        touch(&src.join("include/nested/buffer.h"));
        touch(&src.join("build/libcatui.dylib"));
        touch(&src.join("build/libcatui.a"));
        let pkg = tmp.path().join("pkg");

        let recipe = Recipe::from_toml_str(RECIPE).unwrap();
        let staged = package(&recipe, &src, &pkg).unwrap();

        assert_eq!(
            staged,
            [
                pkg.join("include/catui.h"),
                pkg.join("include/nested/buffer.h"),
                pkg.join("lib/libcatui.dylib"),
            ]
        );
        assert!(!pkg.join("include/gulachek").exists());
        assert!(!pkg.join("lib/libcatui.a").exists());
    }

    #[test]
    fn test_missing_artifact_keeps_earlier_copies() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("catui");
        touch(&src.join("include/catui.h"));
        let pkg = tmp.path().join("pkg");

        let recipe = Recipe::from_toml_str(RECIPE).unwrap();
        let err = package(&recipe, &src, &pkg).unwrap_err();

        assert!(matches!(err, ExecuteError::ArtifactMissing { ref pattern } if pattern == "libcatui.dylib"));
        assert!(pkg.join("include/catui.h").is_file());
    }

    #[test]
    fn test_optional_artifact_may_be_absent() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("catui");
        touch(&src.join("include/catui.h"));
        let pkg = tmp.path().join("pkg");

        let mut recipe = Recipe::from_toml_str(RECIPE).unwrap();
        recipe.artifacts[1].required = false;
        let staged = package(&recipe, &src, &pkg).unwrap();
        assert_eq!(staged, [pkg.join("include/catui.h")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_dir_is_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("catui");
        touch(&src.join("include/catui.h"));
        touch(&src.join("include/private/secret.h"));
        let locked = src.join("include/private");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Root reads through directory permissions.
        if std::fs::read_dir(&locked).is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let recipe = Recipe::from_toml_str(RECIPE).unwrap();
        let err = package(&recipe, &src, &tmp.path().join("pkg")).unwrap_err();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(err, ExecuteError::Io(ref e) if e.kind() == std::io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_pattern_templates() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("catui");
        let lib = format!("libcatui.{}", crate::shared_lib_ext());
        touch(&src.join("build").join(&lib));
        let pkg = tmp.path().join("pkg");

        let mut recipe = Recipe::from_toml_str(RECIPE).unwrap();
        recipe.artifacts.remove(0);
        recipe.artifacts[0].pattern = "lib{name}.{shared_ext}".to_string();

        let staged = package(&recipe, &src, &pkg).unwrap();
        assert_eq!(staged, [pkg.join("lib").join(lib)]);
    }
}
