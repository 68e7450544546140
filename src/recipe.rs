//! Recipe definitions - TOML declarations deserialized into structured data.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("cannot read recipe {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid recipe: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid package name: {0:?}")]
    InvalidName(String),
    #[error("invalid {field} version {value:?}: {reason}")]
    InvalidVersion {
        field: String,
        value: String,
        reason: String,
    },
    #[error("dependency declared twice: {0}")]
    DuplicateDependency(String),
    #[error("empty artifact pattern")]
    EmptyPattern,
    #[error("invalid artifact pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A parsed package recipe.
///
/// One recipe instance drives exactly one pipeline run. Near-identical
/// variants of a package (different versions, different dependency pins)
/// are separate recipe files, never separate code paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub source: SourceSpec,
    #[serde(default, rename = "dependencies")]
    pub deps: Vec<Dependency>,
    #[serde(default)]
    pub build: BuildSpec,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRule>,
    #[serde(default)]
    pub info: Option<InfoSpec>,
}

/// A named, exactly-versioned requirement on another package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    /// pkg-config module name when it differs from the package name
    /// (cjson installs `libcjson.pc`).
    #[serde(default, rename = "pkg_config", skip_serializing_if = "Option::is_none")]
    pub pkg_config: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Git(GitSource),
    Archive(ArchiveSource),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSource {
    pub git: String,
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveSource {
    /// URL template; `{version}` and `{name}` are substituted.
    pub archive: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    /// Commands run in order through `sh -c`.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Subdirectory of the source tree to run the commands in.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Include,
    Lib,
}

impl ArtifactKind {
    /// Subdirectory of the package root this kind is staged into.
    pub fn subdir(self) -> &'static str {
        match self {
            ArtifactKind::Include => "include",
            ArtifactKind::Lib => "lib",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.subdir())
    }
}

/// Which built files belong in the package, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactRule {
    pub pattern: String,
    /// Source subdirectory the pattern is matched under.
    #[serde(default = "default_from")]
    pub from: String,
    pub kind: ArtifactKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_from() -> String {
    ".".to_string()
}

fn default_required() -> bool {
    true
}

/// Linkage metadata published for downstream build systems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoSpec {
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkg_config: Option<String>,
}

/// Shared library extension of the host platform.
pub fn shared_lib_ext() -> &'static str {
    if cfg!(target_os = "macos") {
        "dylib"
    } else if cfg!(windows) {
        "dll"
    } else {
        "so"
    }
}

impl Recipe {
    /// Parse and validate a recipe from TOML text.
    pub fn from_toml_str(input: &str) -> Result<Self, RecipeError> {
        let recipe: Recipe = toml::from_str(input)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Load a recipe file.
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path).map_err(|source| RecipeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check names, versions and patterns.
    pub fn validate(&self) -> Result<(), RecipeError> {
        validate_name(&self.name)?;
        validate_version("package", &self.version)?;

        let mut seen = HashSet::new();
        for dep in &self.deps {
            validate_name(&dep.name)?;
            if let Some(module) = &dep.pkg_config {
                validate_name(module)?;
            }
            validate_version(&dep.name, &dep.version)?;
            if !seen.insert(dep.name.as_str()) {
                return Err(RecipeError::DuplicateDependency(dep.name.clone()));
            }
        }

        if let Some(info) = &self.info {
            for name in info.libs.iter().chain(info.pkg_config.as_ref()) {
                validate_name(name)?;
            }
        }

        for rule in &self.artifacts {
            if rule.pattern.trim().is_empty() {
                return Err(RecipeError::EmptyPattern);
            }
            glob::Pattern::new(&rule.pattern).map_err(|e| RecipeError::InvalidPattern {
                pattern: rule.pattern.clone(),
                reason: e.msg.to_string(),
            })?;
        }

        Ok(())
    }

    /// Substitute `{name}`, `{version}` and `{shared_ext}` in a template.
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{name}", &self.name)
            .replace("{version}", &self.version)
            .replace("{shared_ext}", shared_lib_ext())
    }

    /// Fully expanded source URL.
    pub fn source_url(&self) -> String {
        match &self.source {
            SourceSpec::Git(git) => self.expand(&git.git),
            SourceSpec::Archive(archive) => self.expand(&archive.archive),
        }
    }

    /// Name of the directory the source lands in, relative to the work dir.
    pub fn source_dir_name(&self) -> String {
        let explicit = match &self.source {
            SourceSpec::Git(git) => git.dir.as_deref(),
            SourceSpec::Archive(archive) => archive.dir.as_deref(),
        };
        match explicit {
            Some(dir) => self.expand(dir),
            None => repo_name(&self.source_url()).unwrap_or_else(|| self.name.clone()),
        }
    }

    /// Library names, defaulting to the package name.
    pub fn libs(&self) -> Vec<String> {
        match &self.info {
            Some(info) if !info.libs.is_empty() => info.libs.clone(),
            _ => vec![self.name.clone()],
        }
    }

    /// pkg-config module name this package is published under.
    pub fn pkg_config_name(&self) -> String {
        self.info
            .as_ref()
            .and_then(|i| i.pkg_config.clone())
            .unwrap_or_else(|| self.name.clone())
    }

    /// Content-addressed package id: truncated SHA-256 of the canonical recipe.
    pub fn package_id(&self) -> String {
        // Struct field order makes the JSON form canonical.
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        hex::encode(digest)[..16].to_string()
    }
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            pkg_config: None,
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Package, library and pkg-config module names.
///
/// Starts with an ASCII letter or digit, then letters, digits and `-_.+`.
/// Names become path components, so separators and leading dots never pass.
pub fn is_valid_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
}

fn validate_name(name: &str) -> Result<(), RecipeError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(RecipeError::InvalidName(name.to_string()))
    }
}

fn validate_version(field: &str, version: &str) -> Result<(), RecipeError> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|e| RecipeError::InvalidVersion {
            field: field.to_string(),
            value: version.to_string(),
            reason: e.to_string(),
        })
}

/// Derive a repository name from a clone or archive URL.
///
/// `git@github.com:org/repo.git` and
/// `https://github.com/org/repo/archive/refs/heads/v1.zip` both give `repo`.
fn repo_name(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segments: Vec<&str> = path
        .split(['/', ':'])
        .filter(|s| !s.is_empty())
        .collect();

    if let Some(pos) = segments.iter().position(|s| *s == "archive")
        && pos > 0
    {
        return Some(segments[pos - 1].to_string());
    }

    let last = segments.last()?;
    let stem = [".git", ".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".tar.zst", ".tar", ".zip"]
        .iter()
        .find_map(|ext| last.strip_suffix(ext))
        .unwrap_or(last);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
