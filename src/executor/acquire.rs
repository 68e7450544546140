//! Acquire phase - clones git repositories or downloads and extracts archives.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::output;
use crate::{Recipe, SourceSpec};

use super::context::Context;
use super::error::ExecuteError;
use super::extract;
use super::util::{is_empty_dir, url_filename};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Written into an extracted tree so a later run can recognize it.
const SOURCE_MARKER: &str = ".recipe-source";

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SourceMarker {
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
}

impl SourceMarker {
    fn read(dir: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(dir.join(SOURCE_MARKER)).ok()?;
        toml::from_str(&text).ok()
    }

    fn write(&self, dir: &Path) -> Result<(), ExecuteError> {
        let text = toml::to_string(self).map_err(std::io::Error::other)?;
        std::fs::write(dir.join(SOURCE_MARKER), text)?;
        Ok(())
    }
}

/// Connect/read timeout, from `RECIPE_HTTP_TIMEOUT` (clamped to 5-300s).
fn http_timeout() -> Duration {
    static TIMEOUT: OnceLock<Duration> = OnceLock::new();
    *TIMEOUT.get_or_init(|| {
        let secs = std::env::var("RECIPE_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        Duration::from_secs(secs.clamp(5, 300))
    })
}

/// Execute the acquire phase, returning the source directory.
pub fn acquire(ctx: &Context, recipe: &Recipe) -> Result<PathBuf, ExecuteError> {
    let url = recipe.source_url();
    let dest = ctx.work_dir.join(recipe.source_dir_name());
    std::fs::create_dir_all(&ctx.work_dir)?;

    match &recipe.source {
        SourceSpec::Git(_) => acquire_git(&url, &dest)?,
        SourceSpec::Archive(archive) => {
            let sha256 = archive.sha256.as_deref();
            acquire_archive(ctx, &url, sha256, &dest)?
        }
    }

    Ok(dest)
}

fn acquire_git(url: &str, dest: &Path) -> Result<(), ExecuteError> {
    if !is_empty_dir(dest) {
        if origin_url(dest).as_deref() == Some(url) {
            output::skip(&format!("{} already cloned, reusing", dest.display()));
            return Ok(());
        }
        return Err(ExecuteError::source_unavailable(
            url,
            format!("{} exists with conflicting contents", dest.display()),
        ));
    }

    output::detail(&format!("git clone {}", url));
    let pb = output::spinner(&format!("cloning {}", url));
    let result = Command::new("git")
        .arg("clone")
        .arg(url)
        .arg(dest)
        .output();
    pb.finish_and_clear();

    let out = result.map_err(|e| ExecuteError::source_unavailable(url, format!("cannot run git: {}", e)))?;
    if !out.status.success() {
        return Err(ExecuteError::source_unavailable(
            url,
            String::from_utf8_lossy(&out.stderr).trim(),
        ));
    }
    Ok(())
}

/// `origin` remote of an existing checkout, if it is one.
fn origin_url(dir: &Path) -> Option<String> {
    if !dir.join(".git").exists() {
        return None;
    }
    let out = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["remote", "get-url", "origin"])
        .output()
        .ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn acquire_archive(
    ctx: &Context,
    url: &str,
    sha256: Option<&str>,
    dest: &Path,
) -> Result<(), ExecuteError> {
    let format = extract::detect_format(url)
        .ok_or_else(|| ExecuteError::UnsupportedFormat(url_filename(url)))?;

    let marker = SourceMarker {
        url: url.to_string(),
        sha256: sha256.map(|s| s.trim().to_lowercase()),
    };
    if !is_empty_dir(dest) {
        if SourceMarker::read(dest).as_ref() == Some(&marker) {
            output::skip(&format!("{} already extracted, reusing", dest.display()));
            return Ok(());
        }
        return Err(ExecuteError::source_unavailable(
            url,
            format!("{} exists with conflicting contents", dest.display()),
        ));
    }

    let mut archive = tempfile::Builder::new()
        .prefix(".download-")
        .suffix(&format!("-{}", url_filename(url)))
        .tempfile_in(&ctx.work_dir)?;

    let bytes = download(url, archive.as_file_mut())?;
    output::detail(&format!("downloaded {} ({} bytes)", url_filename(url), bytes));

    if let Some(expected) = sha256 {
        verify_sha256(archive.path(), expected)?;
        output::detail("sha256 verified");
    }

    extract::extract(archive.path(), format, dest)?;
    marker.write(dest)?;
    output::detail(&format!("extracted into {}", dest.display()));
    Ok(())
}

/// Stream a URL into `file`, returning the byte count.
fn download(url: &str, file: &mut std::fs::File) -> Result<u64, ExecuteError> {
    let pb = output::spinner(&format!("downloading {}", url_filename(url)));

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(http_timeout())
        .timeout_read(http_timeout())
        .build();

    let response = agent.get(url).call().map_err(|e| {
        pb.finish_and_clear();
        match e {
            ureq::Error::Status(code, _) => ExecuteError::source_unavailable(url, format!("HTTP {}", code)),
            other => ExecuteError::source_unavailable(url, other),
        }
    })?;

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        output::upgrade_to_bytes(&pb, len);
    }

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(n) => n,
            Err(e) => {
                pb.finish_and_clear();
                return Err(ExecuteError::source_unavailable(url, e));
            }
        };
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n])?;
        total += n as u64;
        pb.set_position(total);
    }
    file.flush()?;

    pb.finish_and_clear();
    Ok(total)
}

fn verify_sha256(path: &Path, expected: &str) -> Result<(), ExecuteError> {
    let mut f = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = f.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    let actual = hex::encode(hasher.finalize());

    if actual != expected.trim().to_lowercase() {
        return Err(ExecuteError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
