//! Executor error types.

use std::path::PathBuf;

use thiserror::Error;

use super::Phase;

/// Errors that can occur during recipe execution.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("cannot write build config {}: {source}", path.display())]
    ConfigWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build command failed: {command} (exit code: {}){}", exit_status(.exit_code), captured(.stdout, .stderr))]
    BuildFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("no files match artifact pattern: {pattern}")]
    ArtifactMissing { pattern: String },

    #[error("sha256 verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot resolve dependency {name}@{version}: {reason}")]
    UnresolvedDependency {
        name: String,
        version: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecuteError {
    pub(crate) fn source_unavailable(url: &str, reason: impl std::fmt::Display) -> Self {
        ExecuteError::SourceUnavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn captured(stdout: &str, stderr: &str) -> String {
    let mut out = String::new();
    if !stdout.is_empty() {
        out.push_str("\nstdout:\n");
        out.push_str(stdout.trim_end());
    }
    if !stderr.is_empty() {
        out.push_str("\nstderr:\n");
        out.push_str(stderr.trim_end());
    }
    out
}

/// A pipeline failure, tagged with the phase that raised it.
#[derive(Error, Debug)]
#[error("{phase} phase failed")]
pub struct PhaseError {
    pub phase: Phase,
    #[source]
    pub error: ExecuteError,
    /// Phases that finished before the failure, in order.
    pub completed: Vec<Phase>,
}
