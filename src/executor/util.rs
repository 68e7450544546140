//! Utility functions for the executor.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::output;

use super::error::ExecuteError;

/// Extract filename from a URL.
pub fn url_filename(url: &str) -> String {
    url.rsplit('/')
        .next()
        .unwrap_or("download")
        .split('?')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}

/// Truncate long commands for display.
pub fn display_cmd(cmd: &str) -> String {
    if cmd.chars().count() > 60 {
        let head: String = cmd.chars().take(57).collect();
        format!("{}...", head)
    } else {
        cmd.to_string()
    }
}

/// Captured output of one successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
}

/// Run a shell command in `dir` with extra environment, capturing output.
///
/// Non-zero exit becomes [`ExecuteError::BuildFailed`] carrying the
/// captured stdout/stderr untouched.
pub fn run_shell(
    dir: &Path,
    cmd: &str,
    env: &[(&str, String)],
    verbose: bool,
) -> Result<CommandOutput, ExecuteError> {
    let pb = output::spinner(&format!("run: {}", display_cmd(cmd)));

    let result = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .output();

    pb.finish_and_clear();
    let out = result?;

    if verbose {
        output::command_output(&out.stdout, &out.stderr);
    }

    if !out.status.success() {
        output::detail(&format!("run: {} [FAILED]", display_cmd(cmd)));
        return Err(ExecuteError::BuildFailed {
            command: cmd.to_string(),
            exit_code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        });
    }

    output::detail(&format!("run: {}", display_cmd(cmd)));
    Ok(CommandOutput {
        command: cmd.to_string(),
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    })
}

/// True if `dir` is missing or has no entries.
pub fn is_empty_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => !dir.exists(),
    }
}
