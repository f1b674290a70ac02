//! Process runner for the backend command-line tools.
//!
//! Both adapters shell out through this module: `run` treats a non-zero
//! exit as a failure carrying the tool's combined stderr+stdout, while
//! `run_unchecked` leaves the exit status to the caller (idempotent
//! operations and probes). Author/committer identity and similar
//! per-invocation settings travel as env overlays; the ambient process
//! environment is never mutated.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Output};

use thiserror::Error;

/// Environment overrides applied to a single child process.
pub type EnvOverlay = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {code}: {output}")]
    Failed {
        tool: String,
        code: i32,
        output: String,
    },
}

/// Run a backend tool and return its stdout, failing on non-zero exit.
pub fn run(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    env: Option<&EnvOverlay>,
) -> Result<String, BackendError> {
    let output = run_bytes(tool, args, cwd, env)?;
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Checked variant returning raw stdout bytes (blob content may be binary).
pub fn run_bytes(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    env: Option<&EnvOverlay>,
) -> Result<Vec<u8>, BackendError> {
    let output = run_unchecked(tool, args, cwd, env)?;
    ensure_success(tool, &output)?;
    Ok(output.stdout)
}

/// Run a backend tool without the non-zero-exit-is-failure policy.
pub fn run_unchecked(
    tool: &str,
    args: &[&str],
    cwd: &Path,
    env: Option<&EnvOverlay>,
) -> Result<Output, BackendError> {
    log::debug!("{} {}", tool, args.join(" "));

    let mut cmd = Command::new(tool);
    cmd.args(args).current_dir(cwd);
    if let Some(overlay) = env {
        cmd.envs(overlay);
    }

    cmd.output().map_err(|source| BackendError::Launch {
        tool: tool.to_string(),
        source,
    })
}

fn ensure_success(tool: &str, output: &Output) -> Result<(), BackendError> {
    if output.status.success() {
        return Ok(());
    }

    // stderr first: that is where the backends put the reason.
    let mut combined = String::from_utf8_lossy(&output.stderr).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));

    Err(BackendError::Failed {
        tool: tool.to_string(),
        code: output.status.code().unwrap_or(-1),
        output: combined.trim().to_string(),
    })
}
