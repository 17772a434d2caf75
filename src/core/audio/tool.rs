//! Bounded execution of the external audio utilities (ffprobe, ffmpeg).
//!
//! Every invocation runs under a wall-clock budget and the child is killed
//! when the budget expires. Diagnostics captured from stderr are truncated so
//! a misbehaving tool cannot flood logs or transcripts.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::utils::truncate_chars;

/// Maximum number of characters of tool stderr kept in a diagnostic.
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Failure of a single external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} did not finish within {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("failed to launch {tool}: {reason}")]
    Spawn { tool: String, reason: String },

    #[error("{tool} exited with status {status:?}: {diagnostic}")]
    Failed {
        tool: String,
        status: Option<i32>,
        diagnostic: String,
    },
}

/// Captured output of a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
}

/// Name used for a tool in errors and logs (the program file name).
pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("tool")
        .to_string()
}

/// Run `program` with `args`, bounded by `timeout`.
///
/// The child is spawned with `kill_on_drop`, so an expired timeout drops the
/// pending wait and the process is reaped by the runtime.
pub async fn run_tool<I, S>(program: &Path, args: I, timeout: Duration) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = tool_name(program);
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {} with timeout {:?}", tool, timeout);

    let child = command.spawn().map_err(|e| ToolError::Spawn {
        tool: tool.clone(),
        reason: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ToolError::Spawn {
                tool,
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(ToolError::Timeout {
                tool,
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed {
            tool,
            status: output.status.code(),
            diagnostic: truncate_chars(stderr.trim(), MAX_DIAGNOSTIC_CHARS),
        });
    }

    Ok(ToolOutput {
        stdout: output.stdout,
    })
}
