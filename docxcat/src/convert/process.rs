//! Running external tools with a time limit.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

/// Maximum number of stderr bytes kept in a [`ToolError::Failed`].
const STDERR_EXCERPT: usize = 600;

/// Failure of an external tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The binary could not be found.
    #[error("{tool} is not installed or not on PATH")]
    NotFound {
        /// Tool as configured.
        tool: String,
    },

    /// The tool did not exit in time and was killed.
    #[error("{tool} did not finish within {}s and was stopped", .timeout.as_secs())]
    TimedOut {
        /// Tool as configured.
        tool: String,
        /// Time limit that elapsed.
        timeout: Duration,
    },

    /// The tool exited with a non-zero status.
    #[error("{tool} exited with {status}{}", excerpt_suffix(.stderr))]
    Failed {
        /// Tool as configured.
        tool: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Tail of the tool's stderr.
        stderr: String,
    },

    /// The tool exited successfully but its output is missing or empty.
    #[error("{tool} produced no output at {}", .path.display())]
    MissingOutput {
        /// Tool as configured.
        tool: String,
        /// Where the output was expected.
        path: PathBuf,
    },

    /// The tool could not be started or waited on.
    #[error("{tool} could not be run: {source}")]
    Io {
        /// Tool as configured.
        tool: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

fn excerpt_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Output of a finished tool.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Locate a tool, either by explicit path or on `PATH`.
pub fn resolve_tool(bin: &Path) -> Option<PathBuf> {
    which::which(bin).ok()
}

/// Run a tool and wait for it, killing it when `timeout` elapses.
///
/// # Errors
///
/// Returns a [`ToolError`] if the tool is missing, cannot be started,
/// times out, or exits with a non-zero status.
pub async fn run_tool<I, S>(bin: &Path, args: I, timeout: Duration) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = bin.display().to_string();
    let program = resolve_tool(bin).ok_or_else(|| ToolError::NotFound { tool: tool.clone() })?;
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();

    log::debug!("running {} {:?} (timeout {}s)", program.display(), args, timeout.as_secs());

    let start = Instant::now();
    let child = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ToolError::NotFound { tool: tool.clone() },
            _ => ToolError::Io {
                tool: tool.clone(),
                source,
            },
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => return Err(ToolError::Io { tool, source }),
        Err(_) => {
            log::warn!("{tool} timed out after {}s", timeout.as_secs());
            return Err(ToolError::TimedOut { tool, timeout });
        }
    };

    let elapsed = start.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    log::debug!("{tool} exited with {} after {:.2}s", output.status, elapsed.as_secs_f64());

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            status: output.status.to_string(),
            stderr: tail(&stderr, STDERR_EXCERPT),
        });
    }

    Ok(ToolOutput {
        stdout,
        stderr,
        elapsed,
    })
}

/// Check that a tool left a non-empty file behind.
pub async fn expect_output(tool: &Path, path: &Path) -> Result<u64, ToolError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(ToolError::MissingOutput {
            tool: tool.display().to_string(),
            path: path.to_path_buf(),
        }),
    }
}

/// Last `max` bytes of `text`, trimmed, on a character boundary.
fn tail(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.len() <= max {
        return text.to_string();
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
