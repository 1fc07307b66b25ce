//! Builder for executing external tool commands.
//!
//! Short helpers (ffprobe, identify, montage) go through [`ToolCommand::execute`],
//! which buffers everything and fails on a non-zero exit. Long transcodes go
//! through [`ToolCommand::execute_with_stderr_callback`], which streams stderr
//! line by line, honours a [`CancellationToken`], and hands the exit status
//! back to the caller.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tf_core::{Error, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::tools::HELPER_TIMEOUT;

/// Lines of stderr kept for diagnostics when streaming.
pub(crate) const STDERR_TAIL_LINES: usize = 200;

/// The last `capacity` lines pushed, oldest first.
#[derive(Debug)]
pub(crate) struct LineTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineTail {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub(crate) fn join(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). When streaming, only the last
    /// lines are kept.
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use tf_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> tf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
///     .arg("/path/to/video.mkv")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: Some(HELPER_TIMEOUT),
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Let the process run for as long as it takes.
    pub fn no_timeout(&mut self) -> &mut Self {
        self.timeout = None;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn(&self, program_name: &str) -> Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(program_name, format!("failed to spawn: {e}")))
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if spawning fails, if the process times out,
    /// or if it exits with a non-zero status (message includes stderr).
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self.program_name();
        let child = self.spawn(&program_name)?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::tool(&program_name, format!("timed out after {limit:?}")))?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::tool(&program_name, format!("I/O error waiting for process: {e}")))?;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !output.status.success() {
            return Err(Error::tool(
                program_name,
                format!(
                    "exited with status {}: {}",
                    output.status,
                    tool_output.stderr.trim()
                ),
            ));
        }

        Ok(tool_output)
    }

    /// Execute the command, feeding every stderr line to `on_line` as it
    /// arrives. Stdout is collected concurrently.
    ///
    /// A non-zero exit is not an error here; inspect [`ToolOutput::status`].
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] once `cancel` fires. The child is killed and
    ///   reaped first.
    /// - [`Error::Tool`] if spawning fails or the timeout expires.
    pub async fn execute_with_stderr_callback(
        &self,
        mut on_line: impl FnMut(&str),
        cancel: Option<CancellationToken>,
    ) -> Result<ToolOutput> {
        let program_name = self.program_name();
        let mut child = self.spawn(&program_name)?;
        let cancel = cancel.unwrap_or_default();

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool(&program_name, "stderr was not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool(&program_name, "stdout was not captured"))?;

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await.map(|_| buf)
        });

        let deadline = async {
            match self.timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let mut lines = BufReader::new(stderr).lines();
        let mut tail = LineTail::new(STDERR_TAIL_LINES);

        let status = loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        on_line(&line);
                        tail.push(line);
                    }
                    Ok(None) => break wait_or_cancel(&mut child, &cancel, &program_name).await?,
                    Err(e) => {
                        tracing::debug!(tool = %program_name, "stderr read failed: {e}");
                        break wait_or_cancel(&mut child, &cancel, &program_name).await?;
                    }
                },
                _ = cancel.cancelled() => {
                    terminate(&mut child, &program_name).await;
                    return Err(Error::Cancelled);
                }
                _ = &mut deadline => {
                    terminate(&mut child, &program_name).await;
                    return Err(Error::tool(
                        program_name,
                        format!("timed out after {:?}", self.timeout.unwrap_or_default()),
                    ));
                }
            }
        };

        let stdout = match stdout_task.await {
            Ok(Ok(buf)) => String::from_utf8_lossy(&buf).to_string(),
            Ok(Err(e)) => {
                tracing::debug!(tool = %program_name, "stdout read failed: {e}");
                String::new()
            }
            Err(e) => {
                tracing::debug!(tool = %program_name, "stdout reader panicked: {e}");
                String::new()
            }
        };

        Ok(ToolOutput {
            status,
            stdout,
            stderr: tail.join(),
        })
    }
}

/// Wait for exit after stderr closed, still honouring cancellation.
async fn wait_or_cancel(
    child: &mut Child,
    cancel: &CancellationToken,
    program_name: &str,
) -> Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status
            .map_err(|e| Error::tool(program_name, format!("I/O error waiting for process: {e}"))),
        _ = cancel.cancelled() => {
            terminate(child, program_name).await;
            Err(Error::Cancelled)
        }
    }
}

async fn terminate(child: &mut Child, program_name: &str) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(tool = %program_name, "kill failed: {e}");
    }
    if let Err(e) = child.wait().await {
        tracing::debug!(tool = %program_name, "reaping killed process failed: {e}");
    }
}
