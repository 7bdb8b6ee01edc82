//! Centralized command execution with consistent error handling.
//!
//! This module provides a unified API for running external commands
//! (dotnet, mvn, docker), ensuring all commands capture stderr and provide
//! useful error messages. Long-running commands can be streamed line by line.

use anyhow::{bail, Context, Result};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Stderr lines kept for the failure message of a streamed command.
const STDERR_TAIL: usize = 20;

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Get stderr, trimmed of whitespace.
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}

/// Stdout and stderr lines of a running command, interleaved in arrival order.
///
/// Ends after the last line; yields one final `Err` if the command exited
/// non-zero. Dropping the stream kills the command.
pub type LineStream = BoxStream<'static, Result<String>>;

/// Builder for configuring command execution.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    stdin: Option<String>,
    /// Custom error message prefix.
    error_prefix: Option<String>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            error_prefix: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Add a path as an argument.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Feed `input` to the command's stdin (used for `--password-stdin`).
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Set a custom error message prefix.
    pub fn error_msg(mut self, msg: impl AsRef<str>) -> Self {
        self.error_prefix = Some(msg.as_ref().to_string());
        self
    }

    /// Rendered command line for logs. Stdin is never included.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn failure_prefix(&self) -> String {
        self.error_prefix
            .clone()
            .unwrap_or_else(|| format!("'{}' failed", self.program))
    }

    /// Run the command and capture output.
    pub async fn run(self) -> Result<CommandResult> {
        tracing::debug!(command = %self.display(), "running");

        let mut cmd = self.command();
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if self.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        if let Some(input) = &self.stdin {
            let mut pipe = child.stdin.take().context("stdin was not captured")?;
            pipe.write_all(input.as_bytes())
                .await
                .with_context(|| format!("Failed to write stdin of '{}'", self.program))?;
            // Closing stdin signals EOF to the child
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("Failed to wait for '{}'", self.program))?;

        let result = CommandResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            let prefix = self.failure_prefix();
            let stderr = result.stderr_trimmed();
            if stderr.is_empty() {
                bail!("{} (exit code {})", prefix, result.code());
            } else {
                bail!("{} (exit code {}):\n{}", prefix, result.code(), stderr);
            }
        }

        Ok(result)
    }

    /// Spawn the command and stream its output line by line.
    ///
    /// Stdout and stderr are merged. The last stderr lines are repeated in
    /// the final error if the command fails.
    pub async fn spawn_lines(self) -> Result<LineStream> {
        tracing::debug!(command = %self.display(), "streaming");

        let mut cmd = self.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute '{}'. Is it installed?", self.program))?;

        let stdout = child.stdout.take().context("stdout was not captured")?;
        let stderr = child.stderr.take().context("stderr was not captured")?;
        let merged = stream::select(
            read_lines(stdout).map(|line| (Pipe::Stdout, line)),
            read_lines(stderr).map(|line| (Pipe::Stderr, line)),
        )
        .boxed();

        let state = LineState {
            merged: Some(merged),
            child,
            stderr_tail: VecDeque::new(),
            prefix: self.failure_prefix(),
        };

        let stream = stream::unfold(state, |mut state| async move {
            let merged = state.merged.as_mut()?;
            match merged.next().await {
                Some((pipe, Ok(line))) => {
                    if pipe == Pipe::Stderr {
                        state.remember_stderr(&line);
                    }
                    Some((Ok(line), state))
                }
                Some((_, Err(e))) => {
                    state.merged = None;
                    let err = anyhow::Error::from(e).context(format!("{}: reading output", state.prefix));
                    Some((Err(err), state))
                }
                None => {
                    state.merged = None;
                    match state.finish().await {
                        Ok(()) => None,
                        Err(e) => Some((Err(e), state)),
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Lines of `reader`, decoded lossily. Stops after the first read error.
fn read_lines<R>(reader: R) -> BoxStream<'static, std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let segments = BufReader::new(reader).split(b'\n');
    stream::unfold(Some(segments), |segments| async move {
        let mut segments = segments?;
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
                Some((Ok(line), Some(segments)))
            }
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

struct LineState {
    /// `None` once both pipes are exhausted.
    merged: Option<BoxStream<'static, (Pipe, std::io::Result<String>)>>,
    child: Child,
    stderr_tail: VecDeque<String>,
    prefix: String,
}

impl LineState {
    fn remember_stderr(&mut self, line: &str) {
        if self.stderr_tail.len() == STDERR_TAIL {
            self.stderr_tail.pop_front();
        }
        self.stderr_tail.push_back(line.to_string());
    }

    async fn finish(&mut self) -> Result<()> {
        let status = self
            .child
            .wait()
            .await
            .with_context(|| format!("{}: wait failed", self.prefix))?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            if self.stderr_tail.is_empty() {
                bail!("{} (exit code {})", self.prefix, code);
            } else {
                let stderr: Vec<&str> = self.stderr_tail.iter().map(String::as_str).collect();
                bail!("{} (exit code {}):\n{}", self.prefix, code, stderr.join("\n"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Convenience functions
// =============================================================================

/// Check if a program exists in PATH.
///
/// Returns the full path if found, None otherwise.
pub fn which(program: &str) -> Option<String> {
    which::which(program)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_success() {
        let result = Cmd::new("echo").arg("hello").run().await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_failure_includes_stderr() {
        let err = Cmd::new("ls")
            .arg("/nonexistent_path_12345")
            .run()
            .await
            .unwrap_err();
        let msg = err.to_string();

        assert!(msg.contains("No such file") || msg.contains("cannot access"));
    }

    #[tokio::test]
    async fn test_custom_error_message() {
        let err = Cmd::new("false")
            .error_msg("Custom build step failed")
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Custom build step failed"));
    }

    #[tokio::test]
    async fn test_stdin_is_fed() {
        let result = Cmd::new("cat").stdin("s3cret").run().await.unwrap();
        assert_eq!(result.stdout, "s3cret");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = Cmd::new("nonexistent_program_12345").run().await.unwrap_err();
        assert!(err.to_string().contains("Is it installed?"));
    }

    #[tokio::test]
    async fn test_spawn_lines_in_order() {
        let stream = Cmd::new("sh")
            .args(["-c", "echo one; echo two; echo three"])
            .spawn_lines()
            .await
            .unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_spawn_lines_reports_exit_failure_last() {
        let stream = Cmd::new("sh")
            .args(["-c", "echo partial; echo denied >&2; exit 3"])
            .error_msg("push failed")
            .spawn_lines()
            .await
            .unwrap();
        let items: Vec<Result<String>> = stream.collect().await;

        assert_eq!(items.len(), 3);
        let mut lines: Vec<&str> = items[..2].iter().map(|l| l.as_ref().unwrap().as_str()).collect();
        lines.sort();
        assert_eq!(lines, vec!["denied", "partial"]);
        let err = items[2].as_ref().unwrap_err().to_string();
        assert!(err.contains("push failed"));
        assert!(err.contains("exit code 3"));
        assert!(err.contains("denied"));
    }

    #[tokio::test]
    async fn test_spawn_lines_forwards_stderr_on_success() {
        let stream = Cmd::new("sh")
            .args(["-c", "echo 'progress line'; echo 'WARNING: registry notice' >&2"])
            .spawn_lines()
            .await
            .unwrap();
        let lines: Vec<String> = stream.map(|l| l.unwrap()).collect().await;

        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&"progress line".to_string()));
        assert!(lines.contains(&"WARNING: registry notice".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_lines_decodes_invalid_utf8_lossily() {
        let stream = Cmd::new("sh")
            .args(["-c", "printf 'bad \\377 byte\\n' >&2; exit 1"])
            .error_msg("push failed")
            .spawn_lines()
            .await
            .unwrap();
        let items: Vec<Result<String>> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "bad \u{FFFD} byte");
        let err = items[1].as_ref().unwrap_err().to_string();
        assert!(err.contains("bad \u{FFFD} byte"));
    }

    #[test]
    fn test_which() {
        assert!(which("sh").is_some());
        assert!(which("nonexistent_program_12345").is_none());
    }

    #[test]
    fn test_display_renders_command_line() {
        let cmd = Cmd::new("docker").args(["push", "reg/img:1"]).stdin("hidden");
        assert_eq!(cmd.display(), "docker push reg/img:1");
    }
}
