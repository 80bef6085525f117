//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// How many trailing stderr lines are kept for error messages when stderr is
/// streamed line by line.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use sg_engine::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> sg_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .arg("-v").arg("quiet")
///     .arg("-print_format").arg("json")
///     .arg("-show_format")
///     .arg("/path/to/video.mp4")
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
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
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
        self.timeout = d;
        self
    }

    /// Run the process from the given directory so relative paths resolve
    /// inside it.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`sg_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`sg_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`sg_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> sg_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = self.build();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| sg_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        // The child is killed on drop if the timeout elapses.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(sg_core::Error::tool(
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
            Ok(Err(e)) => Err(sg_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(sg_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, handing every stderr line to `on_line` as it
    /// arrives. Stdout is discarded.
    ///
    /// Only the last few stderr lines are retained; they end up in the error
    /// message when the process fails.
    pub async fn execute_with_stderr_lines(
        &self,
        mut on_line: impl FnMut(&str),
    ) -> sg_core::Result<ExitStatus> {
        let program_name = self.program_name();

        let mut cmd = self.build();
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| sg_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| sg_core::Error::tool(&program_name, "stderr was not captured"))?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        let run = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            child.wait().await
        };

        let status = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(sg_core::Error::tool(
                    program_name,
                    format!("I/O error waiting for process: {e}"),
                ))
            }
            Err(_elapsed) => {
                return Err(sg_core::Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        if !status.success() {
            let detail: Vec<&str> = tail
                .iter()
                .map(String::as_str)
                .filter(|l| !l.contains('=') || l.contains(' '))
                .collect();
            return Err(sg_core::Error::tool(
                program_name,
                format!("exited with status {status}: {}", detail.join("\n").trim()),
            ));
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("failed to spawn"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn timeout_fires() {
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(
            err.contains("timed out") || err.contains("failed to spawn"),
            "unexpected error: {err}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_lines_are_streamed() {
        let mut seen = Vec::new();
        let status = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo one >&2; echo two >&2"])
            .execute_with_stderr_lines(|line| seen.push(line.to_string()))
            .await
            .unwrap();
        assert!(status.success());
        assert_eq!(seen, vec!["one", "two"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_tail_lands_in_error() {
        let err = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo 'Invalid too big or non positive size' >&2; exit 1"])
            .execute_with_stderr_lines(|_| {})
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Invalid too big"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn current_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let out = ToolCommand::new(PathBuf::from("pwd"))
            .current_dir(dir.path())
            .execute()
            .await
            .unwrap();
        let reported = PathBuf::from(out.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
