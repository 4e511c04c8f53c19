//! Subprocess execution with a hard timeout.
//!
//! External tools (`docker`, `kubectl`, `wg`, `curl`, `ps`) run synchronously
//! on the tick thread. The child is polled until its deadline and killed when
//! it overruns, so a hung tool costs at most its declared bound.
//!
//! Output goes to anonymous temp files rather than pipes, so a child writing
//! more than a pipe buffer never blocks waiting for a reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Result of a subprocess execution with timeout.
#[derive(Debug, Clone)]
pub enum SubprocessResult {
    /// Command exited with status 0.
    Success(CommandOutput),
    /// Command exited with a non-zero status.
    Failed(CommandOutput),
    /// Command overran its bound and was killed.
    Timeout,
    /// Command could not be started.
    SpawnError,
}

impl SubprocessResult {
    /// Returns stdout if the command ran to completion.
    #[must_use]
    pub fn stdout_string(&self) -> Option<&str> {
        match self {
            Self::Success(output) | Self::Failed(output) => Some(&output.stdout),
            _ => None,
        }
    }

    /// Returns stdout only for a successful run with non-blank output.
    #[must_use]
    pub fn success_stdout(&self) -> Option<&str> {
        match self {
            Self::Success(output) if !output.stdout.trim().is_empty() => Some(&output.stdout),
            _ => None,
        }
    }

    /// Returns true if command completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if command timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// True when stdout or stderr reports a permission problem.
    #[must_use]
    pub fn mentions_permission_problem(&self) -> bool {
        match self {
            Self::Success(output) | Self::Failed(output) => {
                is_permission_message(&output.stdout) || is_permission_message(&output.stderr)
            }
            _ => false,
        }
    }
}

/// Recognises the permission-refusal phrasing of common tools.
pub fn is_permission_message(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["permission denied", "operation not permitted", "password is required"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Runs `cmd args...`, killing it if it has not exited after `timeout`.
pub fn run_with_timeout(cmd: &str, args: &[&str], timeout: Duration) -> SubprocessResult {
    let Some((mut stdout, mut stderr)) = capture_files() else {
        crate::warn!("subprocess", "{cmd}: no temp file for output capture");
        return SubprocessResult::SpawnError;
    };
    let (Ok(out_handle), Ok(err_handle)) = (stdout.try_clone(), stderr.try_clone()) else {
        return SubprocessResult::SpawnError;
    };
    let child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out_handle))
        .stderr(Stdio::from(err_handle))
        .spawn();
    let Ok(mut child) = child else {
        crate::trace!("subprocess", "{cmd}: spawn failed");
        return SubprocessResult::SpawnError;
    };

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                crate::debug!("subprocess", "{cmd}: killed after {timeout:?}");
                return SubprocessResult::Timeout;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return SubprocessResult::SpawnError;
            }
        }
    };

    let output = CommandOutput { stdout: read_capture(&mut stdout), stderr: read_capture(&mut stderr) };
    classify(status, output)
}

fn capture_files() -> Option<(File, File)> {
    Some((tempfile::tempfile().ok()?, tempfile::tempfile().ok()?))
}

fn read_capture(file: &mut File) -> String {
    let mut bytes = Vec::new();
    if file.seek(SeekFrom::Start(0)).is_ok() {
        let _ = file.read_to_end(&mut bytes);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn classify(status: ExitStatus, output: CommandOutput) -> SubprocessResult {
    if status.success() {
        SubprocessResult::Success(output)
    } else {
        SubprocessResult::Failed(output)
    }
}

/// Runs a command with timeout and returns stdout on success.
#[must_use]
pub fn run_with_timeout_stdout(cmd: &str, args: &[&str], timeout: Duration) -> Option<String> {
    match run_with_timeout(cmd, args, timeout) {
        SubprocessResult::Success(output) => Some(output.stdout),
        _ => None,
    }
}

/// Resolves `binary` against `PATH` without running it.
pub fn which(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).map(|dir| dir.join(binary)).find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command() {
        let result = run_with_timeout("echo", &["hello"], Duration::from_secs(2));
        assert!(result.is_success());
        assert_eq!(result.stdout_string().unwrap().trim(), "hello");
        assert_eq!(result.success_stdout().unwrap().trim(), "hello");
    }

    #[test]
    fn test_failed_command_keeps_output() {
        let result = run_with_timeout("sh", &["-c", "echo partial; exit 3"], Duration::from_secs(2));
        assert!(matches!(result, SubprocessResult::Failed(_)));
        assert_eq!(result.stdout_string().unwrap().trim(), "partial");
        assert!(result.success_stdout().is_none());
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let result = run_with_timeout("sleep", &["5"], Duration::from_millis(100));

        assert!(result.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(2), "must return near the bound");
    }

    #[test]
    fn test_command_that_produces_large_output() {
        // ~230KB, several times a pipe buffer
        let start = Instant::now();
        let result = run_with_timeout("seq", &["1", "40000"], Duration::from_secs(2));

        assert!(result.is_success());
        assert!(start.elapsed() < Duration::from_secs(1));
        let output = result.stdout_string().unwrap();
        assert_eq!(output.lines().count(), 40000);
        assert_eq!(output.lines().last(), Some("40000"));
    }

    #[test]
    fn test_large_stderr_does_not_block() {
        let result = run_with_timeout("sh", &["-c", "seq 1 40000 >&2; echo done"], Duration::from_secs(2));
        assert!(result.is_success());
        assert_eq!(result.stdout_string().unwrap().trim(), "done");
    }

    #[test]
    fn test_spawn_error() {
        let result = run_with_timeout("definitely-not-a-real-binary-xyz", &[], Duration::from_secs(1));
        assert!(matches!(result, SubprocessResult::SpawnError));
        assert!(result.stdout_string().is_none());
    }

    #[test]
    fn test_blank_output_is_not_success_stdout() {
        let result = run_with_timeout("true", &[], Duration::from_secs(2));
        assert!(result.is_success());
        assert!(result.success_stdout().is_none());
    }

    #[test]
    fn test_permission_detection_reads_stderr() {
        let result = run_with_timeout(
            "sh",
            &["-c", "echo 'Unable to access interface: Operation not permitted' >&2; exit 1"],
            Duration::from_secs(2),
        );
        assert!(result.mentions_permission_problem());
    }

    #[test]
    fn test_permission_messages() {
        assert!(is_permission_message("sudo: a password is required"));
        assert!(is_permission_message("Permission denied"));
        assert!(!is_permission_message("interface: wg0"));
    }

    #[test]
    fn test_which_finds_sh() {
        assert!(which("sh").is_some());
        assert!(which("definitely-not-a-real-binary-xyz").is_none());
    }

    #[test]
    fn test_stdout_convenience() {
        let out = run_with_timeout_stdout("printf", &["%s %s", "foo", "bar"], Duration::from_secs(2));
        assert_eq!(out.as_deref(), Some("foo bar"));
    }
}
