//! Subprocess execution with a per-call timeout

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::error::SweepError;

/// Captured result of a finished subprocess
#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> String {
        self.status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

/// Render a command for messages, e.g. `git branch -D feature`
pub(crate) fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `cmd` to completion or kill it after `timeout`
///
/// Pipes are drained on helper threads so large outputs cannot block the
/// child. Spawn failures go through `on_spawn_error` so callers can map a
/// missing binary to their own error.
pub(crate) fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    on_spawn_error: impl FnOnce(io::Error) -> SweepError,
) -> Result<CommandOutput, SweepError> {
    let description = describe(cmd);
    tracing::debug!(command = %description, "running");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(on_spawn_error)?;

    let stdout = drain(&mut child, Pipe::Stdout);
    let stderr = drain(&mut child, Pipe::Stderr);

    let status = match child.wait_timeout(timeout)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            tracing::warn!(command = %description, secs = timeout.as_secs(), "timed out");
            return Err(SweepError::Timeout {
                command: description,
                secs: timeout.as_secs(),
            });
        }
    };

    Ok(CommandOutput {
        status,
        stdout: join_reader(stdout)?,
        stderr: join_reader(stderr)?,
    })
}

enum Pipe {
    Stdout,
    Stderr,
}

type Reader = Option<thread::JoinHandle<io::Result<String>>>;

fn drain(child: &mut Child, pipe: Pipe) -> Reader {
    fn spawn_reader<R: Read + Send + 'static>(
        mut source: R,
    ) -> thread::JoinHandle<io::Result<String>> {
        thread::spawn(move || {
            let mut buf = Vec::new();
            source.read_to_end(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    }

    match pipe {
        Pipe::Stdout => child.stdout.take().map(spawn_reader),
        Pipe::Stderr => child.stderr.take().map(spawn_reader),
    }
}

fn join_reader(reader: Reader) -> Result<String, SweepError> {
    match reader {
        Some(handle) => handle
            .join()
            .map_err(|_| SweepError::Io(io::Error::other("output reader thread panicked")))?
            .map_err(SweepError::Io),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_command() {
        let mut cmd = Command::new("git");
        cmd.args(["branch", "-D", "feature"]);
        assert_eq!(describe(&cmd), "git branch -D feature");
    }

    #[test]
    fn test_missing_program_uses_spawn_mapper() {
        let mut cmd = Command::new("mergesweep-definitely-not-a-program");
        let err = run_with_timeout(&mut cmd, Duration::from_secs(5), |e| {
            assert_eq!(e.kind(), io::ErrorKind::NotFound);
            SweepError::GitNotInstalled
        })
        .unwrap_err();
        assert!(matches!(err, SweepError::GitNotInstalled));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = run_with_timeout(&mut cmd, Duration::from_secs(5), SweepError::Io).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code(), "3");
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err =
            run_with_timeout(&mut cmd, Duration::from_millis(100), SweepError::Io).unwrap_err();
        assert!(matches!(err, SweepError::Timeout { .. }));
    }
}
