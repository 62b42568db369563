//! Running test and lint commands.
//!
//! Commands are executed through `sh -c` in the project root with a hard
//! timeout. A timeout is a failed run, never a hang; a command that cannot be
//! started at all is an undetermined run. Each command gets its own process
//! group so a timeout kills pipelines and background jobs along with `sh`.

use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Result of one test or lint invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestRunOutcome {
    /// False when the command never started (none configured, spawn failure).
    pub ran: bool,
    /// `None` means the outcome could not be determined.
    pub succeeded: Option<bool>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// The deadline expired and the process group was killed.
    pub timed_out: bool,
}

impl TestRunOutcome {
    pub fn undetermined(reason: impl Into<String>) -> Self {
        Self {
            ran: false,
            succeeded: None,
            stdout: String::new(),
            stderr: reason.into(),
            exit_code: None,
            timed_out: false,
        }
    }

    pub fn finished(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            ran: true,
            succeeded: Some(exit_code == 0),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            timed_out: false,
        }
    }

    pub fn timed_out(timeout: Duration) -> Self {
        Self {
            ran: true,
            succeeded: Some(false),
            stdout: String::new(),
            stderr: format!("timed out after {}s", timeout.as_secs()),
            exit_code: None,
            timed_out: true,
        }
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        out.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stderr.is_empty() && !self.stdout.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }
}

/// Executes a shell command. Swappable so validators can be tested without
/// spawning processes.
pub trait CommandRunner {
    fn run(&self, command: &str, timeout: Duration) -> TestRunOutcome;
}

/// Runs commands with `sh -c` in a fixed working directory.
pub struct ShellRunner {
    cwd: PathBuf,
}

impl ShellRunner {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
        }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, timeout: Duration) -> TestRunOutcome {
        tracing::debug!(command, timeout_secs = timeout.as_secs(), "running command");
        let timeout = if timeout.is_zero() { None } else { Some(timeout) };
        execute_shell(command, &self.cwd, timeout)
    }
}

/// Execute a shell command with an optional timeout.
///
/// stdout and stderr are drained on dedicated threads so a chatty process can't
/// fill a pipe buffer and deadlock; a waiter thread plus `recv_timeout`
/// implements the deadline without busy-waiting.
pub fn execute_shell(command: &str, cwd: &Path, timeout: Option<Duration>) -> TestRunOutcome {
    if command.trim().is_empty() {
        return TestRunOutcome::undetermined("command is empty");
    }

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => return TestRunOutcome::undetermined(format!("failed to spawn: {e}")),
    };

    let child_pid = child.id();

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> String {
        let mut buf = Vec::new();
        if let Some(mut r) = stdout_handle {
            let _ = r.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    });
    let stderr_thread = std::thread::spawn(move || -> String {
        let mut buf = Vec::new();
        if let Some(mut r) = stderr_handle {
            let _ = r.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    });

    let wait_result = match timeout {
        None => child.wait(),
        Some(timeout_dur) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });

            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result,
                Err(_) => {
                    // The waiter and reader threads unblock once the killed
                    // process exits and its pipes close.
                    kill_process_group(child_pid);
                    tracing::warn!(command, secs = timeout_dur.as_secs(), "command timed out");
                    return TestRunOutcome::timed_out(timeout_dur);
                }
            }
        }
    };

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    match wait_result {
        // Killed by a signal: no exit code, but it certainly did not pass.
        Ok(status) => TestRunOutcome::finished(status.code().unwrap_or(-1), stdout, stderr),
        Err(e) => TestRunOutcome::undetermined(format!("wait failed: {e}")),
    }
}

/// SIGKILL the process group led by `pid`. Best-effort; errors are ignored.
fn kill_process_group(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
