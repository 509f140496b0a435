//! Subprocess execution under a cancellation token.
//!
//! Every external program arbor starts (git, database clients, build tools)
//! goes through [`run_command`], which polls the child so that ctrl-c or a
//! caller-supplied deadline kills it promptly.

use crate::error::ArborError;
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the flag, so the ctrl-c handler and every running step see
/// the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token sharing this one's flag that additionally expires after
    /// `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            flag: Arc::clone(&self.flag),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Err when cancelled or past the deadline.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ArborError::Aborted.into());
        }
        if self.is_expired() {
            anyhow::bail!("deadline exceeded");
        }
        Ok(())
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out.trim().to_string()
    }

    /// The most useful single message for an error report.
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            match self.status.code() {
                Some(code) => format!("exited with status {code}"),
                None => "terminated by signal".to_string(),
            }
        } else {
            stderr.to_string()
        }
    }
}

/// Run `command` to completion, capturing stdout and stderr.
///
/// Stdin is closed. A non-zero exit is not an error here; callers decide.
pub fn run_command(command: &mut Command, cancel: &CancelToken) -> Result<CommandOutput> {
    run_command_streaming(command, cancel, None)
}

/// Like [`run_command`], also forwarding each output line to `lines`.
pub fn run_command_streaming(
    command: &mut Command,
    cancel: &CancelToken,
    lines: Option<Sender<String>>,
) -> Result<CommandOutput> {
    cancel.check()?;

    let program = command.get_program().to_string_lossy().into_owned();
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn: {program}"))?;

    // Readers run on their own threads so a chatty child cannot block the
    // polling loop below.
    let stdout_thread = spawn_reader(child.stdout.take(), lines.clone());
    let stderr_thread = spawn_reader(child.stderr.take(), lines);

    let status = wait_cancellable(&mut child, cancel)
        .with_context(|| format!("Command execution failed: {program}"))?;

    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(CommandOutput {
        status,
        stdout,
        stderr,
    })
}

fn spawn_reader<R>(pipe: Option<R>, tx: Option<Sender<String>>) -> thread::JoinHandle<String>
where
    R: std::io::Read + Send + 'static,
{
    thread::spawn(move || {
        let mut content = String::new();
        if let Some(pipe) = pipe {
            for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                if let Some(ref tx) = tx {
                    tx.send(line.clone()).ok();
                }
                content.push_str(&line);
                content.push('\n');
            }
        }
        content
    })
}

fn wait_cancellable(child: &mut Child, cancel: &CancelToken) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if let Err(e) = cancel.check() {
            child.kill().ok();
            child.wait().ok();
            return Err(e);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
