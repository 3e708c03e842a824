//! Lifecycle of the external programs this crate drives.
//!
//! Every subprocess (`ffprobe`, `ffmpeg`, `rcrack`, `reg`) goes through
//! [`ExternalProcess`], which walks the same small state machine:
//!
//! ```text
//! Starting ──► Running ──► Completed
//!                 │
//!                 ├──────► Failed
//!                 └──────► Cancelled
//! ```
//!
//! Standard output is streamed line by line to the caller while the process
//! runs. Standard error is collected in the background and handed back with
//! the exit status.

use std::{
    future::Future,
    path::Path,
    process::{ExitStatus, Stdio},
};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::error::{AaxionError, AaxionResult};

/// Number of trailing stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug)]
pub struct ProcessOutput {
    pub program: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Last few non-empty lines of standard error.
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<_> = self
            .stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
        lines[start..].join("\n")
    }

    pub fn ensure_success(self) -> AaxionResult<Self> {
        if self.success() {
            return Ok(self);
        }

        Err(AaxionError::ProcessFailed {
            stderr: self.stderr_tail(),
            program: self.program,
            status: self.status,
        })
    }
}

pub struct ExternalProcess {
    program: String,
    command: Command,
    state: ProcessState,
}

impl ExternalProcess {
    pub fn new(command: Command) -> Self {
        let program = Path::new(command.as_std().get_program())
            .file_stem()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            program,
            command,
            state: ProcessState::Starting,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    fn transition(&mut self, state: ProcessState) {
        tracing::trace!("{}: {:?} -> {:?}", self.program, self.state, state);
        self.state = state;
    }

    /// Run the process to completion, feeding each stdout line to `on_line`.
    ///
    /// A non-zero exit status is not an error here; callers decide through
    /// [`ProcessOutput::ensure_success`]. Cancelling `cancel` kills the child
    /// and returns [`AaxionError::Cancelled`].
    pub async fn run<F>(
        &mut self,
        cancel: &CancellationToken,
        mut on_line: F,
    ) -> AaxionResult<ProcessOutput>
    where
        F: FnMut(&str),
    {
        self.transition(ProcessState::Starting);
        tracing::debug!("Spawning {:?}", self.command.as_std());

        self.command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match self.command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.transition(ProcessState::Failed);
                return Err(e.into());
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            self.transition(ProcessState::Failed);
            return Err(AaxionError::UnexpectedOutput {
                program: self.program.clone(),
                reason: "standard streams were not captured".to_string(),
            });
        };
        let stderr_task = collect_stderr(stderr);
        self.transition(ProcessState::Running);

        let mut lines = BufReader::new(stdout).lines();
        let mut collected = String::new();
        let completion = async {
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
                collected.push_str(&line);
                collected.push('\n');
            }
            child.wait().await
        };

        let status = match with_cancel(cancel, completion).await {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                self.transition(ProcessState::Failed);
                stderr_task.abort();
                return Err(e.into());
            }
            None => {
                kill(&mut child, &self.program).await;
                stderr_task.abort();
                self.transition(ProcessState::Cancelled);
                return Err(AaxionError::Cancelled);
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        let output = ProcessOutput {
            program: self.program.clone(),
            status,
            stdout: collected,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        if output.success() {
            self.transition(ProcessState::Completed);
        } else {
            self.transition(ProcessState::Failed);
        }
        Ok(output)
    }
}

fn collect_stderr<R>(mut stderr: R) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buffer).await {
            tracing::warn!("Failed to read stderr: {e}");
        }
        buffer
    })
}

async fn kill(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill {program}: {e}");
    }
}

/// Drive `future` until it finishes or `cancel` fires, whichever comes first.
pub async fn with_cancel<F>(cancel: &CancellationToken, future: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
