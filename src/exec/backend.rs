// src/exec/backend.rs

//! Pluggable process-spawning abstraction.
//!
//! The launcher talks to a [`ProcessSpawner`] instead of
//! `tokio::process::Command` directly. This makes it easy to swap in a fake
//! spawner in tests while keeping the production implementation here.
//!
//! - [`TokioSpawner`] is the default implementation used by `launchdog`.
//! - Tests can provide their own spawner that records launches and kills and
//!   decides when each "process" exits.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::build::SpawnOptions;
use crate::errors::Result;
use crate::types::{ExitCode, KillSignal, StdioMode, FAILED_WITHOUT_CODE};

/// Starts OS processes.
pub trait ProcessSpawner: Send + Sync {
    /// Spawn `command args...` with the given options.
    ///
    /// An error here means the process never started.
    fn spawn(
        &self,
        command: &str,
        args: &[String],
        options: &SpawnOptions,
    ) -> Result<Box<dyn ProcessHandle>>;
}

/// A spawned process.
pub trait ProcessHandle: Send {
    /// Wait for the process to exit and report its code.
    ///
    /// Resolves once; deaths without a numeric status report
    /// [`FAILED_WITHOUT_CODE`].
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ExitCode> + Send + '_>>;

    /// Send `signal` to the process. Does not wait for it to die and does
    /// nothing if it already exited.
    fn kill(&mut self, signal: KillSignal);

    /// OS process id, while known.
    fn id(&self) -> Option<u32>;
}

/// Production spawner based on `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(
        &self,
        command: &str,
        args: &[String],
        options: &SpawnOptions,
    ) -> Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(command);
        cmd.args(args).envs(&options.env);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        match options.stdio {
            StdioMode::Inherit => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Null => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
            }
            StdioMode::Piped => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning '{command}'"))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, "stderr");
        }

        debug!(pid = ?child.id(), command, "process spawned");
        Ok(Box::new(TokioProcess { child }))
    }
}

/// Consume a piped stream so buffers don't fill, logging each line.
fn forward_lines<R>(stream: R, name: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(target: "launchdog::script", stream = name, "{}", line);
        }
    });
}

struct TokioProcess {
    child: Child,
}

impl ProcessHandle for TokioProcess {
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ExitCode> + Send + '_>> {
        Box::pin(async move {
            match self.child.wait().await {
                Ok(status) => status.code().unwrap_or(FAILED_WITHOUT_CODE),
                Err(err) => {
                    debug!(error = %err, "failed to wait for process");
                    FAILED_WITHOUT_CODE
                }
            }
        })
    }

    fn kill(&mut self, signal: KillSignal) {
        send_signal(&mut self.child, signal);
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[cfg(unix)]
fn send_signal(child: &mut Child, signal: KillSignal) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // `id()` is `None` once the child has been reaped.
    let Some(pid) = child.id() else {
        return;
    };
    let sig = match signal {
        KillSignal::Term => Signal::SIGTERM,
        KillSignal::Kill => Signal::SIGKILL,
        KillSignal::Int => Signal::SIGINT,
        KillSignal::Hup => Signal::SIGHUP,
        KillSignal::Quit => Signal::SIGQUIT,
        KillSignal::Usr1 => Signal::SIGUSR1,
        KillSignal::Usr2 => Signal::SIGUSR2,
    };
    if let Err(err) = kill(Pid::from_raw(pid as i32), sig) {
        debug!(pid, signal = %signal, error = %err, "failed to signal process");
    }
}

#[cfg(not(unix))]
fn send_signal(child: &mut Child, signal: KillSignal) {
    // Named signals don't exist here; terminate the process.
    if let Err(err) = child.start_kill() {
        debug!(signal = %signal, error = %err, "failed to kill process");
    }
}
