// src/exec/launcher.rs

//! Script launcher: one spawn-and-wait task per attempt.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::build::LaunchTarget;
use crate::engine::{AttemptId, RuntimeEvent, SessionId};
use crate::exec::backend::ProcessSpawner;
use crate::types::{KillSignal, FAILED_WITHOUT_CODE};

/// Internal handle for the attempt currently being supervised.
///
/// - `cancel` asks the attempt task to kill its process.
/// - `handle` is the Tokio task that owns the process.
struct ActiveAttempt {
    session: SessionId,
    attempt: AttemptId,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

/// Spawns supervised processes and reports their lifecycle as
/// [`RuntimeEvent::ProcessStarted`] / [`RuntimeEvent::ProcessExited`].
///
/// At most one attempt is tracked at a time. Cancelling an attempt sends the
/// kill signal and suppresses its exit notification.
pub struct Launcher<S: ProcessSpawner + 'static> {
    spawner: Arc<S>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    kill_signal: KillSignal,
    active: Option<ActiveAttempt>,
}

impl<S: ProcessSpawner + 'static> std::fmt::Debug for Launcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("kill_signal", &self.kill_signal)
            .field(
                "active",
                &self.active.as_ref().map(|a| (a.session, a.attempt)),
            )
            .finish_non_exhaustive()
    }
}

impl<S: ProcessSpawner + 'static> Launcher<S> {
    pub fn new(spawner: S, runtime_tx: mpsc::Sender<RuntimeEvent>, kill_signal: KillSignal) -> Self {
        Self {
            spawner: Arc::new(spawner),
            runtime_tx,
            kill_signal,
            active: None,
        }
    }

    /// Start one attempt. The previous attempt, if still tracked, is
    /// forgotten; call [`Launcher::cancel`] first to stop it.
    pub fn launch(&mut self, session: SessionId, attempt: AttemptId, target: LaunchTarget) {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let spawner = Arc::clone(&self.spawner);
        let tx = self.runtime_tx.clone();
        let signal = self.kill_signal;

        let handle = tokio::spawn(async move {
            run_attempt(spawner, session, attempt, target, signal, tx, cancel_rx).await;
            debug!(session, attempt, "attempt task finished");
        });

        self.active = Some(ActiveAttempt {
            session,
            attempt,
            cancel: Some(cancel_tx),
            handle,
        });
    }

    /// Kill the process of `session`'s live attempt.
    ///
    /// Returns once the kill signal has been sent (not once the process has
    /// died), so a following launch never overtakes the kill. The attempt
    /// task gives up any pending report as soon as it sees the cancel, so
    /// this does not depend on the runtime channel having room.
    pub async fn cancel(&mut self, session: SessionId) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if active.session != session {
            self.active = Some(active);
            return;
        }

        if let Some(cancel) = active.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(
                    session,
                    attempt = active.attempt,
                    "process already finished while cancelling"
                );
            }
        }
        if let Err(err) = active.handle.await {
            warn!(session, error = %err, "attempt task ended abnormally");
        }
    }

    /// Session and attempt currently tracked, if the task is still running.
    pub fn active(&self) -> Option<(SessionId, AttemptId)> {
        self.active
            .as_ref()
            .filter(|a| !a.handle.is_finished())
            .map(|a| (a.session, a.attempt))
    }
}

/// Spawn the target and wait for it to exit or for cancellation.
///
/// - A spawn failure is reported as an exit with [`FAILED_WITHOUT_CODE`].
/// - On cancellation the process receives `signal` and **no** exit event is
///   sent for this attempt.
/// - Every send races the cancel receiver: the runtime loop may be the one
///   waiting on this task, so a full channel must never hold up the kill.
async fn run_attempt<S: ProcessSpawner>(
    spawner: Arc<S>,
    session: SessionId,
    attempt: AttemptId,
    target: LaunchTarget,
    signal: KillSignal,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut process = match spawner.spawn(&target.command, &target.args, &target.options) {
        Ok(p) => p,
        Err(err) => {
            error!(session, attempt, target = %target, error = %err, "failed to start script");
            let exited = RuntimeEvent::ProcessExited {
                session,
                attempt,
                code: FAILED_WITHOUT_CODE,
            };
            tokio::select! {
                _ = runtime_tx.send(exited) => {}
                _ = &mut cancel_rx => {
                    debug!(session, attempt, "cancelled before spawn failure was reported");
                }
            }
            return;
        }
    };

    info!(session, attempt, pid = ?process.id(), target = %target, "script process started");
    tokio::select! {
        sent = runtime_tx.send(RuntimeEvent::ProcessStarted { session, attempt }) => {
            if sent.is_err() {
                process.kill(signal);
                return;
            }
        }
        _ = &mut cancel_rx => {
            info!(session, attempt, signal = %signal, "stopping script before start was reported");
            process.kill(signal);
            return;
        }
    }

    let code = tokio::select! {
        code = process.wait() => code,

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(session, attempt, signal = %signal, "stopping script");
                }
                Err(_) => {
                    debug!(session, attempt, "launcher dropped; stopping script");
                }
            }
            process.kill(signal);
            return;
        }
    };

    debug!(session, attempt, exit_code = code, "script process exited");
    tokio::select! {
        _ = runtime_tx.send(RuntimeEvent::ProcessExited { session, attempt, code }) => {}
        _ = &mut cancel_rx => {
            debug!(session, attempt, exit_code = code, "exit superseded before it was reported");
        }
    }
}
