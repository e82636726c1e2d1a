// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::{Launcher, ProcessSpawner};
use crate::types::ExitCode;

use super::core::CoreRuntime;
use super::timers::TimerSet;
use super::{CoreCommand, RuntimeEvent};

/// How the runtime loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// Exit code the host should terminate with (run mode only).
    pub exit_code: Option<ExitCode>,
}

/// Drives the supervisor core in response to `RuntimeEvent`s, and delegates
/// process handling to a [`Launcher`] and delays to a [`TimerSet`].
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// supervision semantics.
pub struct Runtime<S: ProcessSpawner + 'static> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    launcher: Launcher<S>,
    timers: TimerSet,
}

impl<S: ProcessSpawner + 'static> fmt::Debug for Runtime<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("launcher", &self.launcher)
            .finish_non_exhaustive()
    }
}

impl<S: ProcessSpawner + 'static> Runtime<S> {
    /// `event_tx` must feed `event_rx`; the launcher and timers report
    /// through it.
    pub fn new(
        core: CoreRuntime,
        event_tx: mpsc::Sender<RuntimeEvent>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        spawner: S,
    ) -> Self {
        let launcher = Launcher::new(spawner, event_tx.clone(), core.settings().kill_signal);
        let timers = TimerSet::new(event_tx);
        Self {
            core,
            event_rx,
            launcher,
            timers,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (launch, kill, timers, exit).
    pub async fn run(mut self) -> Result<RunOutcome> {
        info!("launchdog runtime started");
        let mut outcome = RunOutcome::default();

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                if let Some(code) = self.execute_command(command).await {
                    outcome.exit_code = Some(code);
                }
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.timers.disarm_all();
        info!(exit_code = ?outcome.exit_code, "runtime exiting");
        Ok(outcome)
    }

    /// Execute a single command from the core. Returns the host exit code
    /// for `ExitHost`.
    async fn execute_command(&mut self, command: CoreCommand) -> Option<ExitCode> {
        match command {
            CoreCommand::Launch {
                session,
                attempt,
                target,
            } => {
                self.launcher.launch(session, attempt, target);
            }
            CoreCommand::Kill { session } => {
                self.launcher.cancel(session).await;
            }
            CoreCommand::ArmTimer { kind, after, event } => {
                self.timers.arm(kind, after, event);
            }
            CoreCommand::DisarmTimer(kind) => {
                self.timers.disarm(kind);
            }
            CoreCommand::ExitHost(code) => {
                info!(exit_code = code, "core issued ExitHost command");
                return Some(code);
            }
        }
        None
    }
}
