// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of [`CoreCommand`]s describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the channel
//! - spawning and killing processes
//! - running timers
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels or processes.

use tracing::{debug, error, info, warn};

use crate::build::{BuildStats, LaunchTarget};
use crate::config::Settings;
use crate::engine::debounce::{DebouncePipeline, PipelineState};
use crate::engine::mode::ModeTracker;
use crate::engine::retry::{Decision, IdleReason, Session};
use crate::engine::{AttemptId, CoreCommand, CoreStep, RuntimeEvent, SessionId, TimerKind};
use crate::types::{ExitCode, Mode};

/// Pure core runtime state.
///
/// This owns:
/// - the immutable settings
/// - the mode tracker
/// - the debounce pipeline
/// - the current session, if any
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    settings: Settings,
    mode: ModeTracker,
    pipeline: DebouncePipeline,
    session: Option<Session>,
    next_session: SessionId,
}

impl CoreRuntime {
    pub fn new(settings: Settings) -> Self {
        let pipeline = DebouncePipeline::new(settings.compilation_debounce);
        Self {
            settings,
            mode: ModeTracker::new(),
            pipeline,
            session: None,
            next_session: 1,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> Mode {
        self.mode.current()
    }

    /// Expose the pipeline state (for tests).
    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Expose the current session (for tests).
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::ModeEntered(mode) => {
                self.mode.set(mode);
                CoreStep::continue_with(Vec::new())
            }
            RuntimeEvent::BuildFinished(stats) => {
                CoreStep::continue_with(vec![self.pipeline.offer(stats)])
            }
            RuntimeEvent::DebounceElapsed { generation } => match self.pipeline.elapsed(generation) {
                Some(stats) => self.dispatch(&stats),
                None => CoreStep::continue_with(Vec::new()),
            },
            RuntimeEvent::ProcessStarted { session, attempt } => {
                self.handle_started(session, attempt)
            }
            RuntimeEvent::MinUpTimeReached { session, attempt } => {
                self.handle_min_up_time(session, attempt)
            }
            RuntimeEvent::ProcessExited {
                session,
                attempt,
                code,
            } => self.handle_exit(session, attempt, code),
            RuntimeEvent::RetryDelayElapsed { session } => self.handle_retry_elapsed(session),
            RuntimeEvent::ShutdownRequested => self.handle_shutdown(),
        }
    }

    /// The session `id` refers to, if it is still the current one.
    fn current_session(&mut self, id: SessionId) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.id() == id)
    }

    /// A debounced build survived: resolve its target and supersede
    /// whatever is running.
    fn dispatch(&mut self, stats: &BuildStats) -> CoreStep {
        let Some(script) = (self.settings.script_path_resolver)(stats) else {
            debug!(
                assets = stats.assets.len(),
                "no launch target in build output; nothing to run"
            );
            return CoreStep::continue_with(Vec::new());
        };

        let mut commands = self.supersede();

        let target = LaunchTarget::for_script(
            &self.settings.command,
            &self.settings.command_args,
            &self.settings.spawn_options,
            &script,
        );
        let id = self.next_session;
        self.next_session += 1;

        let session = Session::new(id, self.mode.current(), target.clone(), self.settings.retries);
        info!(
            session = id,
            mode = %session.mode(),
            target = %target,
            "starting script"
        );
        commands.push(CoreCommand::Launch {
            session: id,
            attempt: session.attempt().id,
            target,
        });
        self.session = Some(session);

        CoreStep::continue_with(commands)
    }

    /// Tear down the current session: kill its process and disarm its
    /// timers.
    fn supersede(&mut self) -> Vec<CoreCommand> {
        let mut commands = Vec::new();
        if let Some(old) = self.session.take() {
            if old.has_live_process() {
                info!(session = old.id(), "stopping script superseded by a newer build");
                commands.push(CoreCommand::Kill { session: old.id() });
            }
            commands.push(CoreCommand::DisarmTimer(TimerKind::MinUpTime));
            commands.push(CoreCommand::DisarmTimer(TimerKind::RetryDelay));
        }
        commands
    }

    fn handle_started(&mut self, session: SessionId, attempt: AttemptId) -> CoreStep {
        let min_up_time = self.settings.min_up_time;
        let Some(s) = self.current_session(session) else {
            debug!(session, attempt, "start notification from superseded session");
            return CoreStep::continue_with(Vec::new());
        };
        if !s.on_started(attempt) {
            return CoreStep::continue_with(Vec::new());
        }

        debug!(session, attempt, "script started; minimum uptime timer armed");
        CoreStep::continue_with(vec![CoreCommand::ArmTimer {
            kind: TimerKind::MinUpTime,
            after: min_up_time,
            event: RuntimeEvent::MinUpTimeReached { session, attempt },
        }])
    }

    fn handle_min_up_time(&mut self, session: SessionId, attempt: AttemptId) -> CoreStep {
        if let Some(s) = self.current_session(session) {
            if s.on_min_up_time(attempt) {
                info!(
                    session,
                    attempt,
                    budget = s.budget().remaining(),
                    "script reached minimum uptime; retry budget reset"
                );
            }
        }
        CoreStep::continue_with(Vec::new())
    }

    fn handle_exit(&mut self, session: SessionId, attempt: AttemptId, code: ExitCode) -> CoreStep {
        let retry_delay = self.settings.retry_delay;
        let Some(s) = self.current_session(session) else {
            debug!(session, attempt, code, "exit notification from superseded session");
            return CoreStep::continue_with(Vec::new());
        };
        let Some(decision) = s.on_exit(attempt, code, retry_delay) else {
            return CoreStep::continue_with(Vec::new());
        };

        let budget = s.budget().remaining();
        let uptime_ms = s.attempt().uptime().map(|d| d.as_millis() as u64);
        if code == 0 {
            info!(session, attempt, ?uptime_ms, "script exited cleanly");
        } else {
            warn!(session, attempt, exit_code = code, budget, ?uptime_ms, "script exited with error");
        }

        let mut commands = vec![CoreCommand::DisarmTimer(TimerKind::MinUpTime)];
        let mut keep_running = true;

        match decision {
            Decision::Retry { after } => {
                info!(
                    session,
                    attempt,
                    budget,
                    delay_ms = after.as_millis() as u64,
                    "retrying script after delay"
                );
                commands.push(CoreCommand::ArmTimer {
                    kind: TimerKind::RetryDelay,
                    after,
                    event: RuntimeEvent::RetryDelayElapsed { session },
                });
            }
            Decision::Propagate(code) => {
                info!(session, exit_code = code, "run mode: exiting with script's exit code");
                commands.push(CoreCommand::ExitHost(code));
                keep_running = false;
            }
            Decision::Idle(IdleReason::Exhausted) => {
                error!(
                    session,
                    attempts = attempt,
                    "script failed to stay up; giving up until the next build"
                );
            }
            Decision::Idle(IdleReason::CleanExit) => {
                debug!(session, "waiting for the next build");
            }
        }

        CoreStep {
            commands,
            keep_running,
        }
    }

    fn handle_retry_elapsed(&mut self, session: SessionId) -> CoreStep {
        let Some(s) = self.current_session(session) else {
            return CoreStep::continue_with(Vec::new());
        };
        let Some(attempt) = s.begin_retry() else {
            return CoreStep::continue_with(Vec::new());
        };

        info!(
            session,
            attempt,
            retry = attempt - 1,
            "retrying to start script"
        );
        CoreStep::continue_with(vec![CoreCommand::Launch {
            session,
            attempt,
            target: s.target().clone(),
        }])
    }

    fn handle_shutdown(&mut self) -> CoreStep {
        let mut commands = self.supersede();
        commands.push(CoreCommand::DisarmTimer(TimerKind::Debounce));
        CoreStep {
            commands,
            keep_running: false,
        }
    }
}
