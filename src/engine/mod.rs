// src/engine/mod.rs

//! Supervision engine for launchdog.
//!
//! This module ties together:
//! - the mode tracker (one-shot run vs watch)
//! - the debounce/dispatch pipeline for build-ready notifications
//! - the retry/backoff engine deciding what happens when a script exits
//! - the runtime event loop that reacts to:
//!   - build-ready notifications
//!   - process start/exit notifications
//!   - timer expiries
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

use crate::build::{BuildStats, LaunchTarget};
use crate::types::{ExitCode, Mode};

/// Identifies one supervised session (one build-ready dispatch).
pub type SessionId = u64;

/// Identifies one spawn-and-wait cycle inside a session, starting at 1.
pub type AttemptId = u32;

/// Events flowing into the runtime from the host, launcher and timers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// The host started a one-shot build or a watch.
    ModeEntered(Mode),
    /// The host finished a build.
    BuildFinished(BuildStats),
    /// The debounce window opened by generation `generation` closed.
    DebounceElapsed { generation: u64 },
    /// The process for this attempt was spawned.
    ProcessStarted {
        session: SessionId,
        attempt: AttemptId,
    },
    /// The process for this attempt exited (or failed to spawn).
    ProcessExited {
        session: SessionId,
        attempt: AttemptId,
        code: ExitCode,
    },
    /// The attempt stayed up for the configured minimum uptime.
    MinUpTimeReached {
        session: SessionId,
        attempt: AttemptId,
    },
    /// The retry delay of this session elapsed.
    RetryDelayElapsed { session: SessionId },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// The timers the core can arm. At most one of each kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Debounce,
    MinUpTime,
    RetryDelay,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Spawn the target for this attempt.
    Launch {
        session: SessionId,
        attempt: AttemptId,
        target: LaunchTarget,
    },
    /// Send the kill signal to the session's live process, if any.
    Kill { session: SessionId },
    /// Deliver `event` after `after`, replacing any live timer of `kind`.
    ArmTimer {
        kind: TimerKind,
        after: Duration,
        event: RuntimeEvent,
    },
    /// Cancel the live timer of `kind`, if any.
    DisarmTimer(TimerKind),
    /// Terminate the host with this exit code.
    ExitHost(ExitCode),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

pub mod core;
pub mod debounce;
pub mod mode;
pub mod retry;
pub mod runtime;
pub mod timers;

pub use self::core::CoreRuntime;
pub use debounce::{DebouncePipeline, PipelineState};
pub use mode::ModeTracker;
pub use retry::{Decision, IdleReason, RetryBudget, Session, SessionState};
pub use runtime::{RunOutcome, Runtime};
pub use timers::TimerSet;
