// src/engine/retry.rs

//! Retry/backoff engine.
//!
//! A [`Session`] tracks one supervised run: the target it launches, the mode
//! captured when it was created, the retry budget and the current attempt.
//! It consumes start/uptime/exit notifications and answers, on every exit,
//! with a [`Decision`]:
//!
//! - exit code 0 ends the session (propagated in run mode, idle in watch);
//! - run mode propagates any nonzero code straight away;
//! - watch mode retries after the delay while the budget is `>= 0`, and
//!   goes idle once it drops below zero.
//!
//! The budget is consumed only by attempts that exit nonzero before reaching
//! the minimum uptime, and restored to the configured value whenever an
//! attempt reaches it.

use std::time::{Duration, Instant};

use crate::build::LaunchTarget;
use crate::engine::{AttemptId, SessionId};
use crate::types::{ExitCode, Mode};

/// Remaining tolerated unhealthy exits for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    configured: u32,
    remaining: i64,
}

impl RetryBudget {
    pub fn new(retries: u32) -> Self {
        Self {
            configured: retries,
            remaining: i64::from(retries),
        }
    }

    pub fn configured(&self) -> u32 {
        self.configured
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Back to the full configured allowance.
    pub fn reset(&mut self) {
        self.remaining = i64::from(self.configured);
    }

    /// Charge one unhealthy exit; returns what is left.
    pub fn consume(&mut self) -> i64 {
        self.remaining -= 1;
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining < 0
    }
}

/// Why a watch-mode session stopped launching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// The script exited with code 0.
    CleanExit,
    /// More unhealthy exits than the budget allows.
    Exhausted,
}

/// What the engine wants done after an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Relaunch the same target after `after`.
    Retry { after: Duration },
    /// Terminate the host with this code (run mode only).
    Propagate(ExitCode),
    /// Stop launching until the next build (watch mode only).
    Idle(IdleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Launch requested; no start notification yet.
    Starting,
    /// Process is up. `healthy` once minimum uptime was reached.
    Running { healthy: bool },
    /// Waiting out the retry delay.
    RetryPending,
    /// Watch mode: nothing more to do until superseded.
    Idle(IdleReason),
    /// Run mode: the host was told to exit with this code.
    Terminated(ExitCode),
}

/// One spawn-and-wait cycle.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: AttemptId,
    pub started_at: Option<Instant>,
    pub exit_code: Option<ExitCode>,
    pub reached_min_up_time: bool,
}

impl Attempt {
    fn new(id: AttemptId) -> Self {
        Self {
            id,
            started_at: None,
            exit_code: None,
            reached_min_up_time: false,
        }
    }

    /// Time since the process started, if it did.
    pub fn uptime(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    mode: Mode,
    target: LaunchTarget,
    budget: RetryBudget,
    attempt: Attempt,
    state: SessionState,
}

impl Session {
    /// A fresh session whose first attempt is about to be launched.
    pub fn new(id: SessionId, mode: Mode, target: LaunchTarget, retries: u32) -> Self {
        Self {
            id,
            mode,
            target,
            budget: RetryBudget::new(retries),
            attempt: Attempt::new(1),
            state: SessionState::Starting,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target(&self) -> &LaunchTarget {
        &self.target
    }

    pub fn budget(&self) -> RetryBudget {
        self.budget
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a process may still be alive for this session.
    pub fn has_live_process(&self) -> bool {
        matches!(
            self.state,
            SessionState::Starting | SessionState::Running { .. }
        )
    }

    fn is_current(&self, attempt: AttemptId) -> bool {
        attempt == self.attempt.id
    }

    /// Start notification. Returns `false` if it does not belong to the
    /// current attempt.
    pub fn on_started(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) || self.state != SessionState::Starting {
            return false;
        }
        self.attempt.started_at = Some(Instant::now());
        self.state = SessionState::Running { healthy: false };
        true
    }

    /// Minimum uptime reached: the run counts as healthy and the budget is
    /// restored.
    pub fn on_min_up_time(&mut self, attempt: AttemptId) -> bool {
        if !self.is_current(attempt) || self.state != (SessionState::Running { healthy: false }) {
            return false;
        }
        self.attempt.reached_min_up_time = true;
        self.budget.reset();
        self.state = SessionState::Running { healthy: true };
        true
    }

    /// Exit notification (spawn failures included).
    ///
    /// Returns `None` for notifications that do not belong to the live
    /// attempt.
    pub fn on_exit(
        &mut self,
        attempt: AttemptId,
        code: ExitCode,
        retry_delay: Duration,
    ) -> Option<Decision> {
        if !self.is_current(attempt) || !self.has_live_process() {
            return None;
        }

        let healthy = self.state == SessionState::Running { healthy: true };
        self.attempt.exit_code = Some(code);

        if code == 0 {
            return Some(match self.mode {
                Mode::Run => {
                    self.state = SessionState::Terminated(0);
                    Decision::Propagate(0)
                }
                Mode::Watch => {
                    self.state = SessionState::Idle(IdleReason::CleanExit);
                    Decision::Idle(IdleReason::CleanExit)
                }
            });
        }

        if !healthy {
            self.budget.consume();
        }

        Some(match self.mode {
            Mode::Run => {
                self.state = SessionState::Terminated(code);
                Decision::Propagate(code)
            }
            Mode::Watch if self.budget.is_exhausted() => {
                self.state = SessionState::Idle(IdleReason::Exhausted);
                Decision::Idle(IdleReason::Exhausted)
            }
            Mode::Watch => {
                self.state = SessionState::RetryPending;
                Decision::Retry { after: retry_delay }
            }
        })
    }

    /// Leave the retry delay and open the next attempt.
    ///
    /// Returns the new attempt id, or `None` if no retry was pending.
    pub fn begin_retry(&mut self) -> Option<AttemptId> {
        if self.state != SessionState::RetryPending {
            return None;
        }
        self.attempt = Attempt::new(self.attempt.id + 1);
        self.state = SessionState::Starting;
        Some(self.attempt.id)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::build::SpawnOptions;

    const DELAY: Duration = Duration::from_secs(1);

    fn session(mode: Mode, retries: u32) -> Session {
        let target = LaunchTarget::for_script(
            "node",
            &[],
            &SpawnOptions::default(),
            Path::new("/dir/test.bundle.js"),
        );
        Session::new(1, mode, target, retries)
    }

    /// Start the current attempt and let it exit with `code` before minimum
    /// uptime.
    fn crash(s: &mut Session, code: ExitCode) -> Option<Decision> {
        let attempt = s.attempt().id;
        assert!(s.on_started(attempt));
        s.on_exit(attempt, code, DELAY)
    }

    #[test]
    fn budget_allows_retries_plus_one_failures_before_exhaustion() {
        let mut b = RetryBudget::new(3);
        assert_eq!(b.consume(), 2);
        assert_eq!(b.consume(), 1);
        assert_eq!(b.consume(), 0);
        assert!(!b.is_exhausted());
        assert_eq!(b.consume(), -1);
        assert!(b.is_exhausted());
        b.reset();
        assert_eq!(b.remaining(), 3);
    }

    #[test]
    fn watch_mode_retries_until_budget_is_exhausted() {
        let mut s = session(Mode::Watch, 1);

        assert_eq!(crash(&mut s, 1), Some(Decision::Retry { after: DELAY }));
        assert_eq!(s.state(), SessionState::RetryPending);
        assert_eq!(s.begin_retry(), Some(2));

        assert_eq!(crash(&mut s, 1), Some(Decision::Idle(IdleReason::Exhausted)));
        assert_eq!(s.state(), SessionState::Idle(IdleReason::Exhausted));
        assert_eq!(s.begin_retry(), None);
        assert!(!s.has_live_process());
    }

    #[test]
    fn run_mode_propagates_first_failure_without_retry() {
        let mut s = session(Mode::Run, 3);
        assert_eq!(crash(&mut s, 1), Some(Decision::Propagate(1)));
        assert_eq!(s.state(), SessionState::Terminated(1));
    }

    #[test]
    fn clean_exit_ends_session_in_both_modes() {
        let mut run = session(Mode::Run, 3);
        assert_eq!(crash(&mut run, 0), Some(Decision::Propagate(0)));

        let mut watch = session(Mode::Watch, 3);
        assert_eq!(crash(&mut watch, 0), Some(Decision::Idle(IdleReason::CleanExit)));
        assert_eq!(watch.budget().remaining(), 3, "code 0 never charges the budget");
    }

    #[test]
    fn reaching_min_up_time_restores_budget() {
        let mut s = session(Mode::Watch, 2);
        assert_eq!(crash(&mut s, 1), Some(Decision::Retry { after: DELAY }));
        assert_eq!(s.budget().remaining(), 1);

        let attempt = s.begin_retry().unwrap();
        assert!(s.on_started(attempt));
        assert!(s.on_min_up_time(attempt));
        assert_eq!(s.budget().remaining(), 2);
        assert!(s.attempt().reached_min_up_time);

        // A crash after minimum uptime keeps the full allowance.
        assert_eq!(s.on_exit(attempt, 1, DELAY), Some(Decision::Retry { after: DELAY }));
        assert_eq!(s.budget().remaining(), 2);
    }

    #[test]
    fn spawn_failure_counts_like_a_crash() {
        let mut s = session(Mode::Watch, 0);
        // No start notification: the spawn itself failed.
        assert_eq!(
            s.on_exit(1, crate::types::FAILED_WITHOUT_CODE, DELAY),
            Some(Decision::Idle(IdleReason::Exhausted))
        );
    }

    #[test]
    fn notifications_for_other_attempts_are_ignored() {
        let mut s = session(Mode::Watch, 3);
        assert!(!s.on_started(2));
        assert!(s.on_started(1));
        assert!(!s.on_min_up_time(7));
        assert_eq!(s.on_exit(2, 1, DELAY), None);
        assert_eq!(s.state(), SessionState::Running { healthy: false });
    }

    #[test]
    fn exit_is_only_decided_once() {
        let mut s = session(Mode::Run, 3);
        assert_eq!(crash(&mut s, 4), Some(Decision::Propagate(4)));
        assert_eq!(s.on_exit(1, 5, DELAY), None);
    }
}
