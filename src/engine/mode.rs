// src/engine/mode.rs

//! Mode tracker: remembers whether the host is doing a one-shot run or a
//! watch.
//!
//! Last write wins. The current mode is copied into each session when it is
//! created, so a later flip never changes the policy of a session already in
//! flight.

use tracing::debug;

use crate::types::Mode;

#[derive(Debug, Default)]
pub struct ModeTracker {
    mode: Mode,
}

impl ModeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_run_mode(&mut self) {
        self.set(Mode::Run);
    }

    pub fn enter_watch_mode(&mut self) {
        self.set(Mode::Watch);
    }

    pub fn set(&mut self, mode: Mode) {
        debug!(from = %self.mode, to = %mode, "mode entered");
        self.mode = mode;
    }

    pub fn current(&self) -> Mode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_mode() {
        assert_eq!(ModeTracker::new().current(), Mode::Run);
    }

    #[test]
    fn last_call_wins() {
        let mut tracker = ModeTracker::new();
        tracker.enter_watch_mode();
        assert_eq!(tracker.current(), Mode::Watch);
        tracker.enter_run_mode();
        assert_eq!(tracker.current(), Mode::Run);
    }
}
