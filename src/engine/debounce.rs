// src/engine/debounce.rs

//! Trailing-edge debounce for build-ready notifications.
//!
//! Every notification replaces the pending one and restarts the window; only
//! the last notification of a burst is released. Windows are tagged with a
//! generation so that a timer from a restarted window is recognised as stale.

use std::time::Duration;

use tracing::{debug, trace};

use crate::build::BuildStats;
use crate::engine::{CoreCommand, RuntimeEvent, TimerKind};

/// Where the pipeline is between notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing received yet.
    Idle,
    /// A notification is pending; the window is open.
    Debouncing,
    /// The last window closed and its notification was handed on.
    Dispatched,
}

#[derive(Debug)]
pub struct DebouncePipeline {
    window: Duration,
    generation: u64,
    pending: Option<BuildStats>,
    state: PipelineState,
}

impl DebouncePipeline {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: 0,
            pending: None,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Accept a notification and (re)open the window.
    ///
    /// Returns the timer command the shell must execute; arming a
    /// `Debounce` timer replaces the previous one.
    pub fn offer(&mut self, stats: BuildStats) -> CoreCommand {
        if self.pending.is_some() {
            trace!(generation = self.generation, "discarding superseded build notification");
        }
        self.generation += 1;
        self.pending = Some(stats);
        self.state = PipelineState::Debouncing;

        debug!(
            generation = self.generation,
            window_ms = self.window.as_millis() as u64,
            "build notification received; debounce window (re)started"
        );

        CoreCommand::ArmTimer {
            kind: TimerKind::Debounce,
            after: self.window,
            event: RuntimeEvent::DebounceElapsed {
                generation: self.generation,
            },
        }
    }

    /// Close the window for `generation`.
    ///
    /// Returns the surviving notification, or `None` if the window was
    /// restarted since (stale timer) or nothing is pending.
    pub fn elapsed(&mut self, generation: u64) -> Option<BuildStats> {
        if generation != self.generation {
            trace!(
                generation,
                current = self.generation,
                "ignoring stale debounce timer"
            );
            return None;
        }
        let stats = self.pending.take()?;
        self.state = PipelineState::Dispatched;
        Some(stats)
    }
}
