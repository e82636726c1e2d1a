// src/engine/timers.rs

//! Cancellable one-shot timers owned by the runtime shell.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::engine::{RuntimeEvent, TimerKind};

/// At most one live timer per [`TimerKind`].
///
/// A timer sleeps, then sends its event into the runtime channel. Arming a
/// kind that is already live aborts the old timer first. An aborted timer may
/// already have queued its event; the core drops such events by id.
#[derive(Debug)]
pub struct TimerSet {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    live: HashMap<TimerKind, JoinHandle<()>>,
}

impl TimerSet {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            live: HashMap::new(),
        }
    }

    pub fn arm(&mut self, kind: TimerKind, after: Duration, event: RuntimeEvent) {
        self.disarm(kind);

        trace!(?kind, after_ms = after.as_millis() as u64, "arming timer");
        let tx = self.runtime_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if tx.send(event).await.is_err() {
                debug!(?kind, "runtime channel closed before timer fired");
            }
        });
        self.live.insert(kind, handle);
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        if let Some(handle) = self.live.remove(&kind) {
            handle.abort();
        }
    }

    pub fn disarm_all(&mut self) {
        for (_, handle) in self.live.drain() {
            handle.abort();
        }
    }

    /// Whether a timer of `kind` is armed and has not fired yet.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.live.get(&kind).is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.disarm_all();
    }
}
