use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use launchdog::build::SpawnOptions;
use launchdog::errors::{LaunchdogError, Result};
use launchdog::exec::{ProcessHandle, ProcessSpawner};
use launchdog::types::{ExitCode, KillSignal, FAILED_WITHOUT_CODE};

/// One entry of the spawner's ordered history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnEvent {
    /// Process number `index` (0-based, successful spawns only) started.
    Spawned {
        index: usize,
        command: String,
        args: Vec<String>,
        options: SpawnOptions,
    },
    /// A spawn was rejected.
    SpawnFailed { command: String },
    /// Process number `index` received `signal`.
    Killed { index: usize, signal: KillSignal },
}

#[derive(Default)]
struct FakeState {
    log: Vec<SpawnEvent>,
    exits: Vec<Option<oneshot::Sender<ExitCode>>>,
    failures_pending: usize,
}

/// A fake process spawner that:
/// - records every spawn and kill in one ordered log
/// - keeps each "process" running until the test calls [`FakeSpawner::exit`]
/// - can be told to reject upcoming spawns
///
/// Clones share the same state, so keep one clone in the test and hand the
/// other to the runtime.
#[derive(Clone, Default)]
pub struct FakeSpawner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next spawn fail as if the command did not exist.
    pub fn fail_next_spawn(&self) {
        self.state.lock().unwrap().failures_pending += 1;
    }

    /// Let process `index` exit with `code`. Returns `false` if it already
    /// exited or no such process exists.
    pub fn exit(&self, index: usize, code: ExitCode) -> bool {
        let sender = {
            let mut state = self.state.lock().unwrap();
            state.exits.get_mut(index).and_then(Option::take)
        };
        match sender {
            Some(tx) => tx.send(code).is_ok(),
            None => false,
        }
    }

    /// Number of processes successfully spawned so far.
    pub fn spawn_count(&self) -> usize {
        self.state.lock().unwrap().exits.len()
    }

    pub fn log(&self) -> Vec<SpawnEvent> {
        self.state.lock().unwrap().log.clone()
    }

    /// `(command, args)` of every successful spawn, in order.
    pub fn spawned(&self) -> Vec<(String, Vec<String>)> {
        self.log()
            .into_iter()
            .filter_map(|e| match e {
                SpawnEvent::Spawned { command, args, .. } => Some((command, args)),
                _ => None,
            })
            .collect()
    }

    pub fn kill_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|e| matches!(e, SpawnEvent::Killed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|e| matches!(e, SpawnEvent::SpawnFailed { .. }))
            .count()
    }

    /// Poll until at least `n` processes were spawned. Panics after 5s.
    pub async fn wait_for_spawns(&self, n: usize) {
        self.wait_until(|s| s.spawn_count() >= n, &format!("{n} spawns"))
            .await;
    }

    /// Poll until at least `n` kills were recorded. Panics after 5s.
    pub async fn wait_for_kills(&self, n: usize) {
        self.wait_until(|s| s.kill_count() >= n, &format!("{n} kills"))
            .await;
    }

    async fn wait_until(&self, done: impl Fn(&Self) -> bool, what: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !done(self) {
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for {what}; log: {:?}", self.log());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(
        &self,
        command: &str,
        args: &[String],
        options: &SpawnOptions,
    ) -> Result<Box<dyn ProcessHandle>> {
        let mut state = self.state.lock().unwrap();

        if state.failures_pending > 0 {
            state.failures_pending -= 1;
            state.log.push(SpawnEvent::SpawnFailed {
                command: command.to_string(),
            });
            return Err(LaunchdogError::Other(anyhow::anyhow!(
                "fake spawn failure for '{command}'"
            )));
        }

        let index = state.exits.len();
        let (exit_tx, exit_rx) = oneshot::channel();
        state.exits.push(Some(exit_tx));
        state.log.push(SpawnEvent::Spawned {
            index,
            command: command.to_string(),
            args: args.to_vec(),
            options: options.clone(),
        });

        Ok(Box::new(FakeProcess {
            index,
            exit_rx,
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeProcess {
    index: usize,
    exit_rx: oneshot::Receiver<ExitCode>,
    state: Arc<Mutex<FakeState>>,
}

impl ProcessHandle for FakeProcess {
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = ExitCode> + Send + '_>> {
        Box::pin(async move { (&mut self.exit_rx).await.unwrap_or(FAILED_WITHOUT_CODE) })
    }

    fn kill(&mut self, signal: KillSignal) {
        let mut state = self.state.lock().unwrap();
        state.log.push(SpawnEvent::Killed {
            index: self.index,
            signal,
        });
        // A killed process can no longer be told to exit.
        if let Some(slot) = state.exits.get_mut(self.index) {
            slot.take();
        }
    }

    fn id(&self) -> Option<u32> {
        Some(10_000 + self.index as u32)
    }
}
