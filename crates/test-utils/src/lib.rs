pub mod builders;
pub mod fake_spawner;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

use launchdog::config::Settings;
use launchdog::engine::{CoreRuntime, RunOutcome, Runtime, RuntimeEvent};
use launchdog::exec::ProcessSpawner;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// A runtime running on a background task, plus the sender feeding it.
pub struct RuntimeHarness {
    pub tx: mpsc::Sender<RuntimeEvent>,
    pub handle: JoinHandle<launchdog::errors::Result<RunOutcome>>,
}

impl RuntimeHarness {
    /// Start a runtime for `settings` on top of `spawner`.
    pub fn start<S: ProcessSpawner + 'static>(settings: Settings, spawner: S) -> Self {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let runtime = Runtime::new(CoreRuntime::new(settings), tx.clone(), rx, spawner);
        let handle = tokio::spawn(runtime.run());
        Self { tx, handle }
    }

    pub async fn send(&self, event: RuntimeEvent) {
        self.tx
            .send(event)
            .await
            .expect("runtime should still be receiving events");
    }

    /// Wait for the runtime loop to end and return its outcome.
    pub async fn finish(self) -> RunOutcome {
        with_timeout(self.handle)
            .await
            .expect("runtime task panicked")
            .expect("runtime returned an error")
    }

    /// Request a graceful shutdown and wait for the loop to end.
    pub async fn shutdown(self) -> RunOutcome {
        // The loop may already be gone (e.g. after ExitHost).
        let _ = self.tx.send(RuntimeEvent::ShutdownRequested).await;
        self.finish().await
    }
}
