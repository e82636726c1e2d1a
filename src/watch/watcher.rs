// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::scan::scan_build_stats;

/// Handle for the build-output watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `output_dir` recursively and send a
/// `RuntimeEvent::BuildFinished` with a fresh scan after every change.
///
/// Failures of the OS watcher surface as `LaunchdogError::WatchError`.
pub fn spawn_build_watcher(
    output_dir: impl Into<PathBuf>,
    fs: Arc<dyn FileSystem>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let output_dir = output_dir.into();
    let output_dir = fs
        .canonicalize(&output_dir)
        .with_context(|| format!("build output directory {:?} must exist to be watched", output_dir))?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing reliably here, so fallback to stderr.
                    eprintln!("launchdog: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("launchdog: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&output_dir, RecursiveMode::Recursive)?;

    info!("watching build output in {:?}", output_dir);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "build output changed");

            let stats = match scan_build_stats(fs.as_ref(), &output_dir) {
                Ok(stats) => stats,
                Err(err) => {
                    warn!(error = %err, "failed to scan build output");
                    continue;
                }
            };

            if runtime_tx
                .send(RuntimeEvent::BuildFinished(stats))
                .await
                .is_err()
            {
                // Runtime is gone; nothing left to notify.
                break;
            }
        }
        debug!("build watcher loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
