// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::build::{BuildStats, LaunchTarget};
use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile, Settings};
use crate::engine::{CoreRuntime, RunOutcome, Runtime, RuntimeEvent};
use crate::exec::TokioSpawner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::Mode;
use crate::watch::scan_build_stats;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the supervisor core and its runtime shell
/// - the process spawner
/// - the build-output scan and (in watch mode) the watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<RunOutcome> {
    let mut cfg = load_or_default(args.config.as_deref())?;
    if let Some(out_dir) = &args.out_dir {
        cfg.output_dir = out_dir.clone();
    }

    let settings = cfg.settings();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.dry_run {
        print_dry_run(&cfg, &settings, fs.as_ref());
        return Ok(RunOutcome::default());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let mode = if args.once { Mode::Run } else { Mode::Watch };
    emit(&rt_tx, RuntimeEvent::ModeEntered(mode)).await?;

    // Watch mode waits for the first build, which may not have run yet.
    if !args.once {
        ensure_output_dir(&cfg.output_dir)?;
    }

    let initial = scan_build_stats(fs.as_ref(), &cfg.output_dir)
        .with_context(|| format!("scanning build output in {:?}", cfg.output_dir))?;

    if args.once && (settings.script_path_resolver)(&initial).is_none() {
        anyhow::bail!(
            "no launch target in {:?} (asset pattern `{}`)",
            cfg.output_dir,
            cfg.asset_pattern
        );
    }
    if !initial.is_empty() {
        emit(&rt_tx, RuntimeEvent::BuildFinished(initial)).await?;
    }

    // Keep the watcher alive for the lifetime of the runtime.
    let _watcher_handle = if !args.once {
        Some(crate::watch::spawn_build_watcher(
            cfg.output_dir.clone(),
            Arc::clone(&fs),
            rt_tx.clone(),
        )?)
    } else {
        None
    };

    spawn_ctrl_c_handler(rt_tx.clone());

    let core = CoreRuntime::new(settings);
    let runtime = Runtime::new(core, rt_tx, rt_rx, TokioSpawner);
    let outcome = runtime.run().await?;
    Ok(outcome)
}

/// Create the build output directory if the build has not made it yet.
fn ensure_output_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        info!(?dir, "build output directory missing; creating it");
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating build output directory {:?}", dir))?;
    }
    Ok(())
}

/// Queue a host event for the runtime.
async fn emit(
    tx: &mpsc::Sender<RuntimeEvent>,
    event: RuntimeEvent,
) -> crate::errors::Result<()> {
    tx.send(event).await?;
    Ok(())
}

/// Forward the first Ctrl-C to the runtime as a graceful shutdown.
fn spawn_ctrl_c_handler(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received; shutting down");
                let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for Ctrl-C");
            }
        }
    });
}

/// Simple dry-run output: print settings and the target the current build
/// output would launch.
fn print_dry_run(cfg: &ConfigFile, settings: &Settings, fs: &dyn FileSystem) {
    println!("launchdog dry-run");
    println!("  retries = {}", cfg.retries);
    println!("  retry_delay = {:?}", cfg.retry_delay);
    println!("  min_up_time = {:?}", cfg.min_up_time);
    println!("  compilation_debounce = {:?}", cfg.compilation_debounce);
    println!("  kill_signal = {}", cfg.kill_signal);
    println!("  stdio = {:?}", cfg.spawn_options.stdio);
    if let Some(cwd) = &cfg.spawn_options.cwd {
        println!("  cwd = {}", cwd.display());
    }
    println!();

    println!("output_dir: {}", cfg.output_dir.display());
    match resolve_target(settings, fs, &cfg.output_dir) {
        Ok(Some(target)) => println!("  would launch: {target}"),
        Ok(None) => println!("  no asset matches `{}`", cfg.asset_pattern),
        Err(err) => println!("  cannot scan: {err:#}"),
    }

    debug!("dry-run complete (no execution)");
}

fn resolve_target(
    settings: &Settings,
    fs: &dyn FileSystem,
    output_dir: &Path,
) -> Result<Option<LaunchTarget>> {
    let stats: BuildStats = scan_build_stats(fs, output_dir)?;
    Ok((settings.script_path_resolver)(&stats).map(|script| {
        LaunchTarget::for_script(
            &settings.command,
            &settings.command_args,
            &settings.spawn_options,
            &script,
        )
    }))
}
