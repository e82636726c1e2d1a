#![cfg(unix)]

mod common;
use crate::common::{init_tracing, settle, TestResult};

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use launchdog::cli::CliArgs;
use launchdog::engine::RuntimeEvent;
use launchdog::exec::TokioSpawner;
use launchdog::types::{Mode, StdioMode};
use launchdog_test_utils::builders::{script_stats, SettingsBuilder};
use launchdog_test_utils::RuntimeHarness;

fn once_args(config: &Path) -> CliArgs {
    CliArgs {
        config: Some(config.to_path_buf()),
        once: true,
        out_dir: None,
        log_level: None,
        dry_run: false,
    }
}

/// A project dir with `dist/app.js` containing `script` and a config running
/// it with `sh`.
fn sh_project(script: &str) -> std::io::Result<(TempDir, std::path::PathBuf)> {
    let dir = TempDir::new()?;
    let dist = dir.path().join("dist");
    fs::create_dir(&dist)?;
    fs::write(dist.join("app.js"), script)?;

    let config = dir.path().join("launchdog.toml");
    fs::write(
        &config,
        format!(
            "command = \"sh\"\noutput_dir = {:?}\n\n[spawn_options]\nstdio = \"null\"\n",
            dist.to_string_lossy()
        ),
    )?;
    Ok((dir, config))
}

fn count_lines(path: &Path) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn count_matching(path: &Path, line: &str) -> usize {
    fs::read_to_string(path)
        .map(|s| s.lines().filter(|l| *l == line).count())
        .unwrap_or(0)
}

#[tokio::test]
async fn once_mode_exits_with_the_script_exit_code() -> TestResult {
    init_tracing();

    let (_dir, config) = sh_project("exit 3\n")?;
    let outcome = tokio::time::timeout(Duration::from_secs(10), launchdog::run(once_args(&config)))
        .await??;
    assert_eq!(outcome.exit_code, Some(3));
    Ok(())
}

#[tokio::test]
async fn once_mode_without_script_is_an_error() -> TestResult {
    init_tracing();

    let (dir, config) = sh_project("exit 0\n")?;
    fs::remove_file(dir.path().join("dist").join("app.js"))?;
    fs::write(dir.path().join("dist").join("index.html"), "")?;

    let result = launchdog::run(once_args(&config)).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn dry_run_starts_nothing() -> TestResult {
    init_tracing();

    let (dir, config) = sh_project("echo ran >> \"$0.log\"\n")?;
    let mut args = once_args(&config);
    args.dry_run = true;

    let outcome = launchdog::run(args).await?;
    assert_eq!(outcome.exit_code, None);
    assert!(!dir.path().join("dist").join("app.js.log").exists());
    Ok(())
}

#[tokio::test]
async fn crashing_script_is_restarted_until_budget_runs_out() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let script = dir.path().join("crash.js");
    fs::write(&script, "echo start >> \"$0.log\"\nexit 1\n")?;

    let settings = SettingsBuilder::new()
        .command("sh")
        .stdio(StdioMode::Null)
        .retries(1)
        .build();
    let rt = RuntimeHarness::start(settings, TokioSpawner);
    rt.send(RuntimeEvent::ModeEntered(Mode::Watch)).await;
    rt.send(RuntimeEvent::BuildFinished(script_stats(dir.path(), "crash.js")))
        .await;

    settle(1000).await;
    assert_eq!(count_lines(&dir.path().join("crash.js.log")), 2);

    rt.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn superseded_script_receives_sigterm() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let script = dir.path().join("server.js");
    fs::write(
        &script,
        "trap 'echo term >> \"$0.log\"; exit 0' TERM\necho start >> \"$0.log\"\nwhile true; do sleep 0.05; done\n",
    )?;
    let log = dir.path().join("server.js.log");

    let settings = SettingsBuilder::new()
        .command("sh")
        .stdio(StdioMode::Null)
        .build();
    let rt = RuntimeHarness::start(settings, TokioSpawner);
    rt.send(RuntimeEvent::ModeEntered(Mode::Watch)).await;
    rt.send(RuntimeEvent::BuildFinished(script_stats(dir.path(), "server.js")))
        .await;
    settle(400).await;
    assert_eq!(count_lines(&log), 1);

    rt.send(RuntimeEvent::BuildFinished(script_stats(dir.path(), "server.js")))
        .await;
    settle(600).await;

    // The replacement may start before the old trap has run.
    assert_eq!(count_matching(&log, "start"), 2);
    assert_eq!(count_matching(&log, "term"), 1);

    rt.shutdown().await;
    settle(300).await;
    assert_eq!(count_matching(&log, "term"), 2);
    Ok(())
}
