// src/config/validate.rs

use std::time::Duration;

use regex::Regex;

use crate::build::SpawnOptions;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LaunchdogError, Result};
use crate::types::KillSignal;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LaunchdogError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let retry_delay = seconds("retry_delay", raw.retry_delay)?;
        let min_up_time = seconds("min_up_time", raw.min_up_time)?;
        let kill_signal = raw
            .kill_signal
            .parse::<KillSignal>()
            .map_err(LaunchdogError::ConfigError)?;
        validate_command(&raw.command)?;
        let asset_pattern = Regex::new(&raw.asset_pattern).map_err(|e| {
            LaunchdogError::ConfigError(format!(
                "asset_pattern '{}' is not a valid regex: {e}",
                raw.asset_pattern
            ))
        })?;

        Ok(ConfigFile {
            retries: raw.retries,
            retry_delay,
            min_up_time,
            compilation_debounce: Duration::from_millis(raw.compilation_debounce),
            kill_signal,
            command: raw.command,
            command_args: raw.command_args,
            asset_pattern,
            output_dir: raw.output_dir,
            spawn_options: SpawnOptions {
                stdio: raw.spawn_options.stdio,
                cwd: raw.spawn_options.cwd,
                env: raw.spawn_options.env,
            },
        })
    }
}

/// Convert a non-negative, finite number of seconds into a `Duration`.
fn seconds(key: &str, value: f64) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        return Err(LaunchdogError::ConfigError(format!(
            "{key} must be a non-negative number of seconds (got {value})"
        )));
    }
    Duration::try_from_secs_f64(value).map_err(|e| {
        LaunchdogError::ConfigError(format!("{key} is out of range ({value}): {e}"))
    })
}

fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(LaunchdogError::ConfigError(
            "command must not be empty".to_string(),
        ));
    }
    Ok(())
}
