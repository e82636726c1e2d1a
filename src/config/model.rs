// src/config/model.rs

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::build::{first_matching_asset, ScriptPathResolver, SpawnOptions, DEFAULT_ASSET_PATTERN};
use crate::types::{KillSignal, StdioMode};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// retries = 3
/// retry_delay = 1          # seconds
/// min_up_time = 10         # seconds
/// compilation_debounce = 300  # milliseconds
/// kill_signal = "SIGTERM"
/// command = "node"
/// command_args = ["--inspect"]
/// asset_pattern = "\\.js$"
/// output_dir = "dist"
///
/// [spawn_options]
/// stdio = "inherit"
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Failed starts tolerated before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Seconds to wait before restarting a crashed script.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,

    /// Seconds the script has to stay up to reset the retry budget.
    #[serde(default = "default_min_up_time")]
    pub min_up_time: f64,

    /// Debounce window for build-ready notifications, in milliseconds.
    #[serde(default = "default_compilation_debounce")]
    pub compilation_debounce: u64,

    #[serde(default = "default_kill_signal")]
    pub kill_signal: String,

    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the resolved script path.
    #[serde(default)]
    pub command_args: Vec<String>,

    /// Regex the default resolver matches against artifact names.
    #[serde(default = "default_asset_pattern")]
    pub asset_pattern: String,

    /// Directory the CLI watches for build output.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub spawn_options: RawSpawnOptions,
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_min_up_time() -> f64 {
    10.0
}

fn default_compilation_debounce() -> u64 {
    300
}

fn default_kill_signal() -> String {
    "SIGTERM".to_string()
}

fn default_command() -> String {
    "node".to_string()
}

fn default_asset_pattern() -> String {
    DEFAULT_ASSET_PATTERN.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            min_up_time: default_min_up_time(),
            compilation_debounce: default_compilation_debounce(),
            kill_signal: default_kill_signal(),
            command: default_command(),
            command_args: Vec::new(),
            asset_pattern: default_asset_pattern(),
            output_dir: default_output_dir(),
            spawn_options: RawSpawnOptions::default(),
        }
    }
}

/// `[spawn_options]` section. Unset keys keep the inherited-stdio default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSpawnOptions {
    #[serde(default)]
    pub stdio: StdioMode,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub retries: u32,
    pub retry_delay: Duration,
    pub min_up_time: Duration,
    pub compilation_debounce: Duration,
    pub kill_signal: KillSignal,
    pub command: String,
    pub command_args: Vec<String>,
    pub asset_pattern: Regex,
    pub output_dir: PathBuf,
    pub spawn_options: SpawnOptions,
}

impl ConfigFile {
    /// Runtime settings for the supervisor core, using the default resolver
    /// built from `asset_pattern`.
    pub fn settings(&self) -> Settings {
        Settings {
            retries: self.retries,
            retry_delay: self.retry_delay,
            min_up_time: self.min_up_time,
            compilation_debounce: self.compilation_debounce,
            kill_signal: self.kill_signal,
            command: self.command.clone(),
            command_args: self.command_args.clone(),
            spawn_options: self.spawn_options.clone(),
            script_path_resolver: first_matching_asset(self.asset_pattern.clone()),
        }
    }
}

/// Immutable settings the supervisor is constructed with.
#[derive(Clone)]
pub struct Settings {
    pub retries: u32,
    pub retry_delay: Duration,
    pub min_up_time: Duration,
    pub compilation_debounce: Duration,
    pub kill_signal: KillSignal,
    pub command: String,
    pub command_args: Vec<String>,
    pub spawn_options: SpawnOptions,
    pub script_path_resolver: ScriptPathResolver,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay: Duration::from_secs_f64(default_retry_delay()),
            min_up_time: Duration::from_secs_f64(default_min_up_time()),
            compilation_debounce: Duration::from_millis(default_compilation_debounce()),
            kill_signal: KillSignal::default(),
            command: default_command(),
            command_args: Vec::new(),
            spawn_options: SpawnOptions::default(),
            script_path_resolver: crate::build::default_resolver(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("min_up_time", &self.min_up_time)
            .field("compilation_debounce", &self.compilation_debounce)
            .field("kill_signal", &self.kill_signal)
            .field("command", &self.command)
            .field("command_args", &self.command_args)
            .field("spawn_options", &self.spawn_options)
            .finish_non_exhaustive()
    }
}
