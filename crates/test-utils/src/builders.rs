#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use launchdog::build::BuildStats;
use launchdog::config::Settings;
use launchdog::types::{KillSignal, StdioMode};

/// Builder for `Settings` with timings short enough for tests.
///
/// Defaults: 3 retries, 10ms retry delay, 20ms debounce and a minimum uptime
/// of 10s, so nothing reaches the uptime threshold unless a test asks for it.
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings {
                retries: 3,
                retry_delay: Duration::from_millis(10),
                min_up_time: Duration::from_secs(10),
                compilation_debounce: Duration::from_millis(20),
                ..Settings::default()
            },
        }
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.settings.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.settings.retry_delay = delay;
        self
    }

    pub fn min_up_time(mut self, min_up_time: Duration) -> Self {
        self.settings.min_up_time = min_up_time;
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.settings.compilation_debounce = window;
        self
    }

    pub fn command(mut self, command: &str) -> Self {
        self.settings.command = command.to_string();
        self
    }

    pub fn command_args(mut self, args: &[&str]) -> Self {
        self.settings.command_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn stdio(mut self, stdio: StdioMode) -> Self {
        self.settings.spawn_options.stdio = stdio;
        self
    }

    pub fn kill_signal(mut self, signal: KillSignal) -> Self {
        self.settings.kill_signal = signal;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build output with one script `name` emitted into `dir`, plus its source
/// map.
pub fn script_stats(dir: impl AsRef<Path>, name: &str) -> BuildStats {
    let dir = dir.as_ref();
    BuildStats::new()
        .with_asset(name, Some(dir.join(name)))
        .with_asset(format!("{name}.map"), Some(dir.join(format!("{name}.map"))))
}

