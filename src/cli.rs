// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `launchdog`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "launchdog",
    version,
    about = "Run the script a build emits and keep it alive across rebuilds.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `launchdog.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run the current build output once and exit with the script's exit
    /// code, no watching.
    #[arg(long)]
    pub once: bool,

    /// Build output directory to scan and watch (overrides `output_dir`).
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LAUNCHDOG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the resolved launch target, but
    /// don't start anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_mode_without_config() {
        let args = CliArgs::try_parse_from(["launchdog"]).unwrap();
        assert!(!args.once);
        assert!(!args.dry_run);
        assert!(args.config.is_none());
        assert!(args.out_dir.is_none());
        assert!(args.log_level.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let args = CliArgs::try_parse_from([
            "launchdog",
            "--config",
            "conf/launchdog.toml",
            "--once",
            "--out-dir",
            "build",
            "--log-level",
            "debug",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("conf/launchdog.toml")));
        assert!(args.once);
        assert_eq!(args.out_dir, Some(PathBuf::from("build")));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.dry_run);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(CliArgs::try_parse_from(["launchdog", "--log-level", "loud"]).is_err());
    }
}
