use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Exit code reported for a supervised process.
///
/// Spawn failures and deaths by signal (no numeric status) are reported as
/// [`FAILED_WITHOUT_CODE`].
pub type ExitCode = i32;

/// Exit code used when a process could not be spawned or left no status.
pub const FAILED_WITHOUT_CODE: ExitCode = -1;

/// Whether the host runs a single build or rebuilds continuously.
///
/// - `Run`: one-shot. The supervised script's exit code becomes the host's.
/// - `Watch`: failures are retried or idled, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Run,
    Watch,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Run => f.write_str("run"),
            Mode::Watch => f.write_str("watch"),
        }
    }
}

/// How the supervised process's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Share the host's stdin/stdout/stderr.
    #[default]
    Inherit,
    /// Discard all output.
    Null,
    /// Capture stdout/stderr and forward each line into the log.
    Piped,
}

/// Signal sent to a supervised process when it is superseded or the host
/// shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KillSignal {
    #[default]
    Term,
    Kill,
    Int,
    Hup,
    Quit,
    Usr1,
    Usr2,
}

impl KillSignal {
    /// Canonical `SIG*` name.
    pub fn name(self) -> &'static str {
        match self {
            KillSignal::Term => "SIGTERM",
            KillSignal::Kill => "SIGKILL",
            KillSignal::Int => "SIGINT",
            KillSignal::Hup => "SIGHUP",
            KillSignal::Quit => "SIGQUIT",
            KillSignal::Usr1 => "SIGUSR1",
            KillSignal::Usr2 => "SIGUSR2",
        }
    }
}

impl fmt::Display for KillSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KillSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "TERM" => Ok(KillSignal::Term),
            "KILL" => Ok(KillSignal::Kill),
            "INT" => Ok(KillSignal::Int),
            "HUP" => Ok(KillSignal::Hup),
            "QUIT" => Ok(KillSignal::Quit),
            "USR1" => Ok(KillSignal::Usr1),
            "USR2" => Ok(KillSignal::Usr2),
            _ => Err(format!(
                "invalid kill_signal: {s} (expected one of SIGTERM, SIGKILL, SIGINT, SIGHUP, SIGQUIT, SIGUSR1, SIGUSR2)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_signal_accepts_prefixed_and_bare_names() {
        assert_eq!("SIGTERM".parse::<KillSignal>(), Ok(KillSignal::Term));
        assert_eq!("kill".parse::<KillSignal>(), Ok(KillSignal::Kill));
        assert_eq!(" sigusr2 ".parse::<KillSignal>(), Ok(KillSignal::Usr2));
    }

    #[test]
    fn kill_signal_rejects_unknown_names() {
        let err = "SIGWHATEVER".parse::<KillSignal>().unwrap_err();
        assert!(err.contains("SIGWHATEVER"));
    }

    #[test]
    fn mode_defaults_to_run() {
        assert_eq!(Mode::default(), Mode::Run);
    }
}
