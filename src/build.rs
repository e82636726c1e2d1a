// src/build.rs

//! Build output metadata and launch-target resolution.
//!
//! A build-ready notification carries a [`BuildStats`]: the emitted artifacts
//! by name, each with the path it was written to (if any). A
//! [`ScriptPathResolver`] picks the script to run out of it, and
//! [`LaunchTarget`] combines that script with the configured command.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::types::StdioMode;

/// Artifact metadata delivered with a build-ready notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Artifact name (e.g. `"main.bundle.js"`) -> path it was emitted at.
    pub assets: BTreeMap<String, Option<PathBuf>>,
}

impl BuildStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper, mostly for tests.
    pub fn with_asset(mut self, name: impl Into<String>, emitted_at: Option<PathBuf>) -> Self {
        self.assets.insert(name.into(), emitted_at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Picks the script to launch out of a build result.
///
/// Returning `None` means "nothing to run for this build".
pub type ScriptPathResolver = Arc<dyn Fn(&BuildStats) -> Option<PathBuf> + Send + Sync>;

/// Resolver selecting the first asset (in name order) whose name matches
/// `pattern` and which was actually emitted.
pub fn first_matching_asset(pattern: Regex) -> ScriptPathResolver {
    Arc::new(move |stats: &BuildStats| {
        stats
            .assets
            .iter()
            .filter(|(name, _)| pattern.is_match(name))
            .find_map(|(_, emitted_at)| emitted_at.clone())
    })
}

/// Default asset pattern: any `.js` file.
pub const DEFAULT_ASSET_PATTERN: &str = r"\.js$";

/// The default resolver: first emitted `.js` asset.
pub fn default_resolver() -> ScriptPathResolver {
    match Regex::new(DEFAULT_ASSET_PATTERN) {
        Ok(re) => first_matching_asset(re),
        // The literal above always compiles.
        Err(_) => Arc::new(|_: &BuildStats| None),
    }
}

/// Options passed through to the process spawner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    pub stdio: StdioMode,
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

/// A fully resolved command line for one supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub command: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
}

impl LaunchTarget {
    /// `command [command_args...] <script>`.
    pub fn for_script(
        command: &str,
        command_args: &[String],
        options: &SpawnOptions,
        script: &Path,
    ) -> Self {
        let mut args = command_args.to_vec();
        args.push(script.to_string_lossy().into_owned());
        Self {
            command: command.to_string(),
            args,
            options: options.clone(),
        }
    }
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_stats() -> BuildStats {
        BuildStats::new()
            .with_asset("test.bundle.js", Some(PathBuf::from("/dir/test.bundle.js")))
            .with_asset("test.bundle.js.map", Some(PathBuf::from("/dir/test.bundle.js.map")))
    }

    #[test]
    fn default_resolver_picks_first_js_asset() {
        let resolve = default_resolver();
        assert_eq!(
            resolve(&bundle_stats()),
            Some(PathBuf::from("/dir/test.bundle.js"))
        );
    }

    #[test]
    fn default_resolver_skips_assets_that_were_not_emitted() {
        let stats = BuildStats::new()
            .with_asset("a.js", None)
            .with_asset("b.js", Some(PathBuf::from("/out/b.js")));
        assert_eq!(default_resolver()(&stats), Some(PathBuf::from("/out/b.js")));
    }

    #[test]
    fn default_resolver_misses_without_js_assets() {
        let stats = BuildStats::new().with_asset("styles.css", Some(PathBuf::from("/out/styles.css")));
        assert_eq!(default_resolver()(&stats), None);
        assert_eq!(default_resolver()(&BuildStats::new()), None);
    }

    #[test]
    fn custom_pattern_is_honoured() {
        let resolve = first_matching_asset(Regex::new(r"^server\.mjs$").unwrap());
        let stats = BuildStats::new()
            .with_asset("client.js", Some(PathBuf::from("/out/client.js")))
            .with_asset("server.mjs", Some(PathBuf::from("/out/server.mjs")));
        assert_eq!(resolve(&stats), Some(PathBuf::from("/out/server.mjs")));
    }

    #[test]
    fn launch_target_appends_script_after_command_args() {
        let target = LaunchTarget::for_script(
            "node",
            &["--inspect".to_string()],
            &SpawnOptions::default(),
            Path::new("/dir/test.bundle.js"),
        );
        assert_eq!(target.command, "node");
        assert_eq!(target.args, vec!["--inspect", "/dir/test.bundle.js"]);
        assert_eq!(target.to_string(), "node --inspect /dir/test.bundle.js");
    }
}
