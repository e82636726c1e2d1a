// src/watch/scan.rs

use std::path::Path;

use anyhow::{bail, Result};
use tracing::trace;

use crate::build::BuildStats;
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// List every file below `dir` as an emitted artifact.
///
/// Artifact names are relative to `dir` and `/`-separated
/// (`"server/main.js"`); each maps to the file's full path.
pub fn scan_build_stats(fs: &dyn FileSystem, dir: &Path) -> Result<BuildStats> {
    if !fs.is_dir(dir) {
        bail!("build output directory {:?} does not exist", dir);
    }

    let mut stats = BuildStats::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs.read_dir(&current)? {
            if fs.is_dir(&entry) {
                pending.push(entry);
            } else if fs.is_file(&entry) {
                if let Some(name) = relative_str(dir, &entry) {
                    trace!(asset = %name, "found build artifact");
                    stats.assets.insert(name, Some(entry));
                }
            }
        }
    }

    Ok(stats)
}
