// src/watch/mod.rs

//! Build-output watching.
//!
//! Stands in for the host build tool: it turns the contents of an output
//! directory into [`BuildStats`](crate::build::BuildStats) and, in watch
//! mode, re-emits them as build-ready notifications whenever the directory
//! changes. Bursts of filesystem events are coalesced by the engine's
//! debounce, not here.

pub mod path_utils;
pub mod scan;
pub mod watcher;

pub use scan::scan_build_stats;
pub use watcher::{spawn_build_watcher, WatcherHandle};
