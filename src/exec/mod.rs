// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the supervised script,
//! using `tokio::process::Command`, and reporting back to the runtime via
//! `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ProcessSpawner` / `ProcessHandle` traits and
//!   the concrete `TokioSpawner` used in production, which tests can replace
//!   with a fake implementation.
//! - [`launcher`] runs one attempt per Tokio task and handles cancellation.

pub mod backend;
pub mod launcher;

pub use backend::{ProcessHandle, ProcessSpawner, TokioSpawner};
pub use launcher::Launcher;
