// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchdogError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Runtime channel closed: {0}")]
    ChannelClosed(String),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for LaunchdogError {
    fn from(err: tokio::sync::mpsc::error::SendError<T>) -> Self {
        LaunchdogError::ChannelClosed(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, LaunchdogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_failures_map_to_watch_error() {
        let err: LaunchdogError = notify::Error::generic("inotify limit reached").into();
        assert!(matches!(err, LaunchdogError::WatchError(_)));
        assert!(err.to_string().starts_with("File watch error"));
    }

    #[test]
    fn failed_send_maps_to_channel_closed() {
        let err: LaunchdogError = tokio::sync::mpsc::error::SendError(7u8).into();
        assert!(matches!(err, LaunchdogError::ChannelClosed(_)));
    }
}
