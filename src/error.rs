//! Error types for the tailer.

use crate::subscriptions::SubscriptionId;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tailer operations.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot access log file {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backlog rebuild failed for {path}: {source}")]
    BacklogRebuild {
        path: PathBuf,
        #[source]
        source: Box<TailError>,
    },

    #[error("Delivery to subscription {id} failed: {reason}")]
    Delivery { id: SubscriptionId, reason: String },

    #[error("Subscription dropped: {0}")]
    SubscriptionDropped(SubscriptionId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Poller is already running")]
    AlreadyRunning,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TailError {
    /// Wrap an IO error with the path it occurred on.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TailError::Storage {
            path: path.into(),
            source,
        }
    }

    /// True if the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            TailError::Io(e) | TailError::Storage { source: e, .. } => {
                e.kind() == std::io::ErrorKind::NotFound
            }
            TailError::BacklogRebuild { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TailError {
    fn from(e: serde_json::Error) -> Self {
        TailError::Serialization(e.to_string())
    }
}

/// Result type for tailer operations.
pub type Result<T> = std::result::Result<T, TailError>;
