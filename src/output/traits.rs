//! Sink trait and errors

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::Snapshot;

/// Errors that can occur while writing a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to move {} into place: {source}", path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A destination for the entities of a run
///
/// Sinks are written once, at flush, from a single snapshot.
pub trait Sink: Send {
    /// Short name used in logs, usually the file name
    fn name(&self) -> &str;

    fn write(&mut self, snapshot: &Snapshot) -> SinkResult<()>;
}
