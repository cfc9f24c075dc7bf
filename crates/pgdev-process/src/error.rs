//! Error types for process graph operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for process graph operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors raised while assembling or writing a process graph.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Two instances produced the same process name.
    #[error("duplicate process name")]
    DuplicateProcess {
        /// Colliding process name.
        name: String,
    },
    /// Serialising the graph failed.
    #[error("failed to serialize process graph")]
    Serialize {
        /// Source serde error.
        source: serde_json::Error,
    },
    /// Writing the graph failed.
    #[error("failed to write process graph")]
    Io {
        /// Path that could not be written.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
}
