//! Container runtime error types

use thiserror::Error;

/// Error types for runtime operations
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed with exit code {code}: {stderr}")]
    CommandFailed {
        operation: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("Runtime did not report a container id")]
    MissingContainerId,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
