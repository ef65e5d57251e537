//! Error types for file convergence.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for convergence operations.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// A filesystem operation failed.
    #[error("filesystem operation '{operation}' failed for {path}")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Source IO error.
        #[source]
        source: io::Error,
    },
}

impl ConvergeError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for convergence results.
pub type ConvergeResult<T> = Result<T, ConvergeError>;
