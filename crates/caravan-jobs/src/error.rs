//! Error types for job rendering, validation, and agent invocation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for job operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// Template rendering failed.
    #[error("failed to render job template '{name}'")]
    Template {
        /// Job name the template belongs to.
        name: String,
        /// Source template engine error.
        #[source]
        source: tera::Error,
    },
    /// External validation rejected the rendered output before commit.
    #[error("validation failed for rendered job at {path}: {detail}")]
    Validation {
        /// Path of the rendered-but-uncommitted output.
        path: PathBuf,
        /// Validator output describing the rejection.
        detail: String,
    },
    /// The agent CLI exited with a failure status.
    #[error("agent command '{command}' failed: {stderr}")]
    Process {
        /// Command line that was invoked.
        command: String,
        /// Exit code when the process terminated normally.
        code: Option<i32>,
        /// Captured standard error output.
        stderr: String,
    },
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
    /// Converging the rendered file to disk failed.
    #[error(transparent)]
    Converge(#[from] caravan_converge::ConvergeError),
}

impl JobError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for job results.
pub type JobResult<T> = Result<T, JobError>;
