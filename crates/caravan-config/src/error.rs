//! Error types for schema lookup and option validation.

use thiserror::Error;

/// Primary error type for schema and rendering operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Requested section is not part of the registry.
    #[error("unknown configuration section '{name}'")]
    UnknownSection {
        /// Section name supplied by the caller.
        name: String,
    },
    /// An option value did not satisfy its declared constraint.
    #[error("invalid value for option '{option}' in section '{section}': {reason}")]
    InvalidOption {
        /// Section the option belongs to.
        section: &'static str,
        /// Name of the offending option.
        option: String,
        /// Human-readable constraint description.
        reason: &'static str,
    },
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
