//! Configuration validation primitives.

use thiserror::Error;

/// Errors raised while validating a configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the problem.
        message: String,
    },
    /// A required field was not provided.
    #[error("missing required field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },
}

/// Trait for configuration types that can validate themselves.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;
}
