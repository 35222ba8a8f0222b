//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur in the logging subsystem
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A global subscriber is already installed or could not be built
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// A level or filter string could not be understood
    #[error("Invalid logging configuration: {0}")]
    InvalidConfiguration(String),
}
