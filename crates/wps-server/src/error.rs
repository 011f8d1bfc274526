//! Error types for the WPS server
//!
//! This module contains the error types used throughout the server.

use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read
    #[error("Cannot read configuration file {path}: {source}")]
    ConfigFile {
        /// Path of the file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for the expected structure
    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// None of the configured processes could be registered
    #[error("No process could be registered ({failed} failed)")]
    NoProcesses {
        /// Number of failed registrations
        failed: usize,
    },

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result alias for server operations
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ServerError::ConfigError("sweep interval must be positive".to_string()).to_string(),
            "Configuration error: sweep interval must be positive"
        );
        assert_eq!(
            ServerError::NoProcesses { failed: 2 }.to_string(),
            "No process could be registered (2 failed)"
        );
    }
}
