//! Error types for nginxgen

use thiserror::Error;

/// Result type for nginxgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nginxgen
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Deploy (write or reload) error
    #[error("Deploy error: {0}")]
    Deploy(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
