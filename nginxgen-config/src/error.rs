//! Error types for building and rendering configuration trees

use crate::policy::CacheKey;
use thiserror::Error;

/// Errors raised by tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    #[error("Key not found: {key}")]
    KeyNotFound { key: CacheKey },

    #[error("Invalid usage: {message}")]
    InvalidUsage { message: String },
}

/// Errors raised while rendering sites
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to render site '{site}': {source}")]
    Tree {
        site: String,
        #[source]
        source: DslError,
    },

    #[error("Invalid descriptor for site '{site}': {message}")]
    Descriptor { site: String, message: String },
}

pub type DslResult<T> = Result<T, DslError>;
