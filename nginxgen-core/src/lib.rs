//! nginxgen Core Library
//!
//! This crate provides the shared pieces of nginxgen: the deployment
//! descriptor types and their loader, the deploy step that installs a
//! rendered configuration, and error handling.

pub mod config;
pub mod deploy;
pub mod error;

pub use error::{Error, Result};

/// nginxgen version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
