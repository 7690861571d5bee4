//! Error types for AskBridge Core
//!
//! Extraction and validation are total and have no error type; the errors
//! here come from configuration and pagination.

use thiserror::Error;

pub use crate::chunker::ChunkError;
pub use crate::config::ConfigError;

/// Top-level error type for core operations
#[derive(Error, Debug)]
pub enum AskBridgeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pagination error
    #[error("Chunking error: {0}")]
    Chunk(#[from] ChunkError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for AskBridgeError {
    fn from(msg: String) -> Self {
        AskBridgeError::Other(msg)
    }
}

impl From<&str> for AskBridgeError {
    fn from(msg: &str) -> Self {
        AskBridgeError::Other(msg.to_string())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, AskBridgeError>;
