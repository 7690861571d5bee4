//! AskBridge Core - change mode edit pipeline
//!
//! This crate turns an assistant's raw change mode response into structured
//! edits and pages them for transport:
//! - Edit extraction and structural validation
//! - Size-bounded pagination with summaries
//! - Configuration and shared error types
//!
//! Everything here is pure and synchronous; the same edits and budget always
//! produce the same pages, so callers may cache edit sets and re-paginate.

pub mod chunker;
pub mod config;
pub mod edit;
pub mod error;
pub mod parser;

pub use chunker::{
    chunk_change_mode_edits, chunk_change_mode_edits_default, summarize_chunking, ChunkError,
    EditChunk, DEFAULT_MAX_CHUNK_CHARS,
};
pub use config::{Config, ConfigError};
pub use edit::{ChangeModeEdit, ValidationReport};
pub use error::{AskBridgeError, Result};
pub use parser::{parse_change_mode_output, validate_change_mode_edits};
