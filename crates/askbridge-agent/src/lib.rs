//! AskBridge Agent - tool layer over the assistant CLI
//!
//! This crate exposes the tools a calling agent can use, including:
//! - Tool definitions and typed input parsing
//! - Assistant CLI invocation with progress streaming and quota fallback
//! - Prompt templates for change mode and brainstorming
//! - Change mode paging with a bounded, expiring edit cache

pub mod change_mode;
pub mod command;
pub mod gemini;
pub mod prompts;
pub mod tools;

pub use change_mode::{ChangeModeError, ChangeModeProcessor, ChunkCache};
pub use command::{CommandError, CommandExecutor};
pub use gemini::{GeminiClient, GeminiInvocation};
pub use tools::{all_tools, Tool, ToolError, ToolExecutor, ToolResult, ToolUse};
