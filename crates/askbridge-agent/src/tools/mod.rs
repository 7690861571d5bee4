//! Tool definitions and execution
//!
//! This module defines the tools a calling agent can use, including their
//! input schemas, and re-exports the executor that runs them.

mod args;
mod executor;

pub use args::{IndexArg, StringOrNumber};
pub use executor::{ToolError, ToolExecutor};

use crate::change_mode::FETCH_CHUNK_TOOL;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A tool the calling agent can use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: JsonValue,
}

/// Tool use request from the calling agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUse {
    /// Unique ID for this tool use
    pub id: String,
    /// Name of the tool to use
    pub name: String,
    /// Input parameters for the tool
    #[serde(default)]
    pub input: JsonValue,
}

/// Result of executing a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool use this is responding to
    pub tool_use_id: String,
    /// Content of the result
    pub content: String,
    /// Whether the tool execution failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(tool_use_id: String, content: String) -> Self {
        Self {
            tool_use_id,
            content,
            is_error: None,
        }
    }

    /// Create an error tool result
    pub fn error(tool_use_id: String, error_message: String) -> Self {
        Self {
            tool_use_id,
            content: error_message,
            is_error: Some(true),
        }
    }
}

/// Create the ask-gemini tool definition
pub fn ask_gemini_tool() -> Tool {
    Tool {
        name: "ask-gemini".to_string(),
        description: "Ask Gemini via its CLI. Supports model selection, sandbox mode, session resume, and changeMode for structured edit suggestions.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Analysis request. Use @ syntax to include files (e.g., '@largefile.js explain what this does') or ask general questions"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model to use (e.g., 'gemini-3-flash'). Uses the CLI default when omitted."
                },
                "sandbox": {
                    "type": "boolean",
                    "default": false,
                    "description": "Use sandbox mode (-s) to run code or risky operations in isolation"
                },
                "changeMode": {
                    "type": "boolean",
                    "default": false,
                    "description": "Return structured edit suggestions that can be applied directly"
                },
                "chunkIndex": {
                    "type": ["integer", "string"],
                    "description": "Which chunk of a change mode result to return (1-based)"
                },
                "chunkCacheKey": {
                    "type": "string",
                    "description": "Cache key from a previous change mode result, for continuation"
                },
                "session_id": {
                    "type": ["string", "integer"],
                    "description": "Session ID or index to resume (maps to --resume)"
                },
                "approval_mode": {
                    "type": "string",
                    "enum": ["default", "auto_edit", "yolo"],
                    "default": "yolo",
                    "description": "Autonomy control: 'default' (ask), 'auto_edit' (allow edits), 'yolo' (allow all)"
                },
                "include_directories": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Additional directories to include in the workspace context"
                },
                "output_format": {
                    "type": "string",
                    "enum": ["text", "json", "stream-json"],
                    "description": "CLI output format"
                },
                "experimental_acp": {
                    "type": "boolean",
                    "description": "Enable experimental ACP mode"
                },
                "allowed_tools": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Tools to allow without confirmation"
                }
            },
            "required": ["prompt"]
        }),
    }
}

/// Create the brainstorm tool definition
pub fn brainstorm_tool() -> Tool {
    Tool {
        name: "brainstorm".to_string(),
        description: "Generate novel ideas using creative frameworks (SCAMPER, Design Thinking, etc.) with domain context and feasibility analysis.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Primary brainstorming challenge or question to explore"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model to use"
                },
                "methodology": {
                    "type": "string",
                    "enum": ["divergent", "convergent", "scamper", "design-thinking", "lateral", "auto"],
                    "default": "auto",
                    "description": "Brainstorming framework"
                },
                "domain": {
                    "type": "string",
                    "description": "Domain context (e.g., 'software', 'business', 'research')"
                },
                "constraints": {
                    "type": "string",
                    "description": "Known limitations, requirements, or boundaries"
                },
                "existingContext": {
                    "type": "string",
                    "description": "Background information or previous attempts to build upon"
                },
                "ideaCount": {
                    "type": "integer",
                    "minimum": 1,
                    "default": 12,
                    "description": "Target number of ideas to generate"
                },
                "includeAnalysis": {
                    "type": "boolean",
                    "default": true,
                    "description": "Include feasibility, impact, and innovation ratings"
                }
            },
            "required": ["prompt"]
        }),
    }
}

/// Create the fetch-chunk tool definition
pub fn fetch_chunk_tool() -> Tool {
    Tool {
        name: FETCH_CHUNK_TOOL.to_string(),
        description: "Retrieve a further chunk of a cached change mode result.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "cacheKey": {
                    "type": "string",
                    "description": "Cache key from the initial change mode response"
                },
                "chunkIndex": {
                    "type": ["integer", "string"],
                    "description": "Which chunk to retrieve (1-based)"
                }
            },
            "required": ["cacheKey", "chunkIndex"]
        }),
    }
}

/// Create the ping tool definition
pub fn ping_tool() -> Tool {
    Tool {
        name: "ping".to_string(),
        description: "Echo".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "default": "",
                    "description": "Message to echo back"
                }
            }
        }),
    }
}

/// Create the Help tool definition
pub fn help_tool() -> Tool {
    Tool {
        name: "Help".to_string(),
        description: "Receive help information from the Gemini CLI".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Create the manage-sessions tool definition
pub fn manage_sessions_tool() -> Tool {
    Tool {
        name: "manage-sessions".to_string(),
        description: "Manage conversation sessions: list active sessions or delete old ones.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "delete"],
                    "default": "list",
                    "description": "'list' active sessions or 'delete' a specific session"
                },
                "session_id": {
                    "type": ["string", "integer"],
                    "description": "Session ID or index to delete (required for 'delete')"
                }
            }
        }),
    }
}

/// Create the manage-extensions tool definition
pub fn manage_extensions_tool() -> Tool {
    Tool {
        name: "manage-extensions".to_string(),
        description: "Manage Gemini CLI extensions: list, install, uninstall, update, enable, disable, validate.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "install", "uninstall", "update", "enable", "disable", "validate"],
                    "description": "The action to perform on extensions"
                },
                "target": {
                    "type": "string",
                    "description": "Extension name, path, or URL. Required for install, uninstall, enable, disable, and validate."
                },
                "all": {
                    "type": "boolean",
                    "description": "Update all extensions (only valid with 'update')"
                },
                "scope": {
                    "type": "string",
                    "description": "Scope for enable/disable (e.g. 'project' or 'global')"
                }
            },
            "required": ["action"]
        }),
    }
}

/// Every tool this server exposes, in listing order
pub fn all_tools() -> Vec<Tool> {
    vec![
        ask_gemini_tool(),
        ping_tool(),
        help_tool(),
        brainstorm_tool(),
        fetch_chunk_tool(),
        manage_sessions_tool(),
        manage_extensions_tool(),
    ]
}
