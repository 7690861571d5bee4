//! Line-delimited JSON request protocol
//!
//! Each stdin line is one [`Request`]; each response is written as one line.

use askbridge_agent::{all_tools, Tool, ToolExecutor, ToolResult, ToolUse};
use serde::{Deserialize, Serialize};

/// A request from the calling agent
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// List available tools
    ListTools,
    /// Call a tool
    CallTool(ToolUse),
}

/// A response to the calling agent
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Available tools
    Tools {
        /// Tool definitions
        tools: Vec<Tool>,
    },
    /// Result of a tool call
    ToolResult(ToolResult),
    /// The request could not be understood
    Error {
        /// What went wrong
        message: String,
    },
}

/// Handle one request line
pub async fn handle_line(executor: &ToolExecutor, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Malformed request: {}", e);
            return Response::Error {
                message: format!("Malformed request: {}", e),
            };
        }
    };

    match request {
        Request::ListTools => Response::Tools { tools: all_tools() },
        Request::CallTool(tool_use) => Response::ToolResult(executor.execute(&tool_use).await),
    }
}
