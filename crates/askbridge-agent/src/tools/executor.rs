//! Tool execution engine
//!
//! Dispatches tool requests by name, parses their typed inputs, and maps
//! every failure into an error [`ToolResult`].

use super::args::{
    AskGeminiArgs, BrainstormArgs, ExtensionAction, FetchChunkArgs, ManageExtensionsArgs,
    ManageSessionsArgs, PingArgs, SessionAction,
};
use super::{ToolResult, ToolUse};
use crate::change_mode::{ChangeModeError, ChangeModeProcessor};
use crate::command::{CommandError, CommandExecutor, ProgressFn};
use crate::gemini::{GeminiClient, GeminiInvocation};
use crate::prompts::{build_brainstorm_prompt, build_change_mode_prompt, BrainstormRequest};
use askbridge_core::Config;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during tool execution
#[derive(Error, Debug)]
pub enum ToolError {
    /// Invalid tool input
    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    /// Tool not found
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The assistant CLI failed
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Change mode processing failed
    #[error(transparent)]
    ChangeMode(#[from] ChangeModeError),
}

fn parse_args<T: DeserializeOwned>(input: &serde_json::Value) -> Result<T, ToolError> {
    let input = if input.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        input.clone()
    };
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

fn require_prompt(prompt: &str, message: &str) -> Result<(), ToolError> {
    if prompt.trim().is_empty() {
        return Err(ToolError::InvalidInput(message.to_string()));
    }
    Ok(())
}

/// Build the `extensions` subcommand arguments for an extension action
fn extension_command_args(args: &ManageExtensionsArgs) -> Result<Vec<String>, ToolError> {
    let action = args.action.as_str();
    let mut command = vec!["extensions".to_string(), action.to_string()];
    let target = || {
        args.target
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidInput(format!("Target is required for {} action", action)))
    };

    match args.action {
        ExtensionAction::List => {}
        ExtensionAction::Install | ExtensionAction::Uninstall | ExtensionAction::Validate => {
            command.push(target()?);
        }
        ExtensionAction::Update => {
            if args.all {
                command.push("--all".to_string());
            } else if let Some(target) = &args.target {
                command.push(target.clone());
            }
        }
        ExtensionAction::Enable | ExtensionAction::Disable => {
            let target = target()?;
            if let Some(scope) = &args.scope {
                command.extend(["--scope".to_string(), scope.clone()]);
            }
            command.push(target);
        }
    }

    Ok(command)
}

/// Tool executor that can execute tool requests
pub struct ToolExecutor {
    gemini: GeminiClient,
    change_mode: ChangeModeProcessor,
    progress: Option<Arc<ProgressFn>>,
}

impl ToolExecutor {
    /// Create a tool executor from configuration
    pub fn new(config: &Config) -> Self {
        let executor = match &config.root {
            Some(root) => CommandExecutor::with_working_directory(root),
            None => CommandExecutor::new(),
        };

        Self {
            gemini: GeminiClient::new(config.cli.clone(), executor),
            change_mode: ChangeModeProcessor::from_config(&config.change_mode),
            progress: None,
        }
    }

    /// Report streamed CLI output through `progress`
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The change mode processor and its cache
    pub fn change_mode(&self) -> &ChangeModeProcessor {
        &self.change_mode
    }

    /// Execute a tool use request
    pub async fn execute(&self, tool_use: &ToolUse) -> ToolResult {
        tracing::info!("Tool call: {} ({})", tool_use.name, tool_use.id);

        let result = match tool_use.name.as_str() {
            "ask-gemini" => self.execute_ask_gemini(&tool_use.input).await,
            "brainstorm" => self.execute_brainstorm(&tool_use.input).await,
            "fetch-chunk" => self.execute_fetch_chunk(&tool_use.input),
            "ping" => self.execute_ping(&tool_use.input),
            "Help" => self.run_cli(&["-help".to_string()]).await,
            "manage-sessions" => self.execute_manage_sessions(&tool_use.input).await,
            "manage-extensions" => self.execute_manage_extensions(&tool_use.input).await,
            unknown => Err(ToolError::ToolNotFound(unknown.to_string())),
        };

        match result {
            Ok(content) => ToolResult::success(tool_use.id.clone(), content),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", tool_use.name, e);
                ToolResult::error(tool_use.id.clone(), e.to_string())
            }
        }
    }

    fn progress(&self) -> Option<&ProgressFn> {
        self.progress.as_deref()
    }

    async fn run_cli(&self, args: &[String]) -> Result<String, ToolError> {
        Ok(self.gemini.run(args, self.progress()).await?)
    }

    /// Execute the ask-gemini tool
    async fn execute_ask_gemini(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: AskGeminiArgs = parse_args(input)?;
        require_prompt(&args.prompt, "Please provide a prompt for analysis")?;

        let chunk_index = match &args.chunk_index {
            Some(index) => Some(index.to_index().ok_or_else(|| {
                ToolError::InvalidInput(format!("chunkIndex must be a positive integer, got {:?}", index))
            })?),
            None => None,
        };

        // Continuation requests are served from the cache without a new CLI run.
        if args.change_mode {
            if let (Some(index), Some(key)) = (chunk_index, &args.chunk_cache_key) {
                return Ok(self.change_mode.fetch(key, index)?);
            }
        }

        let prompt = if args.change_mode {
            build_change_mode_prompt(&args.prompt)
        } else {
            args.prompt.clone()
        };

        let invocation = GeminiInvocation {
            prompt,
            model: args.model.clone(),
            sandbox: args.sandbox,
            session_id: args.session_id.as_ref().map(|id| id.to_string()),
            approval_mode: Some(args.approval_mode),
            include_directories: args.include_directories.clone(),
            output_format: args.output_format,
            experimental_acp: args.experimental_acp,
            allowed_tools: args.allowed_tools.clone(),
        };

        let response = self.gemini.ask(&invocation, self.progress()).await?;

        if args.change_mode {
            Ok(self.change_mode.process(&response, chunk_index)?)
        } else {
            Ok(format!("Gemini response:\n{}", response))
        }
    }

    /// Execute the brainstorm tool
    async fn execute_brainstorm(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: BrainstormArgs = parse_args(input)?;
        require_prompt(
            &args.prompt,
            "You must provide a valid brainstorming challenge or question to explore",
        )?;
        if args.idea_count == 0 {
            return Err(ToolError::InvalidInput("ideaCount must be at least 1".to_string()));
        }

        let prompt = build_brainstorm_prompt(&BrainstormRequest {
            prompt: args.prompt.trim().to_string(),
            methodology: args.methodology,
            domain: args.domain,
            constraints: args.constraints,
            existing_context: args.existing_context,
            idea_count: args.idea_count,
            include_analysis: args.include_analysis,
        });

        tracing::debug!(
            "Brainstorm: generating {} ideas with methodology '{}'",
            args.idea_count,
            args.methodology.as_str()
        );

        let invocation = GeminiInvocation {
            model: args.model,
            ..GeminiInvocation::new(prompt)
        };
        Ok(self.gemini.ask(&invocation, self.progress()).await?)
    }

    /// Execute the fetch-chunk tool
    fn execute_fetch_chunk(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: FetchChunkArgs = parse_args(input)?;
        let index = args.chunk_index.to_index().ok_or_else(|| {
            ToolError::InvalidInput("chunkIndex must be a positive integer".to_string())
        })?;
        Ok(self.change_mode.fetch(&args.cache_key, index)?)
    }

    /// Execute the ping tool
    fn execute_ping(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: PingArgs = parse_args(input)?;
        let message = args.prompt.trim();
        Ok(if message.is_empty() {
            "Pong!".to_string()
        } else {
            message.to_string()
        })
    }

    /// Execute the manage-sessions tool
    async fn execute_manage_sessions(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: ManageSessionsArgs = parse_args(input)?;

        let cli_args = match args.action {
            SessionAction::List => vec!["--list-sessions".to_string()],
            SessionAction::Delete => {
                let id = args.session_id.ok_or_else(|| {
                    ToolError::InvalidInput("session_id is required for delete action".to_string())
                })?;
                vec!["--delete-session".to_string(), id.to_string()]
            }
        };

        self.run_cli(&cli_args).await
    }

    /// Execute the manage-extensions tool
    async fn execute_manage_extensions(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let args: ManageExtensionsArgs = parse_args(input)?;
        let cli_args = extension_command_args(&args)?;
        self.run_cli(&cli_args).await
    }
}
