//! Assistant CLI invocation
//!
//! Builds argument vectors for the `gemini` CLI and runs them through the
//! [`CommandExecutor`], retrying once on the fallback model when the default
//! model's quota is exhausted.

use crate::command::{CommandError, CommandExecutor, ProgressFn};
use askbridge_core::config::CliConfig;
use serde::{Deserialize, Serialize};

/// Tool approval policy passed to `--approval-mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Ask before every tool
    Default,
    /// Allow edit tools automatically
    AutoEdit,
    /// Allow all tools
    #[default]
    Yolo,
}

impl ApprovalMode {
    /// CLI spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalMode::Default => "default",
            ApprovalMode::AutoEdit => "auto_edit",
            ApprovalMode::Yolo => "yolo",
        }
    }
}

/// Output format passed to `--output-format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// Single JSON document
    Json,
    /// Newline-delimited JSON events
    StreamJson,
}

impl OutputFormat {
    /// CLI spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::StreamJson => "stream-json",
        }
    }
}

/// One prompt invocation of the assistant CLI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeminiInvocation {
    /// Prompt text, passed with `-p`
    pub prompt: String,
    /// Explicit model; `None` lets the CLI pick its default
    pub model: Option<String>,
    /// Run tools in the sandbox
    pub sandbox: bool,
    /// Session to resume
    pub session_id: Option<String>,
    /// Tool approval policy
    pub approval_mode: Option<ApprovalMode>,
    /// Extra workspace directories
    pub include_directories: Vec<String>,
    /// Output format
    pub output_format: Option<OutputFormat>,
    /// Experimental ACP mode
    pub experimental_acp: bool,
    /// Tools allowed without confirmation
    pub allowed_tools: Vec<String>,
}

impl GeminiInvocation {
    /// Invocation with only a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// CLI arguments for this invocation; the prompt always comes last
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(model) = &self.model {
            args.extend(["-m".to_string(), model.clone()]);
        }
        if self.sandbox {
            args.push("-s".to_string());
        }
        if let Some(session) = &self.session_id {
            args.extend(["--resume".to_string(), session.clone()]);
        }
        if let Some(mode) = self.approval_mode {
            args.extend(["--approval-mode".to_string(), mode.as_str().to_string()]);
        }
        if !self.include_directories.is_empty() {
            args.extend([
                "--include-directories".to_string(),
                self.include_directories.join(","),
            ]);
        }
        if let Some(format) = self.output_format {
            args.extend(["--output-format".to_string(), format.as_str().to_string()]);
        }
        if self.experimental_acp {
            args.push("--experimental-acp".to_string());
        }
        for tool in &self.allowed_tools {
            args.extend(["--allowed-tools".to_string(), tool.clone()]);
        }

        args.extend(["-p".to_string(), self.prompt.clone()]);
        args
    }
}

/// Runs the assistant CLI
#[derive(Debug, Clone)]
pub struct GeminiClient {
    executor: CommandExecutor,
    cli: CliConfig,
}

impl GeminiClient {
    /// Create a client for the configured CLI
    pub fn new(cli: CliConfig, executor: CommandExecutor) -> Self {
        Self { executor, cli }
    }

    /// CLI settings in use
    pub fn cli_config(&self) -> &CliConfig {
        &self.cli
    }

    /// Send a prompt and return the assistant's response text.
    ///
    /// A request without a model runs on `cli.default_model` (or the CLI's own
    /// default when that is empty) and is retried once on
    /// `cli.fallback_model` if the quota is exhausted. An explicit model is
    /// never swapped out.
    pub async fn ask(
        &self,
        invocation: &GeminiInvocation,
        progress: Option<&ProgressFn>,
    ) -> Result<String, CommandError> {
        if invocation.model.is_some() {
            return self.run(&invocation.to_args(), progress).await;
        }

        let primary = GeminiInvocation {
            model: self.default_model(),
            ..invocation.clone()
        };
        let result = self.run(&primary.to_args(), progress).await;

        match result {
            Err(error)
                if error.is_quota_exceeded()
                    && primary.model.as_deref() != Some(self.cli.fallback_model.as_str()) =>
            {
                tracing::warn!(
                    "{}; retrying with fallback model {}",
                    error,
                    self.cli.fallback_model
                );
                let retry = GeminiInvocation {
                    model: Some(self.cli.fallback_model.clone()),
                    ..invocation.clone()
                };
                self.run(&retry.to_args(), progress).await
            }
            other => other,
        }
    }

    fn default_model(&self) -> Option<String> {
        let model = self.cli.default_model.trim();
        (!model.is_empty()).then(|| model.to_string())
    }

    /// Run the CLI with raw arguments (sessions, extensions, help)
    pub async fn run(
        &self,
        args: &[String],
        progress: Option<&ProgressFn>,
    ) -> Result<String, CommandError> {
        self.executor.run(&self.cli.command, args, progress).await
    }
}
