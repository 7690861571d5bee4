//! Typed tool inputs
//!
//! Callers send loosely typed JSON (indices as numbers or strings, session
//! IDs as either), so these structs accept both spellings and normalize them.

use crate::gemini::{ApprovalMode, OutputFormat};
use crate::prompts::Methodology;
use serde::Deserialize;

/// A 1-based index sent as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IndexArg {
    /// `2`
    Number(u64),
    /// `"2"`
    Text(String),
}

impl IndexArg {
    /// The index as a positive integer, or `None` when it is not one
    pub fn to_index(&self) -> Option<usize> {
        let value = match self {
            IndexArg::Number(n) => usize::try_from(*n).ok()?,
            IndexArg::Text(s) => s.trim().parse().ok()?,
        };
        (value > 0).then_some(value)
    }
}

/// An identifier sent as a string or a number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    /// `"abc"`
    Text(String),
    /// `3`
    Number(i64),
}

impl std::fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StringOrNumber::Text(s) => write!(f, "{}", s),
            StringOrNumber::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AskGeminiArgs {
    pub prompt: String,
    pub model: Option<String>,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default, rename = "changeMode")]
    pub change_mode: bool,
    #[serde(rename = "chunkIndex")]
    pub chunk_index: Option<IndexArg>,
    #[serde(rename = "chunkCacheKey")]
    pub chunk_cache_key: Option<String>,
    pub session_id: Option<StringOrNumber>,
    #[serde(default)]
    pub approval_mode: ApprovalMode,
    #[serde(default)]
    pub include_directories: Vec<String>,
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub experimental_acp: bool,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

fn default_idea_count() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BrainstormArgs {
    pub prompt: String,
    pub model: Option<String>,
    #[serde(default)]
    pub methodology: Methodology,
    pub domain: Option<String>,
    pub constraints: Option<String>,
    pub existing_context: Option<String>,
    #[serde(default = "default_idea_count")]
    pub idea_count: u32,
    #[serde(default = "default_true")]
    pub include_analysis: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchChunkArgs {
    pub cache_key: String,
    pub chunk_index: IndexArg,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PingArgs {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SessionAction {
    #[default]
    List,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManageSessionsArgs {
    #[serde(default)]
    pub action: SessionAction,
    pub session_id: Option<StringOrNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ExtensionAction {
    List,
    Install,
    Uninstall,
    Update,
    Enable,
    Disable,
    Validate,
}

impl ExtensionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionAction::List => "list",
            ExtensionAction::Install => "install",
            ExtensionAction::Uninstall => "uninstall",
            ExtensionAction::Update => "update",
            ExtensionAction::Enable => "enable",
            ExtensionAction::Disable => "disable",
            ExtensionAction::Validate => "validate",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManageExtensionsArgs {
    pub action: ExtensionAction,
    pub target: Option<String>,
    #[serde(default)]
    pub all: bool,
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_arg() {
        let number: IndexArg = serde_json::from_value(json!(2)).unwrap();
        let text: IndexArg = serde_json::from_value(json!(" 3 ")).unwrap();
        assert_eq!(number.to_index(), Some(2));
        assert_eq!(text.to_index(), Some(3));
        assert_eq!(IndexArg::Number(0).to_index(), None);
        assert_eq!(IndexArg::Text("two".to_string()).to_index(), None);
    }

    #[test]
    fn test_string_or_number_display() {
        let id: StringOrNumber = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(id.to_string(), "4");
        let id: StringOrNumber = serde_json::from_value(json!("latest")).unwrap();
        assert_eq!(id.to_string(), "latest");
    }

    #[test]
    fn test_ask_gemini_defaults() {
        let args: AskGeminiArgs = serde_json::from_value(json!({ "prompt": "hi" })).unwrap();
        assert!(!args.sandbox);
        assert!(!args.change_mode);
        assert_eq!(args.approval_mode, ApprovalMode::Yolo);
        assert!(args.include_directories.is_empty());
    }

    #[test]
    fn test_brainstorm_defaults() {
        let args: BrainstormArgs =
            serde_json::from_value(json!({ "prompt": "x", "existingContext": "bg" })).unwrap();
        assert_eq!(args.idea_count, 12);
        assert!(args.include_analysis);
        assert_eq!(args.methodology, Methodology::Auto);
        assert_eq!(args.existing_context.as_deref(), Some("bg"));
    }

    #[test]
    fn test_rejects_unknown_enum_values() {
        let result: Result<ManageExtensionsArgs, _> =
            serde_json::from_value(json!({ "action": "explode" }));
        assert!(result.is_err());
    }
}
