use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the caller allows the model to pick tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    None,
    #[default]
    Auto,
    Required,
    /// A specific function by name
    #[serde(untagged)]
    Function(String),
}

/// The request fields the extractor cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub has_tools: bool,
    #[serde(default)]
    pub tool_choice: ToolChoice,
    #[serde(default = "default_skip_special_tokens")]
    pub skip_special_tokens: bool,
}

fn default_skip_special_tokens() -> bool {
    true
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            has_tools: false,
            tool_choice: ToolChoice::default(),
            skip_special_tokens: default_skip_special_tokens(),
        }
    }
}

/// Ask the host to deliver raw token text when tool calls may be produced.
///
/// The sentinels are special tokens, so stripping them during detokenization
/// would hide every envelope. Returns whether the request was changed.
pub fn adjust_request(request: &mut RequestOptions) -> bool {
    if !request.has_tools
        || request.tool_choice == ToolChoice::None
        || !request.skip_special_tokens
    {
        return false;
    }
    debug!("Disabling skip_special_tokens so tool call sentinels reach the extractor");
    request.skip_special_tokens = false;
    true
}
