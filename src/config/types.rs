use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigResult, ExtractorConfigBuilder};
use crate::{
    reasoning::{DEFAULT_THINK_END, DEFAULT_THINK_START, ReasoningMode, ReasoningTokens},
    tool_parser::{
        sentinels::{SentinelFragments, TOOL_CALL},
        vocabulary::{DEFAULT_TOOL_NAMES, Vocabulary},
    },
};

/// Extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Vocabulary for the tag-per-call syntax, in priority order
    pub tool_names: Vec<String>,
    /// What to do with a leading reasoning block
    pub reasoning_mode: ReasoningMode,
    pub think_start_token: String,
    pub think_end_token: String,
    /// Re-arm detection after each emitted call instead of stopping at one
    pub multi_call_streaming: bool,
    /// Decoded tokenizer fragments of `<tool_call>`; whole sentinel if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_fragments: Option<Vec<String>>,
    /// Decoded tokenizer fragments of `</tool_call>`; whole sentinel if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_fragments: Option<Vec<String>>,
    /// Prefix of ids minted for streamed calls
    pub call_id_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tool_names: DEFAULT_TOOL_NAMES.iter().map(|s| s.to_string()).collect(),
            reasoning_mode: ReasoningMode::default(),
            think_start_token: DEFAULT_THINK_START.to_string(),
            think_end_token: DEFAULT_THINK_END.to_string(),
            multi_call_streaming: false,
            start_fragments: None,
            end_fragments: None,
            call_id_prefix: "call_".to_string(),
        }
    }
}

impl ExtractorConfig {
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::new()
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "YAML",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "JSON",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` file, or JSON for any other extension.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        super::validation::ConfigValidator::validate(self)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.tool_names.iter().cloned())
    }

    pub fn reasoning_tokens(&self) -> ReasoningTokens {
        ReasoningTokens::new(self.think_start_token.clone(), self.think_end_token.clone())
    }

    /// Sentinel fragments for the `<tool_call>` envelope.
    pub fn sentinel_fragments(&self) -> ConfigResult<SentinelFragments> {
        if self.start_fragments.is_none() && self.end_fragments.is_none() {
            return Ok(SentinelFragments::whole(TOOL_CALL));
        }

        let start = self
            .start_fragments
            .clone()
            .unwrap_or_else(|| vec![TOOL_CALL.start.to_string()]);
        let end = self
            .end_fragments
            .clone()
            .unwrap_or_else(|| vec![TOOL_CALL.end.to_string()]);

        SentinelFragments::new(TOOL_CALL, start, end).map_err(|e| ConfigError::ValidationFailed {
            reason: e.to_string(),
        })
    }
}
