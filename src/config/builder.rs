use super::{ConfigResult, ExtractorConfig};
use crate::{
    reasoning::ReasoningMode,
    tool_parser::sentinels::{SentinelTokenizer, TOOL_CALL},
};

/// Builder for ExtractorConfig that wraps the config itself
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    // ==================== Vocabulary ====================

    pub fn tool_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tool_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_tool_name(mut self, name: impl Into<String>) -> Self {
        self.config.tool_names.push(name.into());
        self
    }

    // ==================== Reasoning ====================

    pub fn reasoning_mode(mut self, mode: ReasoningMode) -> Self {
        self.config.reasoning_mode = mode;
        self
    }

    pub fn discard_reasoning(self) -> Self {
        self.reasoning_mode(ReasoningMode::Discard)
    }

    pub fn think_tokens(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.config.think_start_token = start.into();
        self.config.think_end_token = end.into();
        self
    }

    // ==================== Streaming ====================

    pub fn multi_call_streaming(mut self, enabled: bool) -> Self {
        self.config.multi_call_streaming = enabled;
        self
    }

    pub fn sentinel_fragments(mut self, start: Vec<String>, end: Vec<String>) -> Self {
        self.config.start_fragments = Some(start);
        self.config.end_fragments = Some(end);
        self
    }

    /// Take the `<tool_call>` fragments from the host tokenizer.
    pub fn tokenizer(self, tokenizer: &dyn SentinelTokenizer) -> Self {
        let start = tokenizer.decode_fragments(TOOL_CALL.start);
        let end = tokenizer.decode_fragments(TOOL_CALL.end);
        self.sentinel_fragments(start, end)
    }

    pub fn call_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.call_id_prefix = prefix.into();
        self
    }

    // ==================== Build ====================

    pub fn build(self) -> ConfigResult<ExtractorConfig> {
        self.build_with_validation(true)
    }

    pub fn build_unchecked(self) -> ExtractorConfig {
        self.config
    }

    pub fn build_with_validation(self, validate: bool) -> ConfigResult<ExtractorConfig> {
        if validate {
            self.config.validate()?;
        }
        Ok(self.config)
    }
}
