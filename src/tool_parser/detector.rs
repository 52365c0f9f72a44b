use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    reasoning::ReasoningTokens,
    tool_parser::{
        sentinels::{TOOL_CALL, TOOLS},
        vocabulary::Vocabulary,
    },
};

pub(crate) const NAME_KEY: &str = "\"name\"";
pub(crate) const ARGUMENTS_KEY: &str = "\"arguments\"";

/// Surface syntax a span of model output was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallFormat {
    /// `<tool_call>{...}</tool_call>`
    TaggedJson,
    /// `<tools>{...}</tools>`
    WrapperJson,
    /// `{"name": ..., "arguments": ...}`, optionally after a reasoning block
    BareJson,
    /// `<tool_name><param>value</param></tool_name>`
    TagPerCall,
}

impl ToolCallFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCallFormat::TaggedJson => "tagged_json",
            ToolCallFormat::WrapperJson => "wrapper_json",
            ToolCallFormat::BareJson => "bare_json",
            ToolCallFormat::TagPerCall => "tag_per_call",
        }
    }
}

impl fmt::Display for ToolCallFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a span against the four syntaxes.
///
/// Checks run in a fixed priority order and the first match wins: envelope
/// sentinels, then bare JSON, then vocabulary tags.
#[derive(Debug, Clone)]
pub struct FormatDetector {
    vocabulary: Arc<Vocabulary>,
    reasoning: ReasoningTokens,
}

impl FormatDetector {
    pub fn new(vocabulary: Arc<Vocabulary>, reasoning: ReasoningTokens) -> Self {
        Self {
            vocabulary,
            reasoning,
        }
    }

    /// `None` means the span is pure narration.
    pub fn detect(&self, text: &str) -> Option<ToolCallFormat> {
        if self.is_tagged_json(text) {
            Some(ToolCallFormat::TaggedJson)
        } else if self.is_wrapper_json(text) {
            Some(ToolCallFormat::WrapperJson)
        } else if self.is_bare_json(text) {
            Some(ToolCallFormat::BareJson)
        } else if self.is_tag_per_call(text) {
            Some(ToolCallFormat::TagPerCall)
        } else {
            None
        }
    }

    pub fn is_tagged_json(&self, text: &str) -> bool {
        text.contains(TOOL_CALL.start)
    }

    /// The wrapper also shows up as prose when the model echoes the tool
    /// list header, so both key words must be present too.
    pub fn is_wrapper_json(&self, text: &str) -> bool {
        text.contains(TOOLS.start) && text.contains("name") && text.contains("arguments")
    }

    pub fn is_bare_json(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            return trimmed.contains(NAME_KEY) && trimmed.contains(ARGUMENTS_KEY);
        }

        match self.reasoning.split(trimmed) {
            Some(split) => {
                split.remainder.trim_start().starts_with('{')
                    && split.remainder.contains(NAME_KEY)
                    && split.remainder.contains(ARGUMENTS_KEY)
            }
            None => false,
        }
    }

    pub fn is_tag_per_call(&self, text: &str) -> bool {
        self.vocabulary.has_open_tag(text)
    }
}
