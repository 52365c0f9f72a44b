use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    reasoning::{ReasoningMode, ReasoningTokens},
    tool_parser::{
        detector::{ARGUMENTS_KEY, NAME_KEY, ToolCallFormat},
        errors::ParserResult,
        parsers::helpers,
        traits::FormatExtractor,
        types::{ParsedCall, ParsedCalls, ToolCall},
        vocabulary::Vocabulary,
    },
};

/// Extractor for a single top-level `{"name": ..., "arguments": ...}` object,
/// optionally preceded by a reasoning block.
///
/// The reasoning block is the model's rationale: in passthrough mode it is
/// returned raw, delimiters included, as narration. Call names outside the
/// vocabulary are accepted but reported in `unknown_names`.
pub struct BareJsonParser {
    vocabulary: Arc<Vocabulary>,
    reasoning: ReasoningTokens,
    mode: ReasoningMode,
}

impl BareJsonParser {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        reasoning: ReasoningTokens,
        mode: ReasoningMode,
    ) -> Self {
        Self {
            vocabulary,
            reasoning,
            mode,
        }
    }

    /// Narration for a closed reasoning block under the configured mode.
    pub fn reasoning_narration(&self, block: &str) -> Option<String> {
        match self.mode {
            ReasoningMode::Passthrough => Some(block.to_string()),
            ReasoningMode::Discard => None,
        }
    }

    /// Decode one JSON object into a call.
    ///
    /// `Ok(None)` when the JSON is valid but is not a call; unknown names are
    /// pushed onto `unknown_names`.
    pub fn parse_object(
        &self,
        payload: &str,
        unknown_names: &mut Vec<String>,
    ) -> ParserResult<Option<ToolCall>> {
        let value: Value = serde_json::from_str(payload.trim())?;

        let call = match helpers::call_from_object(&value) {
            Ok(call) => call,
            Err(e) => {
                debug!(error = %e, "JSON object is not a tool call");
                return Ok(None);
            }
        };

        if !self.vocabulary.contains(&call.function.name) {
            warn!(name = %call.function.name, "Accepting call with unknown tool name");
            unknown_names.push(call.function.name.clone());
        }
        Ok(Some(call))
    }
}

impl FormatExtractor for BareJsonParser {
    fn format(&self) -> ToolCallFormat {
        ToolCallFormat::BareJson
    }

    fn has_tool_markers(&self, text: &str) -> bool {
        text.contains(NAME_KEY) && text.contains(ARGUMENTS_KEY)
    }

    fn parse_calls(&self, text: &str) -> ParserResult<ParsedCalls> {
        let (narration, body_start) = match self.reasoning.split(text) {
            Some(split) => (self.reasoning_narration(split.block), split.remainder_start),
            None => (None, 0),
        };
        let body = &text[body_start..];
        let start = body_start + (body.len() - body.trim_start().len());

        let mut unknown_names = Vec::new();
        let calls = self
            .parse_object(body, &mut unknown_names)?
            .map(|call| ParsedCall {
                call,
                start,
                end: text.trim_end().len(),
            })
            .into_iter()
            .collect();

        Ok(ParsedCalls {
            narration,
            calls,
            unknown_names,
        })
    }
}
