use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::tool_parser::{
    detector::ToolCallFormat,
    errors::ParserResult,
    parsers::helpers,
    sanitizer::ContentSanitizer,
    sentinels::{Sentinel, TOOL_CALL, TOOLS},
    traits::FormatExtractor,
    types::{ParsedCall, ParsedCalls},
};

static TOOL_CALL_EXTRACTOR: Lazy<Regex> = Lazy::new(|| envelope_regex(TOOL_CALL));
static TOOLS_EXTRACTOR: Lazy<Regex> = Lazy::new(|| envelope_regex(TOOLS));

/// `start ... end`, or an unterminated `start ...` running to the end.
fn envelope_regex(sentinel: Sentinel) -> Regex {
    let start = regex::escape(sentinel.start);
    let end = regex::escape(sentinel.end);
    Regex::new(&format!(r"(?s){start}(.*?){end}|{start}(.*)")).expect("valid regex")
}

/// Extractor for JSON payloads wrapped in a start/end sentinel pair.
///
/// Handles both `<tool_call>...</tool_call>` and the `<tools>...</tools>`
/// variant. Every wrapped payload is parsed independently; a malformed one is
/// skipped without affecting the others. An unterminated trailing envelope is
/// taken to the end of the text.
pub struct EnvelopeParser {
    sentinel: Sentinel,
    format: ToolCallFormat,
    extractor: &'static Regex,
    sanitizer: ContentSanitizer,
}

impl EnvelopeParser {
    /// `<tool_call>...</tool_call>`
    pub fn tagged_json(sanitizer: ContentSanitizer) -> Self {
        Self {
            sentinel: TOOL_CALL,
            format: ToolCallFormat::TaggedJson,
            extractor: &TOOL_CALL_EXTRACTOR,
            sanitizer,
        }
    }

    /// `<tools>...</tools>`
    pub fn wrapper_json(sanitizer: ContentSanitizer) -> Self {
        Self {
            sentinel: TOOLS,
            format: ToolCallFormat::WrapperJson,
            extractor: &TOOLS_EXTRACTOR,
            sanitizer,
        }
    }

    pub fn sentinel(&self) -> Sentinel {
        self.sentinel
    }

    /// Whether a complete `start ... end` pair is present.
    pub fn has_complete_envelope(&self, text: &str) -> bool {
        text.find(self.sentinel.start)
            .is_some_and(|start| text[start..].contains(self.sentinel.end))
    }

    /// Offset of a start sentinel whose end sentinel has not arrived yet.
    pub fn open_envelope_start(&self, text: &str) -> Option<usize> {
        text.find(self.sentinel.start)
            .filter(|&start| !text[start..].contains(self.sentinel.end))
    }

    fn parse_payload(&self, payload: &str) -> ParserResult<Value> {
        let value: Value = serde_json::from_str(payload.trim())?;
        Ok(helpers::normalize_arguments_field(value))
    }
}

impl FormatExtractor for EnvelopeParser {
    fn format(&self) -> ToolCallFormat {
        self.format
    }

    fn has_tool_markers(&self, text: &str) -> bool {
        text.contains(self.sentinel.start)
    }

    fn parse_calls(&self, text: &str) -> ParserResult<ParsedCalls> {
        let mut calls = Vec::new();

        for captures in self.extractor.captures_iter(text) {
            let Some(payload) = captures.get(1).or_else(|| captures.get(2)) else {
                continue;
            };
            let (start, end) = captures
                .get(0)
                .map_or((payload.start(), text.len()), |m| (m.start(), m.end()));

            let value = match self.parse_payload(payload.as_str()) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        sentinel = %self.sentinel.name,
                        error = %e,
                        "Skipping malformed call payload"
                    );
                    continue;
                }
            };

            match helpers::call_from_object(&value) {
                Ok(call) => calls.push(ParsedCall { call, start, end }),
                Err(e) => {
                    warn!(
                        sentinel = %self.sentinel.name,
                        error = %e,
                        "Skipping call payload without name/arguments"
                    );
                }
            }
        }

        let narration = text
            .find(self.sentinel.start)
            .and_then(|idx| self.sanitizer.sanitize(&text[..idx]));

        Ok(ParsedCalls {
            narration,
            calls,
            unknown_names: Vec::new(),
        })
    }
}
