use tracing::warn;

use crate::tool_parser::{
    detector::ToolCallFormat,
    errors::ParserResult,
    types::{ExtractionResult, ParsedCalls},
};

/// Batch extractor for one surface syntax.
///
/// Implementations assume the syntax was already confirmed by the detector
/// and receive the complete span.
pub trait FormatExtractor: Send + Sync {
    /// Syntax handled by this extractor
    fn format(&self) -> ToolCallFormat;

    /// Check if text contains this syntax's markers
    fn has_tool_markers(&self, text: &str) -> bool;

    /// Parse calls and leading narration from a complete span
    fn parse_calls(&self, text: &str) -> ParserResult<ParsedCalls>;

    /// Parse a complete span, never failing.
    ///
    /// A parse error or an empty call list yields the full span as narration.
    fn extract(&self, text: &str) -> ExtractionResult {
        let parsed = match self.parse_calls(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(
                    format = %self.format(),
                    error = %e,
                    "Tool call extraction failed, returning text as narration"
                );
                return ExtractionResult::narration_only(text);
            }
        };

        if parsed.calls.is_empty() {
            return ExtractionResult::narration_only(text);
        }

        let calls = parsed.calls.into_iter().map(|parsed| parsed.call).collect();
        let mut result = ExtractionResult::with_calls(self.format(), calls, parsed.narration);
        result.unknown_names = parsed.unknown_names;
        result
    }
}
