use std::sync::Arc;

use tracing::debug;

use crate::{
    config::{ConfigResult, ExtractorConfig},
    reasoning::{ReasoningMode, ReasoningTokens},
    tool_parser::{
        detector::{FormatDetector, ToolCallFormat},
        parsers::{BareJsonParser, EnvelopeParser, XmlTagParser},
        partial_tag::PartialTagRecognizer,
        sanitizer::ContentSanitizer,
        sentinels::SentinelFragments,
        traits::FormatExtractor,
        types::ExtractionResult,
        vocabulary::Vocabulary,
    },
};

/// Entry point for tool call extraction.
///
/// Detects which syntax a span uses and delegates to the matching extractor.
/// Holds no per-stream state: one instance can serve any number of concurrent
/// streams, each with its own [`StreamState`](super::StreamState).
pub struct MultiFormatExtractor {
    pub(crate) vocabulary: Arc<Vocabulary>,
    pub(crate) detector: FormatDetector,
    pub(crate) sanitizer: ContentSanitizer,
    pub(crate) recognizer: PartialTagRecognizer,
    pub(crate) tagged: EnvelopeParser,
    pub(crate) wrapper: EnvelopeParser,
    pub(crate) bare: BareJsonParser,
    pub(crate) xml: XmlTagParser,
    pub(crate) reasoning: ReasoningTokens,
    pub(crate) reasoning_mode: ReasoningMode,
    pub(crate) fragments: SentinelFragments,
    pub(crate) multi_call: bool,
    pub(crate) call_id_prefix: String,
}

impl MultiFormatExtractor {
    /// Extractor with the default vocabulary and settings.
    pub fn new() -> Self {
        Self::assemble(&ExtractorConfig::default(), SentinelFragments::default())
    }

    /// Validate `config` and build an extractor from it.
    pub fn from_config(config: &ExtractorConfig) -> ConfigResult<Self> {
        config.validate()?;
        let fragments = config.sentinel_fragments()?;
        Ok(Self::assemble(config, fragments))
    }

    fn assemble(config: &ExtractorConfig, fragments: SentinelFragments) -> Self {
        let vocabulary = Arc::new(config.vocabulary());
        let reasoning = config.reasoning_tokens();
        let sanitizer = ContentSanitizer::new(vocabulary.clone());

        Self {
            detector: FormatDetector::new(vocabulary.clone(), reasoning.clone()),
            recognizer: PartialTagRecognizer::new(vocabulary.clone()),
            tagged: EnvelopeParser::tagged_json(sanitizer.clone()),
            wrapper: EnvelopeParser::wrapper_json(sanitizer.clone()),
            bare: BareJsonParser::new(vocabulary.clone(), reasoning.clone(), config.reasoning_mode),
            xml: XmlTagParser::new(vocabulary.clone(), sanitizer.clone()),
            sanitizer,
            vocabulary,
            reasoning,
            reasoning_mode: config.reasoning_mode,
            fragments,
            multi_call: config.multi_call_streaming,
            call_id_prefix: config.call_id_prefix.clone(),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn detector(&self) -> &FormatDetector {
        &self.detector
    }

    pub fn sanitizer(&self) -> &ContentSanitizer {
        &self.sanitizer
    }

    pub fn multi_call_streaming(&self) -> bool {
        self.multi_call
    }

    /// Syntax of `text`, or `None` for pure narration.
    pub fn detect(&self, text: &str) -> Option<ToolCallFormat> {
        self.detector.detect(text)
    }

    /// Split one complete span into narration and calls.
    ///
    /// Never fails: when nothing parses, the full span is returned as
    /// narration.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let Some(format) = self.detector.detect(text) else {
            return self.apply_reasoning_mode(ExtractionResult::narration_only(text));
        };

        debug!(format = %format, "Detected tool call format");
        let result = self.parser_for(format).extract(text);
        self.apply_reasoning_mode(result)
    }

    pub(crate) fn parser_for(&self, format: ToolCallFormat) -> &dyn FormatExtractor {
        match format {
            ToolCallFormat::TaggedJson => &self.tagged,
            ToolCallFormat::WrapperJson => &self.wrapper,
            ToolCallFormat::BareJson => &self.bare,
            ToolCallFormat::TagPerCall => &self.xml,
        }
    }

    /// Sanitized narration for a streamed span, honouring the reasoning mode.
    pub(crate) fn narration_for(&self, text: &str) -> Option<String> {
        let text = match self.reasoning_mode {
            ReasoningMode::Passthrough => text,
            ReasoningMode::Discard => self.reasoning.strip(text),
        };
        self.sanitizer.sanitize(text)
    }

    fn apply_reasoning_mode(&self, mut result: ExtractionResult) -> ExtractionResult {
        if self.reasoning_mode == ReasoningMode::Discard {
            if let Some(narration) = result.narration.take() {
                let stripped = self.reasoning.strip(&narration).trim();
                result.narration = (!stripped.is_empty()).then(|| stripped.to_string());
            }
        }
        result
    }
}

impl Default for MultiFormatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn args(result: &ExtractionResult, idx: usize) -> Value {
        serde_json::from_str(&result.calls[idx].function.arguments).unwrap()
    }

    #[test]
    fn test_extractor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MultiFormatExtractor>();
    }

    #[test]
    fn test_tagged_json() {
        let extractor = MultiFormatExtractor::new();
        let result = extractor.extract(
            "Hello<tool_call>\n{\"name\": \"read_file\", \"arguments\": {\"path\": \"a.txt\"}}\n</tool_call>",
        );
        assert!(result.calls_found);
        assert_eq!(result.format, Some(ToolCallFormat::TaggedJson));
        assert_eq!(result.calls[0].function.name, "read_file");
        assert_eq!(result.calls[0].function.arguments, r#"{"path":"a.txt"}"#);
        assert_eq!(result.narration.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_tag_per_call() {
        let extractor = MultiFormatExtractor::new();
        let result = extractor
            .extract("<write_to_file><path>a.txt</path><content>hi</content></write_to_file>");
        assert_eq!(result.format, Some(ToolCallFormat::TagPerCall));
        assert_eq!(args(&result, 0), json!({"path": "a.txt", "content": "hi"}));
        assert_eq!(result.narration, None);
    }

    #[test]
    fn test_detected_parser_sees_its_markers() {
        let extractor = MultiFormatExtractor::new();
        let cases = [
            "<tool_call>{\"name\": \"a\", \"arguments\": {}}</tool_call>",
            "<tools>{\"name\": \"a\", \"arguments\": {}}</tools>",
            "{\"name\": \"a\", \"arguments\": {}}",
            "<list_files><path>.</path></list_files>",
        ];
        for text in cases {
            let format = extractor.detect(text).unwrap();
            let parser = extractor.parser_for(format);
            assert_eq!(parser.format(), format);
            assert!(parser.has_tool_markers(text), "{text}");
        }
        assert!(!extractor.parser_for(ToolCallFormat::TagPerCall).has_tool_markers("plain"));
    }

    #[test]
    fn test_pure_narration() {
        let extractor = MultiFormatExtractor::new();
        let text = "Nothing to call here.\nJust text.";
        assert_eq!(extractor.extract(text), ExtractionResult::narration_only(text));
    }

    #[test]
    fn test_discard_mode_strips_reasoning() {
        let config = ExtractorConfig::builder().discard_reasoning().build().unwrap();
        let extractor = MultiFormatExtractor::from_config(&config).unwrap();

        let result = extractor.extract("<think>private</think>The answer is 4.");
        assert_eq!(result.narration.as_deref(), Some("The answer is 4."));

        let result = extractor.extract(
            "<think>plan</think>\n{\"name\": \"list_files\", \"arguments\": {\"path\": \".\"}}",
        );
        assert!(result.calls_found);
        assert_eq!(result.narration, None);
    }

    #[test]
    fn test_custom_vocabulary() {
        let config = ExtractorConfig::builder().tool_names(["deploy"]).build().unwrap();
        let extractor = MultiFormatExtractor::from_config(&config).unwrap();

        let result = extractor.extract("<deploy><env>prod</env></deploy>");
        assert_eq!(result.calls[0].function.name, "deploy");

        let result = extractor.extract("<read_file><path>x</path></read_file>");
        assert!(!result.calls_found);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            tool_names: vec!["tool_call".to_string()],
            ..Default::default()
        };
        assert!(MultiFormatExtractor::from_config(&config).is_err());
    }
}
