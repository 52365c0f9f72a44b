/// Tool call extraction for multi-format model output
///
/// This module detects which call syntax a model used, extracts calls in batch,
/// and drives the incremental state machine for streamed output.
// Core modules
pub mod detector;
pub mod errors;
pub mod extractor;
pub mod partial_tag;
pub mod request;
pub mod sanitizer;
pub mod sentinels;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod vocabulary;

// Format-specific extractors
pub mod parsers;

// Re-export types used outside this module
pub use detector::{FormatDetector, ToolCallFormat};
pub use errors::{ParserError, ParserResult};
pub use extractor::MultiFormatExtractor;
pub use partial_tag::{PartialTagMatch, PartialTagRecognizer};
pub use request::{RequestOptions, ToolChoice, adjust_request};
pub use sanitizer::ContentSanitizer;
pub use sentinels::{Sentinel, SentinelFragments, SentinelTokenizer};
pub use streaming::{EmittedCall, StreamState};
pub use traits::FormatExtractor;
pub use types::{
    DeltaMessage, DeltaToolCall, ExtractionResult, FunctionCall, ParsedCall, ParsedCalls,
    ToolCall,
};
pub use vocabulary::{DEFAULT_TOOL_NAMES, Vocabulary};
