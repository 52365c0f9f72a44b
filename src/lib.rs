//! Multi-format tool call extraction for LLM output.
//!
//! Splits model output into user-facing narration and normalized tool calls,
//! regardless of which of the supported surface syntaxes the model used:
//!
//! - `<tool_call>{"name": ..., "arguments": ...}</tool_call>`
//! - `<tools>{"name": ..., "arguments": ...}</tools>`
//! - bare `{"name": ..., "arguments": ...}`, optionally after `<think>...</think>`
//! - `<tool_name><param>value</param></tool_name>`
//!
//! Both a batch path ([`MultiFormatExtractor::extract`]) and an incremental
//! path ([`MultiFormatExtractor::extract_delta`]) are provided.

pub mod config;
pub mod observability;
pub mod reasoning;
pub mod tool_parser;

pub use config::{ConfigError, ConfigResult, ExtractorConfig, ExtractorConfigBuilder};
pub use reasoning::ReasoningMode;
pub use tool_parser::{
    DeltaMessage, DeltaToolCall, ExtractionResult, FunctionCall, MultiFormatExtractor,
    StreamState, ToolCall, ToolCallFormat, Vocabulary,
};
