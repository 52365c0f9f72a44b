use serde::{Deserialize, Serialize};

use crate::tool_parser::detector::ToolCallFormat;

/// Parsed tool call from model output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Function call details
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function call within a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the function to call
    pub name: String,
    /// Arguments as a canonical JSON string (re-serialized, never the raw substring)
    pub arguments: String,
}

/// Outcome of batch extraction over one complete span.
///
/// `calls_found` is always `!calls.is_empty()`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExtractionResult {
    pub calls_found: bool,
    pub calls: Vec<ToolCall>,
    /// User-facing text. `None` when nothing is left after sanitizing.
    pub narration: Option<String>,
    /// Syntax the calls were extracted from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ToolCallFormat>,
    /// Call names accepted from bare JSON although they are not in the vocabulary
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_names: Vec<String>,
}

impl ExtractionResult {
    /// No calls; the full span is surfaced verbatim.
    pub fn narration_only(text: &str) -> Self {
        Self {
            calls_found: false,
            calls: Vec::new(),
            narration: Some(text.to_string()),
            format: None,
            unknown_names: Vec::new(),
        }
    }

    pub fn with_calls(
        format: ToolCallFormat,
        calls: Vec<ToolCall>,
        narration: Option<String>,
    ) -> Self {
        Self {
            calls_found: !calls.is_empty(),
            calls,
            narration,
            format: Some(format),
            unknown_names: Vec::new(),
        }
    }
}

/// A call found by a format extractor, with the byte range of its source
/// text (opening tag or sentinel through closing tag, sentinel or brace).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub call: ToolCall,
    pub start: usize,
    pub end: usize,
}

/// Raw output of a format extractor before it is turned into an
/// [`ExtractionResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCalls {
    pub narration: Option<String>,
    pub calls: Vec<ParsedCall>,
    pub unknown_names: Vec<String>,
}

/// Tool call surfaced by one streaming step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeltaToolCall {
    /// Position of the call within the stream
    pub index: usize,
    /// Unique id minted when the call is emitted
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// What a streaming step surfaces to the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeltaMessage {
    #[serde(rename = "content", skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<DeltaToolCall>,
}

impl DeltaMessage {
    pub fn narration(text: impl Into<String>) -> Self {
        Self {
            narration: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.narration.as_deref().is_none_or(str::is_empty) && self.tool_calls.is_empty()
    }
}
