use std::sync::Arc;

use serde_json::{Map, Value};

use crate::tool_parser::{
    detector::ToolCallFormat,
    errors::ParserResult,
    parsers::helpers,
    sanitizer::ContentSanitizer,
    traits::FormatExtractor,
    types::{ParsedCall, ParsedCalls, ToolCall},
    vocabulary::{TagHit, Vocabulary},
};

/// Extractor for `<tool_name><param>value</param>...</tool_name>`.
///
/// At most one call is extracted per span: the first vocabulary name, in
/// declared order, whose opening tag is present. A missing closing tag means
/// the body runs to the end of the span.
pub struct XmlTagParser {
    vocabulary: Arc<Vocabulary>,
    sanitizer: ContentSanitizer,
}

/// Located call body.
struct CallSpan<'a> {
    open: TagHit,
    body: &'a str,
    end: usize,
    closed: bool,
}

impl XmlTagParser {
    pub fn new(vocabulary: Arc<Vocabulary>, sanitizer: ContentSanitizer) -> Self {
        Self {
            vocabulary,
            sanitizer,
        }
    }

    fn locate<'a>(&self, text: &'a str) -> Option<CallSpan<'a>> {
        let open = self.vocabulary.first_open_tag(text)?;
        let body_start = open.end();
        let closing = self.vocabulary.closing_tag(open.tag.index);

        Some(match text[body_start..].find(&closing) {
            Some(rel) => CallSpan {
                open,
                body: &text[body_start..body_start + rel],
                end: body_start + rel + closing.len(),
                closed: true,
            },
            None => CallSpan {
                open,
                body: &text[body_start..],
                end: text.len(),
                closed: false,
            },
        })
    }

    fn build_call(&self, span: &CallSpan<'_>) -> ParserResult<(ToolCall, usize)> {
        let params = parse_parameters(span.body);
        let count = params.len();
        let arguments = helpers::canonical_arguments(&Value::Object(params))?;
        Ok((
            ToolCall::new(self.vocabulary.name(span.open.tag.index), arguments),
            count,
        ))
    }

    /// The call, once its closing tag has arrived and at least one parameter
    /// was parsed. Used by the streaming path to confirm completion.
    pub fn complete_call(&self, text: &str) -> Option<ParsedCall> {
        let span = self.locate(text)?;
        if !span.closed {
            return None;
        }
        match self.build_call(&span) {
            Ok((call, count)) if count > 0 => Some(ParsedCall {
                call,
                start: span.open.start,
                end: span.end,
            }),
            _ => None,
        }
    }
}

impl FormatExtractor for XmlTagParser {
    fn format(&self) -> ToolCallFormat {
        ToolCallFormat::TagPerCall
    }

    fn has_tool_markers(&self, text: &str) -> bool {
        self.vocabulary.has_open_tag(text)
    }

    fn parse_calls(&self, text: &str) -> ParserResult<ParsedCalls> {
        let Some(span) = self.locate(text) else {
            return Ok(ParsedCalls::default());
        };

        let (call, _) = self.build_call(&span)?;
        Ok(ParsedCalls {
            narration: self.sanitizer.sanitize(&text[..span.open.start]),
            calls: vec![ParsedCall {
                call,
                start: span.open.start,
                end: span.end,
            }],
            unknown_names: Vec::new(),
        })
    }
}

/// Parse a flat sequence of `<key>value</key>` pairs.
///
/// Values are trimmed; a value starting with `{` or `[` is decoded as JSON
/// when it parses. Text outside the pairs is ignored.
fn parse_parameters(body: &str) -> Map<String, Value> {
    let mut params = Map::new();
    let mut pos = 0;

    while let Some(rel) = body[pos..].find('<') {
        let open = pos + rel;
        let Some((key, value_start)) = read_open_tag(body, open) else {
            pos = open + 1;
            continue;
        };

        let closing = format!("</{}>", key);
        match body[value_start..].find(&closing) {
            Some(close_rel) => {
                let raw = body[value_start..value_start + close_rel].trim();
                params.insert(key.to_string(), parameter_value(raw));
                pos = value_start + close_rel + closing.len();
            }
            None => pos = open + 1,
        }
    }
    params
}

/// `<key>` at `pos`: returns the key and the offset just past `>`.
fn read_open_tag(body: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = &body[pos + 1..];
    let key_len = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if key_len == 0 || !rest[key_len..].starts_with('>') {
        return None;
    }
    Some((&rest[..key_len], pos + 1 + key_len + 1))
}

fn parameter_value(raw: &str) -> Value {
    if raw.starts_with('{') || raw.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}
