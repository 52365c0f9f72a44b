use serde_json::Value;

use crate::tool_parser::{
    errors::{ParserError, ParserResult},
    types::ToolCall,
};

/// Byte offset just past the `}` that closes the first JSON object in `text`.
///
/// Braces inside string literals are ignored. Returns `None` while the object
/// is still open (or when no `{` has been seen).
pub fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => depth += 1,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Re-serialize an arguments value so source whitespace and key order never
/// leak into the output. Non-ASCII text is kept as-is.
pub fn canonical_arguments(value: &Value) -> ParserResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Normalize the arguments/parameters field in a tool call object.
/// If the object has "parameters" but not "arguments", copy parameters to arguments.
pub fn normalize_arguments_field(mut obj: Value) -> Value {
    if obj.get("arguments").is_none() {
        if let Some(params) = obj.get("parameters").cloned() {
            if let Value::Object(ref mut map) = obj {
                map.insert("arguments".to_string(), params);
            }
        }
    }
    obj
}

/// Build a call from a decoded `{"name": ..., "arguments": ...}` object.
pub fn call_from_object(obj: &Value) -> ParserResult<ToolCall> {
    let map = obj
        .as_object()
        .ok_or_else(|| {
            ParserError::ParsingFailed("call payload is not a JSON object".to_string())
        })?;

    let name = map
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(ParserError::MissingField("name"))?;
    let arguments = map
        .get("arguments")
        .ok_or(ParserError::MissingField("arguments"))?;

    Ok(ToolCall::new(name, canonical_arguments(arguments)?))
}
