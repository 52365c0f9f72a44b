//! Batch extraction tests
//!
//! Covers each of the four syntaxes end to end through `MultiFormatExtractor`,
//! plus the fallbacks that keep extraction infallible.

use serde_json::{Value, json};
use tool_call_extractor::{
    ExtractionResult, ExtractorConfig, MultiFormatExtractor, ToolCallFormat,
};

fn args(result: &ExtractionResult, idx: usize) -> Value {
    serde_json::from_str(&result.calls[idx].function.arguments).unwrap()
}

#[test]
fn test_tagged_json_with_narration() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(
        "Hello<tool_call>\n{\"name\": \"read_file\", \"arguments\": {\"path\": \"a.txt\"}}\n</tool_call>",
    );

    assert!(result.calls_found);
    assert_eq!(result.calls.len(), 1);
    assert_eq!(result.calls[0].function.name, "read_file");
    assert_eq!(result.calls[0].function.arguments, r#"{"path":"a.txt"}"#);
    assert_eq!(result.narration.as_deref(), Some("Hello"));
}

#[test]
fn test_tag_per_call_without_narration() {
    let extractor = MultiFormatExtractor::new();
    let result =
        extractor.extract("<write_to_file><path>a.txt</path><content>hi</content></write_to_file>");

    assert!(result.calls_found);
    assert_eq!(result.calls[0].function.name, "write_to_file");
    assert_eq!(args(&result, 0), json!({"path": "a.txt", "content": "hi"}));
    assert_eq!(result.narration, None);
}

#[test]
fn test_object_without_call_keys_is_narration() {
    let extractor = MultiFormatExtractor::new();
    let text = "{\"foo\": 1}";
    let result = extractor.extract(text);

    assert!(!result.calls_found);
    assert!(result.calls.is_empty());
    assert_eq!(result.narration.as_deref(), Some(text));
}

#[test]
fn test_pure_narration_is_returned_verbatim() {
    let extractor = MultiFormatExtractor::new();
    let inputs = [
        "",
        "   leading and trailing   ",
        "Compare a < b and c > d.",
        "HTML like <div>this</div> is not a call.",
        "Mention read_file by name without a tag.",
        "Multi\nline\n\ttext",
    ];
    for text in inputs {
        let result = extractor.extract(text);
        assert!(!result.calls_found, "{text}");
        assert_eq!(result.narration.as_deref(), Some(text), "{text}");
    }
}

#[test]
fn test_arguments_are_canonical_json() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(
        "<tool_call>{ \"name\" : \"search_files\" ,\n  \"arguments\" : { \"path\" : \"src\" , \"regex\" : \"fn\\\\s+main\" , \"depth\" : 2 } }</tool_call>",
    );

    let raw = &result.calls[0].function.arguments;
    assert!(!raw.contains(' ') && !raw.contains('\n'));
    let value: Value = serde_json::from_str(raw).unwrap();
    assert_eq!(value, json!({"path": "src", "regex": "fn\\s+main", "depth": 2}));
    assert_eq!(serde_json::to_string(&value).unwrap(), *raw);
}

#[test]
fn test_parameters_alias() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor
        .extract(r#"<tool_call>{"name": "list_files", "parameters": {"path": "."}}</tool_call>"#);
    assert!(result.calls_found);
    assert_eq!(args(&result, 0), json!({"path": "."}));
}

#[test]
fn test_unicode_round_trips() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(
        "Écrivons 📝<tool_call>{\"name\": \"write_to_file\", \"arguments\": {\"path\": \"ü.txt\", \"content\": \"日本語\"}}</tool_call>",
    );
    assert_eq!(result.narration.as_deref(), Some("Écrivons 📝"));
    assert_eq!(args(&result, 0), json!({"path": "ü.txt", "content": "日本語"}));

    let result = extractor
        .extract("<write_to_file><path>ü.txt</path><content>héllo 👋</content></write_to_file>");
    assert_eq!(args(&result, 0), json!({"path": "ü.txt", "content": "héllo 👋"}));
}

#[test]
fn test_envelope_wins_over_vocabulary_tag() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(concat!(
        "<read_file><path>not this</path></read_file>",
        "<tool_call>{\"name\": \"list_files\", \"arguments\": {\"path\": \".\"}}</tool_call>",
    ));
    assert_eq!(result.format, Some(ToolCallFormat::TaggedJson));
    assert_eq!(result.calls.len(), 1);
    assert_eq!(result.calls[0].function.name, "list_files");
}

#[test]
fn test_multiple_envelopes_in_order() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(concat!(
        "Two things.\n",
        "<tool_call>{\"name\": \"read_file\", \"arguments\": {\"path\": \"a\"}}</tool_call>\n",
        "<tool_call>{\"name\": \"read_file\", \"arguments\": {\"path\": \"b\"}}</tool_call>",
    ));
    assert_eq!(result.calls.len(), 2);
    assert_eq!(args(&result, 0), json!({"path": "a"}));
    assert_eq!(args(&result, 1), json!({"path": "b"}));
    assert_eq!(result.narration.as_deref(), Some("Two things."));
}

#[test]
fn test_broken_envelope_falls_back_to_narration() {
    let extractor = MultiFormatExtractor::new();
    let text = "Trying <tool_call>{\"name\": \"read_file\", \"arguments\": {oops}}</tool_call>";
    let result = extractor.extract(text);
    assert!(!result.calls_found);
    assert_eq!(result.narration.as_deref(), Some(text));
}

#[test]
fn test_bare_json_after_reasoning() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(
        "<think>\nI should list the directory.\n</think>\n\n{\"name\": \"list_files\", \"arguments\": {\"path\": \".\"}}",
    );
    assert_eq!(result.format, Some(ToolCallFormat::BareJson));
    assert_eq!(args(&result, 0), json!({"path": "."}));
    assert_eq!(
        result.narration.as_deref(),
        Some("<think>\nI should list the directory.\n</think>")
    );
}

#[test]
fn test_discard_mode_drops_reasoning() {
    let config = ExtractorConfig::builder().discard_reasoning().build().unwrap();
    let extractor = MultiFormatExtractor::from_config(&config).unwrap();

    let result = extractor
        .extract("<think>plan</think>{\"name\": \"list_files\", \"arguments\": {\"path\": \".\"}}");
    assert!(result.calls_found);
    assert_eq!(result.narration, None);

    let result = extractor.extract("<think>plan</think> Just an answer.");
    assert_eq!(result.narration.as_deref(), Some("Just an answer."));
}

#[test]
fn test_unknown_bare_json_name_is_reported() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(r#"{"name": "deploy_prod", "arguments": {"force": true}}"#);
    assert!(result.calls_found);
    assert_eq!(result.unknown_names, ["deploy_prod"]);
    assert_eq!(args(&result, 0), json!({"force": true}));
}

#[test]
fn test_tag_narration_is_sanitized() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract(
        "I'll check </list_files> first. <read_file><path>src/main.rs</path></read_file>",
    );
    assert_eq!(result.calls[0].function.name, "read_file");
    assert_eq!(result.narration.as_deref(), Some("I'll check  first."));
}

#[test]
fn test_result_serializes() {
    let extractor = MultiFormatExtractor::new();
    let result = extractor.extract("<read_file><path>a</path></read_file>");
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["calls_found"], json!(true));
    assert_eq!(value["format"], json!("tag_per_call"));
    assert_eq!(value["calls"][0]["function"]["name"], json!("read_file"));
    assert_eq!(value["narration"], Value::Null);
}
