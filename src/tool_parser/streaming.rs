use std::{borrow::Cow, ops::Range};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    reasoning::ReasoningMode,
    tool_parser::{
        detector::{ARGUMENTS_KEY, NAME_KEY},
        extractor::MultiFormatExtractor,
        parsers::{EnvelopeParser, helpers},
        sentinels::FragmentKind,
        traits::FormatExtractor,
        types::{DeltaMessage, DeltaToolCall, ParsedCall, ToolCall},
    },
};

/// `<` followed by something that could start a tag name
static TAG_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z_]").expect("valid regex"));

/// A call already surfaced on a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedCall {
    pub name: String,
    /// Parsed form of the emitted argument string
    pub arguments: Value,
}

/// Per-stream emission state.
///
/// Create one per generation stream and pass it to every
/// [`MultiFormatExtractor::extract_delta`] call of that stream. Never reuse
/// it for another stream.
#[derive(Debug, Clone)]
pub struct StreamState {
    /// Index of the last emitted call; -1 until the first one
    next_call_index: i32,
    emitted_calls: Vec<EmittedCall>,
    /// Exact argument strings sent, parallel to `emitted_calls`
    emitted_arg_strings: Vec<String>,
    /// Sentinel fragments held back until the final fragment arrives
    pending_sentinel_buffer: String,
    /// Where detection starts in the cumulative text; moves past each call
    scan_start: usize,
    /// How much of the cumulative text has been surfaced or consumed
    narration_cursor: usize,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            next_call_index: -1,
            emitted_calls: Vec::new(),
            emitted_arg_strings: Vec::new(),
            pending_sentinel_buffer: String::new(),
            scan_start: 0,
            narration_cursor: 0,
        }
    }
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_call_index(&self) -> i32 {
        self.next_call_index
    }

    pub fn emitted_calls(&self) -> &[EmittedCall] {
        &self.emitted_calls
    }

    pub fn emitted_arg_strings(&self) -> &[String] {
        &self.emitted_arg_strings
    }

    pub fn pending_sentinel_buffer(&self) -> &str {
        &self.pending_sentinel_buffer
    }

    pub fn has_emitted(&self) -> bool {
        self.next_call_index >= 0 && !self.emitted_calls.is_empty()
    }

    /// Consume the state, returning every call emitted on the stream.
    pub fn finish(self) -> Vec<ToolCall> {
        self.emitted_calls
            .into_iter()
            .zip(self.emitted_arg_strings)
            .map(|(call, arguments)| ToolCall::new(call.name, arguments))
            .collect()
    }

    fn record(&mut self, call: &ToolCall) -> usize {
        self.next_call_index += 1;
        let arguments = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
        self.emitted_calls.push(EmittedCall {
            name: call.function.name.clone(),
            arguments,
        });
        self.emitted_arg_strings.push(call.function.arguments.clone());
        self.emitted_calls.len() - 1
    }
}

/// Decision for the text after `scan_start`.
enum Step {
    /// Could still become a call
    Suppress(&'static str),
    /// Nothing call-like: surface everything up to the end
    Flush,
    /// The text up to `to` is settled narration; keep scanning after it
    Advance { to: usize, skip_narration: bool },
    /// A complete call spans `start..end`; narration before it stops at
    /// `narration_end`
    Emit {
        call: ToolCall,
        start: usize,
        end: usize,
        narration_end: usize,
    },
}

/// Cumulative text with held-back sentinel fragments spliced in.
struct Spliced<'a> {
    text: Cow<'a, str>,
    /// Offset where the held fragments were spliced
    at: usize,
}

impl<'a> Spliced<'a> {
    fn new(current: &'a str, delta: &str, pending: &str) -> Self {
        if pending.is_empty() || current.ends_with(pending) {
            return Self {
                text: Cow::Borrowed(current),
                at: current.len(),
            };
        }
        let head = current.strip_suffix(delta).unwrap_or(current);
        Self {
            text: Cow::Owned(format!("{head}{pending}")),
            at: head.len(),
        }
    }

    /// Map an offset in the spliced text back onto `current`.
    fn to_current(&self, pos: usize, current: &str) -> usize {
        if pos <= self.at {
            return pos.min(current.len());
        }
        let extra = self.text.len().saturating_sub(current.len());
        let mut mapped = pos.saturating_sub(extra).max(self.at).min(current.len());
        while !current.is_char_boundary(mapped) {
            mapped -= 1;
        }
        mapped
    }
}

impl MultiFormatExtractor {
    /// Process one streamed delta.
    ///
    /// `current` is the cumulative text including `delta`. Returns `None`
    /// when nothing should be surfaced yet. Text is never surfaced twice and
    /// a call is never emitted twice. A message carrying a call may also carry
    /// narration that was held back while the text was ambiguous.
    pub fn extract_delta(
        &self,
        state: &mut StreamState,
        previous: &str,
        current: &str,
        delta: &str,
    ) -> Option<DeltaMessage> {
        if self.stream_closed(state) || (delta.is_empty() && current == previous) {
            return None;
        }

        let kind = self.fragments.classify(delta);
        match kind {
            FragmentKind::Leading => {
                state.pending_sentinel_buffer.push_str(delta);
                debug!(buffer = %state.pending_sentinel_buffer, "Holding sentinel fragment");
                return None;
            }
            FragmentKind::Final => state.pending_sentinel_buffer.push_str(delta),
            FragmentKind::Other => state.pending_sentinel_buffer.clear(),
        }

        let spliced = Spliced::new(current, delta, &state.pending_sentinel_buffer);
        let message = self.run_steps(state, current, &spliced);

        if kind == FragmentKind::Final {
            state.pending_sentinel_buffer.clear();
        }
        message
    }

    /// Flush a stream after its last delta.
    ///
    /// Runs the batch path over whatever is still held back: an unterminated
    /// call is emitted if the stream may still emit one, otherwise the held
    /// text is surfaced as narration.
    pub fn finish_stream(&self, state: &mut StreamState, final_text: &str) -> Option<DeltaMessage> {
        if self.stream_closed(state) {
            return None;
        }
        state.pending_sentinel_buffer.clear();

        let base = state.scan_start;
        let window = final_text.get(base..)?;
        let mut message = DeltaMessage::default();

        let parsed = self.detector.detect(window).and_then(|format| {
            match self.parser_for(format).parse_calls(window) {
                Ok(parsed) if !parsed.calls.is_empty() => Some(parsed),
                Ok(_) => None,
                Err(e) => {
                    warn!(
                        format = %format,
                        error = %e,
                        "Tool call extraction failed at end of stream"
                    );
                    None
                }
            }
        });

        let Some(parsed) = parsed else {
            let rest = final_text.get(state.narration_cursor..).unwrap_or_default();
            let rest = match self.reasoning_mode {
                ReasoningMode::Passthrough => rest,
                ReasoningMode::Discard => self.reasoning.strip(rest),
            };
            if !rest.is_empty() {
                push_narration(&mut message, rest.to_string());
            }
            state.narration_cursor = final_text.len();
            state.scan_start = final_text.len();
            return (!message.is_empty()).then_some(message);
        };

        let take = if self.multi_call { parsed.calls.len() } else { 1 };
        for ParsedCall { call, start, end } in parsed.calls.into_iter().take(take) {
            let (start, end) = (base + start, base + end);
            self.emit(state, final_text, call, start..end, start, &mut message);
        }

        if self.multi_call {
            if let Some(tail) = final_text
                .get(state.narration_cursor..)
                .and_then(|tail| self.narration_for(tail))
            {
                push_narration(&mut message, tail);
            }
            state.narration_cursor = final_text.len();
            state.scan_start = final_text.len();
        }

        (!message.is_empty()).then_some(message)
    }

    /// Single-call streams stop after their first call.
    fn stream_closed(&self, state: &StreamState) -> bool {
        !self.multi_call && state.has_emitted()
    }

    fn run_steps(
        &self,
        state: &mut StreamState,
        current: &str,
        spliced: &Spliced<'_>,
    ) -> Option<DeltaMessage> {
        let text = spliced.text.as_ref();
        let mut message = DeltaMessage::default();

        loop {
            if self.stream_closed(state) {
                break;
            }
            if text.get(state.scan_start..).is_none() {
                warn!(
                    scan_start = state.scan_start,
                    len = text.len(),
                    "Cumulative text does not extend the previous text"
                );
                break;
            }

            match self.decide(text, state.scan_start) {
                Step::Suppress(reason) => {
                    debug!(reason, "Suppressing streamed text");
                    break;
                }
                Step::Flush => {
                    flush(state, current, &mut message);
                    break;
                }
                Step::Advance { to, skip_narration } => {
                    let to = spliced.to_current(to, current);
                    if to <= state.scan_start {
                        break;
                    }
                    state.scan_start = to;
                    if skip_narration {
                        state.narration_cursor = state.narration_cursor.max(to);
                    }
                }
                Step::Emit {
                    call,
                    start,
                    end,
                    narration_end,
                } => {
                    let span = spliced.to_current(start, current)..spliced.to_current(end, current);
                    let narration_end = spliced.to_current(narration_end, current);
                    self.emit(state, current, call, span, narration_end, &mut message);
                }
            }
        }

        (!message.is_empty()).then_some(message)
    }

    fn decide(&self, text: &str, start: usize) -> Step {
        let window = &text[start..];
        let lead = window.len() - window.trim_start().len();

        if self.reasoning.starts_block(window) {
            let Some(split) = self.reasoning.split(window) else {
                return Step::Suppress("reasoning block still open");
            };
            let rest = split.remainder.trim_start();
            if rest.is_empty() {
                return Step::Suppress("waiting for text after reasoning block");
            }
            if rest.starts_with('{') {
                let object_start =
                    start + split.remainder_start + (split.remainder.len() - rest.len());
                return self.decide_bare_object(text, object_start, true);
            }
            // Prose follows: the block is plain narration
            return Step::Advance {
                to: start + split.remainder_start,
                skip_narration: self.reasoning_mode == ReasoningMode::Discard,
            };
        }

        if window[lead..].starts_with('{') {
            return self.decide_bare_object(text, start + lead, false);
        }

        if window.contains('<') {
            return self.decide_tagged(text, start);
        }

        Step::Flush
    }

    fn decide_bare_object(&self, text: &str, object_start: usize, after_reasoning: bool) -> Step {
        let object = &text[object_start..];
        if !object.contains(NAME_KEY) {
            return Step::Suppress("JSON object without name yet");
        }
        if after_reasoning && !object.contains(ARGUMENTS_KEY) {
            return Step::Suppress("JSON object after reasoning without arguments yet");
        }
        let Some(len) = helpers::balanced_object_end(object) else {
            return Step::Suppress("JSON object not balanced yet");
        };

        let mut unknown_names = Vec::new();
        match self.bare.parse_object(&object[..len], &mut unknown_names) {
            Ok(Some(call)) => Step::Emit {
                call,
                start: object_start,
                end: object_start + len,
                narration_end: object_start,
            },
            Ok(None) => Step::Advance {
                to: object_start + len,
                skip_narration: false,
            },
            Err(e) => {
                debug!(error = %e, "Balanced object is not valid JSON");
                Step::Advance {
                    to: object_start + len,
                    skip_narration: false,
                }
            }
        }
    }

    fn decide_tagged(&self, text: &str, start: usize) -> Step {
        let window = &text[start..];

        // Same priority as batch detection. Vocabulary tags inside an open
        // envelope belong to its JSON payload.
        let confirmed = if self.detector.is_tagged_json(window) {
            self.tagged
                .has_complete_envelope(window)
                .then(|| first_closed_call(&self.tagged, window))
        } else if self.detector.is_wrapper_json(window)
            && self.wrapper.has_complete_envelope(window)
        {
            Some(first_closed_call(&self.wrapper, window))
        } else {
            let scope = self.wrapper.open_envelope_start(window).unwrap_or(window.len());
            self.xml
                .complete_call(&window[..scope])
                .map(|parsed| Some((parsed.start, parsed)))
        };

        match confirmed {
            Some(Some((narration_end, parsed))) => {
                return Step::Emit {
                    call: parsed.call,
                    start: start + parsed.start,
                    end: start + parsed.end,
                    narration_end: start + narration_end,
                };
            }
            Some(None) => return Step::Suppress("closed envelope without a valid call"),
            None => {}
        }

        let partial = self.recognizer.check(window);
        if partial.accumulating {
            debug!(name = ?partial.name, "Accumulating possible tag");
            return Step::Suppress("partial tag");
        }
        if TAG_START.is_match(window) {
            return Step::Suppress("unknown tag start");
        }
        Step::Flush
    }

    fn emit(
        &self,
        state: &mut StreamState,
        current: &str,
        call: ToolCall,
        span: Range<usize>,
        narration_end: usize,
        message: &mut DeltaMessage,
    ) {
        let narration = current
            .get(state.narration_cursor..narration_end)
            .and_then(|before| self.narration_for(before));
        if let Some(narration) = narration {
            push_narration(message, narration);
        }

        let index = state.record(&call);
        let id = format!("{}{}", self.call_id_prefix, Uuid::new_v4().simple());
        debug!(index, id = %id, name = %call.function.name, "Emitting streamed tool call");

        message.tool_calls.push(DeltaToolCall {
            index,
            id,
            call_type: "function".to_string(),
            function: call.function,
        });

        state.scan_start = span.end;
        state.narration_cursor = state.narration_cursor.max(span.end);
    }
}

/// First call of an envelope whose closing sentinel has arrived, with the
/// offset of the first start sentinel. Malformed envelopes before it are
/// skipped and never surface as narration.
fn first_closed_call(parser: &EnvelopeParser, window: &str) -> Option<(usize, ParsedCall)> {
    let sentinel = parser.sentinel();
    let call = parser
        .parse_calls(window)
        .ok()?
        .calls
        .into_iter()
        .find(|parsed| window[..parsed.end].ends_with(sentinel.end))?;
    let narration_end = window.find(sentinel.start).unwrap_or(call.start);
    Some((narration_end.min(call.start), call))
}

fn flush(state: &mut StreamState, current: &str, message: &mut DeltaMessage) {
    if let Some(rest) = current.get(state.narration_cursor..) {
        if !rest.is_empty() {
            push_narration(message, rest.to_string());
        }
    }
    state.narration_cursor = state.narration_cursor.max(current.len());
}

fn push_narration(message: &mut DeltaMessage, text: String) {
    match &mut message.narration {
        Some(existing) => existing.push_str(&text),
        None => message.narration = Some(text),
    }
}
