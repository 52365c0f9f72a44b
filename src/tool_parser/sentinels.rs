use crate::tool_parser::errors::{ParserError, ParserResult};

/// Start/end string pair wrapping a JSON call payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    /// Tag name between the angle brackets
    pub name: &'static str,
    pub start: &'static str,
    pub end: &'static str,
}

/// `<tool_call>...</tool_call>`, the envelope the chat template asks for.
pub const TOOL_CALL: Sentinel = Sentinel {
    name: "tool_call",
    start: "<tool_call>",
    end: "</tool_call>",
};

/// `<tools>...</tools>`, emitted when the model confuses the tool list
/// header with the call envelope.
pub const TOOLS: Sentinel = Sentinel {
    name: "tools",
    start: "<tools>",
    end: "</tools>",
};

pub const ENVELOPES: [Sentinel; 2] = [TOOL_CALL, TOOLS];

/// Host tokenizer hook: decodes each token of `text` back into its own
/// string fragment.
pub trait SentinelTokenizer {
    fn decode_fragments(&self, text: &str) -> Vec<String>;
}

/// How a streamed delta relates to the sentinel token fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Not a sentinel fragment
    Other,
    /// A fragment that is not the last one of its sentinel
    Leading,
    /// The last fragment of the start or end sentinel
    Final,
}

/// Decoded sub-token fragments of the `<tool_call>` sentinels.
///
/// Tokenizers that split `<tool_call>` into several tokens deliver it as
/// several deltas; the streaming path holds back the leading fragments until
/// the final one arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelFragments {
    start: Vec<String>,
    end: Vec<String>,
}

impl SentinelFragments {
    /// Fragments for a tokenizer that keeps each sentinel as one token.
    pub fn whole(sentinel: Sentinel) -> Self {
        Self {
            start: vec![sentinel.start.to_string()],
            end: vec![sentinel.end.to_string()],
        }
    }

    /// Validate that the fragments concatenate to the sentinel strings.
    pub fn new(sentinel: Sentinel, start: Vec<String>, end: Vec<String>) -> ParserResult<Self> {
        check_spelling(sentinel.start, &start)?;
        check_spelling(sentinel.end, &end)?;
        Ok(Self { start, end })
    }

    pub fn from_tokenizer(
        tokenizer: &dyn SentinelTokenizer,
        sentinel: Sentinel,
    ) -> ParserResult<Self> {
        Self::new(
            sentinel,
            tokenizer.decode_fragments(sentinel.start),
            tokenizer.decode_fragments(sentinel.end),
        )
    }

    pub fn start(&self) -> &[String] {
        &self.start
    }

    pub fn end(&self) -> &[String] {
        &self.end
    }

    pub fn classify(&self, delta: &str) -> FragmentKind {
        let is_final = self.start.last().is_some_and(|f| f == delta)
            || self.end.last().is_some_and(|f| f == delta);
        if is_final {
            return FragmentKind::Final;
        }
        if self.start.iter().chain(self.end.iter()).any(|f| f == delta) {
            FragmentKind::Leading
        } else {
            FragmentKind::Other
        }
    }
}

impl Default for SentinelFragments {
    fn default() -> Self {
        Self::whole(TOOL_CALL)
    }
}

fn check_spelling(expected: &str, fragments: &[String]) -> ParserResult<()> {
    if fragments.is_empty()
        || fragments.iter().any(String::is_empty)
        || fragments.concat() != expected
    {
        return Err(ParserError::FragmentMismatch {
            sentinel: expected.to_string(),
            fragments: fragments.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SplitAtUnderscore;

    impl SentinelTokenizer for SplitAtUnderscore {
        fn decode_fragments(&self, text: &str) -> Vec<String> {
            match text.find('_') {
                Some(idx) => vec![text[..idx].to_string(), text[idx..].to_string()],
                None => vec![text.to_string()],
            }
        }
    }

    #[test]
    fn test_whole_fragments_are_final() {
        let fragments = SentinelFragments::default();
        assert_eq!(fragments.classify("<tool_call>"), FragmentKind::Final);
        assert_eq!(fragments.classify("</tool_call>"), FragmentKind::Final);
        assert_eq!(fragments.classify("<tool"), FragmentKind::Other);
    }

    #[test]
    fn test_split_fragments() {
        let fragments = SentinelFragments::from_tokenizer(&SplitAtUnderscore, TOOL_CALL).unwrap();
        assert_eq!(fragments.start(), ["<tool", "_call>"]);
        assert_eq!(fragments.classify("<tool"), FragmentKind::Leading);
        assert_eq!(fragments.classify("</tool"), FragmentKind::Leading);
        assert_eq!(fragments.classify("_call>"), FragmentKind::Final);
        assert_eq!(fragments.classify("hello"), FragmentKind::Other);
    }

    #[test]
    fn test_misspelled_fragments_rejected() {
        let err = SentinelFragments::new(
            TOOL_CALL,
            vec!["<tool".to_string(), "call>".to_string()],
            vec!["</tool_call>".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ParserError::FragmentMismatch { .. }));
    }
}
