use std::sync::Arc;

use crate::tool_parser::{
    sentinels::{TOOL_CALL, TOOLS},
    vocabulary::Vocabulary,
};

/// Result of checking whether the tail of a text could still grow into a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialTagMatch {
    pub accumulating: bool,
    /// Best guess at the tag being written, when one can be named
    pub name: Option<String>,
}

impl PartialTagMatch {
    fn none() -> Self {
        Self::default()
    }

    fn named(name: &str) -> Self {
        Self {
            accumulating: true,
            name: Some(name.to_string()),
        }
    }

    fn unnamed() -> Self {
        Self {
            accumulating: true,
            name: None,
        }
    }
}

/// Decides whether streamed text must be held back because it ends inside
/// an unfinished tag or an unclosed call.
#[derive(Debug, Clone)]
pub struct PartialTagRecognizer {
    vocabulary: Arc<Vocabulary>,
}

impl PartialTagRecognizer {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn check(&self, text: &str) -> PartialTagMatch {
        // A bare trailing `<` could start anything
        if text.trim_end().ends_with('<') {
            return PartialTagMatch::unnamed();
        }

        if let Some(pos) = text.rfind('<') {
            let fragment = &text[pos..];
            if !fragment.contains('>') {
                if let Some(index) = self.vocabulary.match_partial(fragment) {
                    return PartialTagMatch::named(self.vocabulary.name(index));
                }
            }
        }

        // Opening tag written, closing tag not yet
        for hit in self.vocabulary.open_tags(text) {
            let closing = self.vocabulary.closing_tag(hit.tag.index);
            if !text[hit.end()..].contains(&closing) {
                return PartialTagMatch::named(self.vocabulary.name(hit.tag.index));
            }
        }

        if text.contains(TOOL_CALL.start) && !text.contains(TOOL_CALL.end) {
            return PartialTagMatch::named(TOOL_CALL.name);
        }

        let tools_open = format!("<{}", TOOLS.name);
        if text.contains(&tools_open) && !text.contains(TOOLS.end) {
            return PartialTagMatch::named(TOOLS.name);
        }

        PartialTagMatch::none()
    }

    pub fn is_accumulating(&self, text: &str) -> bool {
        self.check(text).accumulating
    }
}
