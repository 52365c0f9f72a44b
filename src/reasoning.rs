//! Reasoning-block handling.
//!
//! Models emit their rationale either as a `<think>...</think>` block or as a
//! timestamped log block (`- 2025-01-01 ...` followed by `- Result: ...`
//! lines). Both forms are split off here; whether the block is surfaced as
//! narration or dropped is decided by [`ReasoningMode`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THINK_START: &str = "<think>";
pub const DEFAULT_THINK_END: &str = "</think>";

static LOG_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^- \d{4}-\d{2}-\d{2}[^\n]*\n(?:\s*- (?:Result|Next|Step)[^\n]*\n)*")
        .expect("valid regex")
});

/// What to do with a leading reasoning block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    /// Surface the raw block, delimiters included, as narration
    #[default]
    Passthrough,
    /// Drop the block
    Discard,
}

/// Delimiters of a reasoning block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningTokens {
    pub think_start_token: String,
    pub think_end_token: String,
}

impl Default for ReasoningTokens {
    fn default() -> Self {
        Self {
            think_start_token: DEFAULT_THINK_START.to_string(),
            think_end_token: DEFAULT_THINK_END.to_string(),
        }
    }
}

/// A leading reasoning block split from the rest of the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningSplit<'a> {
    /// The raw block including both delimiters
    pub block: &'a str,
    /// Text between the delimiters
    pub inner: &'a str,
    /// Everything after the end delimiter
    pub remainder: &'a str,
    /// Byte offset in the input where `remainder` starts
    pub remainder_start: usize,
}

impl ReasoningTokens {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            think_start_token: start.into(),
            think_end_token: end.into(),
        }
    }

    /// Whether `text` (leading whitespace ignored) opens a reasoning block.
    pub fn starts_block(&self, text: &str) -> bool {
        text.trim_start().starts_with(&self.think_start_token)
    }

    /// Split a closed reasoning block from the start of `text`.
    ///
    /// Returns `None` if the text does not start with the start token, or the
    /// block is not closed yet.
    pub fn split<'a>(&self, text: &'a str) -> Option<ReasoningSplit<'a>> {
        let offset = text.len() - text.trim_start().len();
        let body = text[offset..].strip_prefix(self.think_start_token.as_str())?;
        let close = body.find(&self.think_end_token)?;

        let inner_start = offset + self.think_start_token.len();
        let remainder_start = inner_start + close + self.think_end_token.len();
        Some(ReasoningSplit {
            block: &text[offset..remainder_start],
            inner: &text[inner_start..inner_start + close],
            remainder: &text[remainder_start..],
            remainder_start,
        })
    }

    /// Remove a leading think block and a leading log block, if any.
    pub fn strip<'a>(&self, text: &'a str) -> &'a str {
        let rest = match self.split(text) {
            Some(split) => split.remainder,
            None => text,
        };
        let rest = rest.trim_start();
        match split_log_block(rest) {
            Some((_, after)) => after.trim_start(),
            None => rest,
        }
    }
}

/// Split a leading timestamped log block, returning `(block, remainder)`.
pub fn split_log_block(text: &str) -> Option<(&str, &str)> {
    LOG_BLOCK.find(text).map(|m| text.split_at(m.end()))
}
