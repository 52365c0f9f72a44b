use std::sync::Arc;

use crate::tool_parser::vocabulary::Vocabulary;

/// Strips residual tag fragments from narration.
///
/// Every `<name>`, `</name>`, `<name` and `</name` for a vocabulary name or an
/// envelope name (`tool_call`, `tools`) is removed. Removal repeats until the
/// text is stable, so sanitizing is idempotent.
#[derive(Debug, Clone)]
pub struct ContentSanitizer {
    vocabulary: Arc<Vocabulary>,
}

impl ContentSanitizer {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Returns `None` when nothing but whitespace remains.
    pub fn sanitize(&self, text: &str) -> Option<String> {
        let mut current = text.to_string();
        while let Some(stripped) = self.strip_once(&current) {
            current = stripped;
        }

        let trimmed = current.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// One left-to-right removal pass. `None` when nothing was removed.
    fn strip_once(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut removed = false;

        let mut search = 0;
        while let Some(rel) = text[search..].find('<') {
            let pos = search + rel;
            match self.vocabulary.tag_at(text, pos) {
                Some(hit) => {
                    out.push_str(&text[copied..pos]);
                    copied = hit.end();
                    search = hit.end();
                    removed = true;
                }
                None => search = pos + 1,
            }
        }

        if !removed {
            return None;
        }
        out.push_str(&text[copied..]);
        Some(out)
    }
}
