use crate::tool_parser::sentinels::ENVELOPES;

/// Tool names recognized by the tag-per-call syntax, in priority order.
pub const DEFAULT_TOOL_NAMES: &[&str] = &[
    "execute_command",
    "read_file",
    "write_to_file",
    "apply_diff",
    "search_files",
    "list_files",
    "list_code_definition_names",
    "browser_action",
    "use_mcp_tool",
    "access_mcp_resource",
    "ask_followup_question",
    "attempt_completion",
    "switch_mode",
    "new_task",
    "fetch_instructions",
];

/// A tag name found in text: index into the vocabulary plus whether it was
/// written as a closing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRef {
    pub index: usize,
    pub closing: bool,
}

/// Longest known tag starting at a `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHit {
    pub tag: TagRef,
    /// Byte offset of the `<`
    pub start: usize,
    /// Byte offset just past the name
    pub name_end: usize,
    /// Whether the name is immediately followed by `>`
    pub complete: bool,
}

impl TagHit {
    /// Byte offset just past the tag, including `>` when present.
    pub fn end(&self) -> usize {
        if self.complete {
            self.name_end + 1
        } else {
            self.name_end
        }
    }
}

#[derive(Debug, Clone)]
struct TrieNode {
    children: Vec<(char, usize)>,
    terminal: Option<TagRef>,
    /// Smallest name index reachable from this node
    min_index: usize,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            terminal: None,
            min_index: usize::MAX,
        }
    }
}

/// Prefix trie over `<name` and `</name` for every known name.
#[derive(Debug, Clone)]
struct TagTrie {
    nodes: Vec<TrieNode>,
}

impl TagTrie {
    const ROOT: usize = 0;

    fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new()],
        }
    }

    fn insert(&mut self, pattern: &str, tag: TagRef) {
        let mut node = Self::ROOT;
        self.nodes[node].min_index = self.nodes[node].min_index.min(tag.index);
        for ch in pattern.chars() {
            node = match self.child(node, ch) {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::new());
                    self.nodes[node].children.push((ch, next));
                    next
                }
            };
            self.nodes[node].min_index = self.nodes[node].min_index.min(tag.index);
        }
        // First registration wins for duplicated names
        if self.nodes[node].terminal.is_none() {
            self.nodes[node].terminal = Some(tag);
        }
    }

    fn child(&self, node: usize, ch: char) -> Option<usize> {
        self.nodes[node]
            .children
            .iter()
            .find_map(|&(c, next)| (c == ch).then_some(next))
    }
}

/// Fixed, ordered set of recognized call names.
///
/// Holds the tool names followed by the envelope names (`tool_call`, `tools`)
/// so partial-tag recognition and sanitizing cover both with one trie walk.
/// Immutable after construction and cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    names: Vec<String>,
    tool_count: usize,
    trie: TagTrie,
}

impl Vocabulary {
    pub fn new<I, S>(tool_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = tool_names.into_iter().map(Into::into).collect();
        let tool_count = names.len();
        names.extend(ENVELOPES.iter().map(|s| s.name.to_string()));

        let mut trie = TagTrie::new();
        for (index, name) in names.iter().enumerate() {
            trie.insert(&format!("<{}", name), TagRef { index, closing: false });
            trie.insert(&format!("</{}", name), TagRef { index, closing: true });
        }

        Self {
            names,
            tool_count,
            trie,
        }
    }

    /// Tool names in declared order (envelope names excluded).
    pub fn tool_names(&self) -> &[String] {
        &self.names[..self.tool_count]
    }

    pub fn len(&self) -> usize {
        self.tool_count
    }

    pub fn is_empty(&self) -> bool {
        self.tool_count == 0
    }

    /// Name for an index returned by a tag lookup.
    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn is_tool(&self, index: usize) -> bool {
        index < self.tool_count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tool_names().iter().any(|n| n == name)
    }

    pub fn opening_tag(&self, index: usize) -> String {
        format!("<{}>", self.names[index])
    }

    pub fn closing_tag(&self, index: usize) -> String {
        format!("</{}>", self.names[index])
    }

    /// Longest known tag (opening or closing, tool or envelope) starting at
    /// byte offset `pos`.
    pub fn tag_at(&self, text: &str, pos: usize) -> Option<TagHit> {
        let rest = text.get(pos..)?;
        let mut node = TagTrie::ROOT;
        let mut best: Option<(TagRef, usize)> = None;

        for (offset, ch) in rest.char_indices() {
            match self.trie.child(node, ch) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(tag) = self.trie.nodes[node].terminal {
                best = Some((tag, pos + offset + ch.len_utf8()));
            }
        }

        best.map(|(tag, name_end)| TagHit {
            tag,
            start: pos,
            name_end,
            complete: text[name_end..].starts_with('>'),
        })
    }

    /// Every complete opening tag of a tool name, in text order.
    pub fn open_tags<'a>(&'a self, text: &'a str) -> impl Iterator<Item = TagHit> + 'a {
        text.match_indices('<')
            .filter_map(move |(pos, _)| self.tag_at(text, pos))
            .filter(move |hit| hit.complete && !hit.tag.closing && self.is_tool(hit.tag.index))
    }

    pub fn has_open_tag(&self, text: &str) -> bool {
        self.open_tags(text).next().is_some()
    }

    /// The opening tag of the first tool, in declared order, present in
    /// `text`; its earliest occurrence is returned.
    pub fn first_open_tag(&self, text: &str) -> Option<TagHit> {
        self.open_tags(text)
            .min_by_key(|hit| (hit.tag.index, hit.start))
    }

    /// Test whether `fragment` (a `<` with no `>` after it) is a prefix of,
    /// or has as a prefix, any known tag. Returns the best-guess name index,
    /// favouring declared order.
    pub fn match_partial(&self, fragment: &str) -> Option<usize> {
        let mut node = TagTrie::ROOT;
        let mut best: Option<usize> = None;

        for ch in fragment.chars() {
            match self.trie.child(node, ch) {
                Some(next) => node = next,
                // A known tag is a prefix of the fragment
                None => return best,
            }
            if let Some(tag) = self.trie.nodes[node].terminal {
                best = Some(best.map_or(tag.index, |b| b.min(tag.index)));
            }
        }

        if node == TagTrie::ROOT {
            return best;
        }
        // The fragment is a prefix of at least one known tag
        let reachable = self.trie.nodes[node].min_index;
        Some(best.map_or(reachable, |b| b.min(reachable)))
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_NAMES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes_follow_tools() {
        let vocab = Vocabulary::new(["read_file"]);
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.tool_names(), ["read_file"]);
        assert_eq!(vocab.name(1), "tool_call");
        assert_eq!(vocab.name(2), "tools");
        assert!(!vocab.is_tool(1));
        assert!(!vocab.contains("tool_call"));
    }

    #[test]
    fn test_tag_at_prefers_longest_name() {
        let vocab = Vocabulary::new(["read", "read_file"]);
        let text = "x <read_file> y";
        let hit = vocab.tag_at(text, 2).unwrap();
        assert_eq!(vocab.name(hit.tag.index), "read_file");
        assert!(hit.complete);
        assert_eq!(&text[hit.start..hit.end()], "<read_file>");

        let hit = vocab.tag_at("<reading", 0).unwrap();
        assert_eq!(vocab.name(hit.tag.index), "read");
        assert!(!hit.complete);
        assert_eq!(hit.end(), 5);
    }

    #[test]
    fn test_tag_at_closing() {
        let vocab = Vocabulary::default();
        let hit = vocab.tag_at("</tools>", 0).unwrap();
        assert!(hit.tag.closing);
        assert_eq!(vocab.name(hit.tag.index), "tools");
        assert!(vocab.tag_at("<unknown>", 0).is_none());
        assert!(vocab.tag_at("a < b", 2).is_none());
    }

    #[test]
    fn test_first_open_tag_uses_declared_order() {
        let vocab = Vocabulary::default();
        let text = "<write_to_file></write_to_file><read_file><read_file>";
        let hit = vocab.first_open_tag(text).unwrap();
        assert_eq!(vocab.name(hit.tag.index), "read_file");
        assert_eq!(hit.start, text.find("<read_file>").unwrap());
    }

    #[test]
    fn test_open_tags_skip_envelopes_and_partials() {
        let vocab = Vocabulary::default();
        assert!(!vocab.has_open_tag("<tool_call><tools>"));
        assert!(!vocab.has_open_tag("<read_file"));
        assert!(!vocab.has_open_tag("</read_file>"));
        assert!(vocab.has_open_tag("text <read_file> more"));
    }

    #[test]
    fn test_match_partial() {
        let vocab = Vocabulary::default();
        let idx = vocab.match_partial("<write_to").unwrap();
        assert_eq!(vocab.name(idx), "write_to_file");

        let idx = vocab.match_partial("</tool_c").unwrap();
        assert_eq!(vocab.name(idx), "tool_call");

        // Known tag is a prefix of the fragment
        let idx = vocab.match_partial("<read_file path=x").unwrap();
        assert_eq!(vocab.name(idx), "read_file");

        // Ambiguous prefix resolves to the earliest declared name
        let idx = vocab.match_partial("<tool").unwrap();
        assert_eq!(vocab.name(idx), "tool_call");

        assert!(vocab.match_partial("<div").is_none());
        assert!(vocab.match_partial("< b").is_none());
    }
}
