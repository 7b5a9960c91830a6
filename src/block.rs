//! Block Extraction
//!
//! Splits a component file into its script, style and markup regions. Only the
//! first `<tag ...>` / `</tag>` pair of each kind is taken; any further blocks
//! of the same kind stay in the markup untouched.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TS_LANG_RE: Regex =
        Regex::new(r#"(?i)\b(?:lang|type)\s*=\s*["'](?:ts|typescript)["']"#).unwrap();
}

/// One extracted region, including its open and close tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub raw: String,
    pub present: bool,
}

impl Block {
    /// An empty `<tag>` / `</tag>` pair standing in for a missing region.
    pub fn shell(tag: &str) -> Self {
        Block {
            raw: format!("<{}>\n</{}>", tag, tag),
            present: false,
        }
    }

    /// Trimmed block, or the empty shell when the region was not found.
    fn or_shell(raw: String, tag: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Block::shell(tag)
        } else {
            Block {
                raw: trimmed.to_string(),
                present: true,
            }
        }
    }

    /// Everything up to and including the `>` of the opening tag.
    pub fn opening_tag(&self) -> &str {
        match self.raw.find('>') {
            Some(end) => &self.raw[..=end],
            None => &self.raw,
        }
    }

    /// Insert `code` right before the closing `</tag>`.
    pub fn append(&mut self, tag: &str, code: &str) {
        let close = format!("</{}>", tag);
        match self.raw.rfind(&close) {
            Some(pos) => self.raw.insert_str(pos, code),
            None => self.raw.push_str(code),
        }
    }

    pub fn is_typescript(&self) -> bool {
        TS_LANG_RE.is_match(self.opening_tag())
    }
}

/// Find `<tag` where the name is not just a prefix of a longer tag name.
fn find_open_tag(content: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{}", tag);
    content.match_indices(&needle).map(|(i, _)| i).find(|&i| {
        match content[i + needle.len()..].chars().next() {
            Some(c) => c.is_whitespace() || c == '>' || c == '/',
            None => false,
        }
    })
}

/// Cut the first `<tag ...>...</tag>` span out of `content`.
///
/// Returns the span (empty when either tag is missing) and the remaining content.
pub fn extract_block(content: &str, tag: &str) -> (String, String) {
    let Some(start) = find_open_tag(content, tag) else {
        return (String::new(), content.to_string());
    };
    let close = format!("</{}>", tag);
    let Some(close_offset) = content[start..].find(&close) else {
        return (String::new(), content.to_string());
    };
    let end = start + close_offset + close.len();

    let block = content[start..end].to_string();
    let mut remainder = String::with_capacity(content.len() - block.len());
    remainder.push_str(&content[..start]);
    remainder.push_str(&content[end..]);
    (block, remainder)
}

/// The three regions of a component file.
#[derive(Debug, Clone)]
pub struct SourceBlocks {
    pub script: Block,
    pub style: Block,
    pub body: String,
}

impl SourceBlocks {
    pub fn split(content: &str) -> Self {
        let (script, rest) = extract_block(content, "script");
        let (style, rest) = extract_block(rest.trim(), "style");

        SourceBlocks {
            script: Block::or_shell(script, "script"),
            style: Block::or_shell(style, "style"),
            body: rest.trim().to_string(),
        }
    }
}
