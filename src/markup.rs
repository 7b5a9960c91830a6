//! Swap-Table Builder
//!
//! Rewrites the class-related attributes of every open tag in the markup, in
//! document order:
//!
//! - **Component instances** (`<Child ...>` where `Child` is imported) lose
//!   their `class:local="alias"` directives and receive one
//!   `__spc_class_swap_table__={{...}}` prop mapping each of the child's
//!   exported classes to a generated class name.
//! - **Plain elements** have their exported classes routed through the
//!   incoming swap table, so a parent can replace them.
//!
//! The scan is string based; closing tags, comments and text are copied
//! through untouched, and so is every open tag whose attributes do not change.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{trace, warn};

use crate::error::PreprocessError;
use crate::hash::{hash_fragments, to_identifier};
use crate::imports::ComponentTable;
use crate::options::SelectorMatchMode;
use crate::registry::{DeclaredTable, ExportedSet, CLASS_NAME};

/// Prop carrying the swap table from parent to child.
pub const SWAP_TABLE_PROP: &str = "__spc_class_swap_table__";

/// Element that never has a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

lazy_static! {
    static ref TAG_NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_:.-]*").unwrap();
    static ref DIRECTIVE_NAME_RE: Regex = Regex::new(&format!("^{}$", CLASS_NAME)).unwrap();
}

/// Plain-element class name -> generated class handed to a child component.
pub type PassedMap = IndexMap<String, String>;

/// Declaration appended to the script block so the component accepts a swap table.
pub fn swap_table_field(typescript: bool) -> String {
    if typescript {
        format!("export let {}: Record<string, string> = {{}};\n", SWAP_TABLE_PROP)
    } else {
        format!("export let {} = {{}};\n", SWAP_TABLE_PROP)
    }
}

/// `__spc_class_swap_table__["name"] ?? "name"`
fn incoming_or(class: &str, fallback: &str) -> String {
    format!(
        "{}[{}] ?? {}",
        SWAP_TABLE_PROP,
        js_string(class),
        js_string(fallback)
    )
}

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Find the end of a balanced brace expression, handling strings and template literals.
/// Returns the index after the closing brace, or None if unbalanced.
pub(crate) fn find_balanced_brace_end(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    let mut in_string: Option<u8> = None;
    let mut in_template_literal = false;
    let mut template_brace_depth = 0usize;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if in_template_literal {
            if c == b'`' && template_brace_depth == 0 {
                in_template_literal = false;
            } else if c == b'$' && bytes.get(i + 1) == Some(&b'{') {
                template_brace_depth += 1;
                i += 2;
                continue;
            } else if c == b'}' && template_brace_depth > 0 {
                template_brace_depth -= 1;
            }
            i += 1;
            continue;
        }

        match c {
            b'"' | b'\'' => in_string = Some(c),
            b'`' => in_template_literal = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Index just past the closing quote of the quoted run starting at `start`.
/// `{...}` inside the quotes may contain the same quote character.
fn quoted_end(src: &str, start: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => i = find_balanced_brace_end(src, i)?,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Index of the `>` closing an open tag whose attributes start at `from`.
fn tag_end(src: &str, from: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = quoted_end(src, i)?,
            b'{' => i = find_balanced_brace_end(src, i)?,
            b'>' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenTag<'a> {
    pub name: &'a str,
    /// Raw attribute text, without the trailing `/` of a self-closing tag.
    pub attrs: &'a str,
    pub self_closing: bool,
}

impl OpenTag<'_> {
    /// Render with new attribute text, keeping the self-closing marker.
    fn render(&self, attrs: &str) -> String {
        let attrs = attrs.trim();
        let mut out = format!("<{}", self.name);
        if !attrs.is_empty() {
            out.push(' ');
            out.push_str(attrs);
        }
        if self.self_closing {
            out.push_str(" /");
        }
        out.push('>');
        out
    }
}

/// Call `rewrite` for every open tag in document order, splicing in any
/// replacement it returns.
pub(crate) fn rewrite_open_tags<E, F>(src: &str, mut rewrite: F) -> Result<String, E>
where
    F: FnMut(&OpenTag) -> Result<Option<String>, E>,
{
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    let mut i = 0;

    while let Some(offset) = src[i..].find('<') {
        let lt = i + offset;

        if src[lt..].starts_with("<!--") {
            match src[lt..].find("-->") {
                Some(end) => {
                    i = lt + end + 3;
                    continue;
                }
                None => break,
            }
        }

        let Some(name) = TAG_NAME_RE.find(&src[lt + 1..]) else {
            i = lt + 1;
            continue;
        };
        let name_end = lt + 1 + name.end();
        let boundary = src[name_end..].chars().next();
        if !matches!(boundary, Some(c) if c.is_whitespace() || c == '>' || c == '/') {
            i = lt + 1;
            continue;
        }
        let Some(gt) = tag_end(src, name_end) else {
            i = lt + 1;
            continue;
        };

        let raw_attrs = &src[name_end..gt];
        let trimmed = raw_attrs.trim_end();
        let (attrs, self_closing) = match trimmed.strip_suffix('/') {
            Some(rest) => (rest, true),
            None => (raw_attrs, false),
        };
        let tag = OpenTag {
            name: name.as_str(),
            attrs,
            self_closing,
        };

        if let Some(replacement) = rewrite(&tag)? {
            out.push_str(&src[last..lt]);
            out.push_str(&replacement);
            last = gt + 1;
        }
        i = gt + 1;
    }

    out.push_str(&src[last..]);
    Ok(out)
}

/// Expand `<Tag ... />` into `<Tag ...></Tag>`, except for void elements.
pub fn expand_self_closing(body: &str) -> String {
    let expanded: Result<String, std::convert::Infallible> = rewrite_open_tags(body, |tag| {
        if !tag.self_closing || VOID_ELEMENTS.contains(&tag.name.to_ascii_lowercase().as_str())
        {
            return Ok(None);
        }
        let open = OpenTag {
            self_closing: false,
            ..*tag
        };
        Ok(Some(format!("{}</{}>", open.render(tag.attrs), tag.name)))
    });
    match expanded {
        Ok(out) => out,
        Err(never) => match never {},
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttrValue<'a> {
    Empty,
    Quoted { quote: char, text: &'a str },
    Expression(&'a str),
    Bare(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attribute<'a> {
    pub name: &'a str,
    pub value: AttrValue<'a>,
    pub start: usize,
    pub end: usize,
}

impl<'a> Attribute<'a> {
    /// `class:NAME` -> `NAME`
    pub fn class_directive(&self) -> Option<&'a str> {
        self.name
            .strip_prefix("class:")
            .filter(|name| DIRECTIVE_NAME_RE.is_match(name))
    }
}

pub(crate) fn parse_attributes(src: &str) -> Vec<Attribute<'_>> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < len {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        // `{shorthand}` and `{...spread}`
        if bytes[i] == b'{' {
            let end = find_balanced_brace_end(src, i).unwrap_or(len);
            attrs.push(Attribute {
                name: &src[start..end],
                value: AttrValue::Empty,
                start,
                end,
            });
            i = end;
            continue;
        }

        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = &src[start..i];

        let mut j = i;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let mut value = AttrValue::Empty;
        if j < len && bytes[j] == b'=' {
            j += 1;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j).copied() {
                Some(quote) if quote == b'"' || quote == b'\'' => {
                    let (text_end, end) = match quoted_end(src, j) {
                        Some(end) => (end - 1, end),
                        None => (len, len),
                    };
                    value = AttrValue::Quoted {
                        quote: quote as char,
                        text: &src[j + 1..text_end],
                    };
                    i = end;
                }
                Some(b'{') => {
                    let (text_end, end) = match find_balanced_brace_end(src, j) {
                        Some(end) => (end - 1, end),
                        None => (len, len),
                    };
                    value = AttrValue::Expression(&src[j + 1..text_end]);
                    i = end;
                }
                Some(_) => {
                    let mut k = j;
                    while k < len && !bytes[k].is_ascii_whitespace() {
                        k += 1;
                    }
                    value = AttrValue::Bare(&src[j..k]);
                    i = k;
                }
                None => i = j,
            }
        }

        attrs.push(Attribute {
            name,
            value,
            start,
            end: i,
        });
    }

    attrs
}

/// Pending replacements over an attribute string.
#[derive(Default)]
struct Edits {
    edits: Vec<(usize, usize, String)>,
}

impl Edits {
    /// Drop an attribute together with the whitespace in front of it.
    fn remove(&mut self, src: &str, attr: &Attribute) {
        let start = src[..attr.start].trim_end().len();
        self.edits.push((start, attr.end, String::new()));
    }

    fn replace(&mut self, attr: &Attribute, text: String) {
        self.edits.push((attr.start, attr.end, text));
    }

    fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    fn apply(mut self, src: &str) -> String {
        self.edits.sort_by_key(|(start, _, _)| *start);
        let mut out = String::with_capacity(src.len());
        let mut last = 0;
        for (start, end, text) in self.edits {
            out.push_str(&src[last..start]);
            out.push_str(&text);
            last = end;
        }
        out.push_str(&src[last..]);
        out
    }
}

/// Split a class attribute value on whitespace outside `{...}`.
fn class_tokens(value: &str) -> Vec<&str> {
    let bytes = value.as_bytes();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            if let Some(s) = start.take() {
                tokens.push(&value[s..i]);
            }
            i += 1;
            continue;
        }
        if start.is_none() {
            start = Some(i);
        }
        if c == b'{' {
            i = find_balanced_brace_end(value, i).unwrap_or(bytes.len());
        } else {
            i += 1;
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

// ═══════════════════════════════════════════════════════════════════════════════
// REWRITER
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of rewriting a markup body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupRewrite {
    pub body: String,
    pub passed: PassedMap,
    /// Reactive statements to append to the script block, in creation order.
    pub bindings: Vec<String>,
}

pub struct MarkupRewriter<'a> {
    file_hash: &'a str,
    components: &'a ComponentTable,
    exported: &'a ExportedSet,
    declared: &'a DeclaredTable,
    mode: SelectorMatchMode,
    passed: PassedMap,
    bindings: Vec<String>,
}

impl<'a> MarkupRewriter<'a> {
    pub fn new(
        file_hash: &'a str,
        components: &'a ComponentTable,
        exported: &'a ExportedSet,
        declared: &'a DeclaredTable,
        mode: SelectorMatchMode,
    ) -> Self {
        MarkupRewriter {
            file_hash,
            components,
            exported,
            declared,
            mode,
            passed: PassedMap::new(),
            bindings: Vec::new(),
        }
    }

    pub fn rewrite(mut self, body: &str) -> Result<MarkupRewrite, PreprocessError> {
        let body = rewrite_open_tags(body, |tag| {
            if self.components.is_component(tag.name) {
                self.rewrite_component(tag).map(Some)
            } else {
                Ok(self.rewrite_element(tag))
            }
        })?;

        Ok(MarkupRewrite {
            body,
            passed: self.passed,
            bindings: self.bindings,
        })
    }

    /// Generated class for a class name handed down to a child.
    fn passed_hash(&mut self, class: &str) -> String {
        let file_hash = self.file_hash;
        self.passed
            .entry(class.to_string())
            .or_insert_with(|| hash_fragments([file_hash, class]))
            .clone()
    }

    fn rewrite_component(&mut self, tag: &OpenTag) -> Result<String, PreprocessError> {
        self.mode.require_literal(tag.name)?;

        let attrs = parse_attributes(tag.attrs);
        let mut edits = Edits::default();
        let mut explicit: IndexMap<String, String> = IndexMap::new();

        for attr in &attrs {
            let Some(local) = attr.class_directive() else {
                continue;
            };
            let alias = match attr.value {
                AttrValue::Empty => local,
                AttrValue::Quoted { text, .. } if DIRECTIVE_NAME_RE.is_match(text) => text,
                _ => {
                    warn!(
                        component = tag.name,
                        directive = attr.name,
                        "class directive on a component needs a plain class name alias; left untouched"
                    );
                    continue;
                }
            };
            let hash = self.passed_hash(alias);
            explicit.insert(local.to_string(), hash);
            edits.remove(tag.attrs, attr);
        }

        // Explicit directives win over declared defaults.
        let mut table: Vec<(&str, &str)> = Vec::new();
        if let Some(declared) = self.declared.get(tag.name) {
            for (class, hash) in declared {
                if !explicit.contains_key(class) {
                    table.push((class.as_str(), hash.as_str()));
                }
            }
        }
        for (class, hash) in &explicit {
            table.push((class.as_str(), hash.as_str()));
        }

        let entries: Vec<String> = table
            .iter()
            .map(|(class, hash)| {
                let value = if self.exported.contains(*class) {
                    incoming_or(class, hash)
                } else {
                    js_string(hash)
                };
                format!("{}: {}", js_string(class), value)
            })
            .collect();

        trace!(component = tag.name, entries = entries.len(), "swap table");

        let rest = edits.apply(tag.attrs);
        let attrs = format!("{}={{{{{}}}}} {}", SWAP_TABLE_PROP, entries.join(", "), rest.trim());
        Ok(tag.render(&attrs))
    }

    fn rewrite_element(&mut self, tag: &OpenTag) -> Option<String> {
        let attrs = parse_attributes(tag.attrs);
        let mut edits = Edits::default();
        let mut swaps: IndexMap<String, String> = IndexMap::new();

        for attr in &attrs {
            let Some(class) = attr.class_directive() else {
                continue;
            };
            if !self.exported.contains(class) {
                continue;
            }
            let condition = match attr.value {
                AttrValue::Empty => class,
                AttrValue::Expression(expr) => expr,
                _ => {
                    warn!(
                        element = tag.name,
                        directive = attr.name,
                        "class directive on an element needs an expression condition; left untouched"
                    );
                    continue;
                }
            };
            let binding = self.new_binding(class, condition);
            swaps.insert(class.to_string(), binding);
            edits.remove(tag.attrs, attr);
        }

        let class_attr = attrs.iter().find(|attr| attr.name == "class");
        match class_attr.map(|attr| (attr, attr.value)) {
            Some((attr, AttrValue::Quoted { quote, text })) => {
                if let Some(value) = self.rewrite_class_value(text, &mut swaps) {
                    edits.replace(attr, format!("class={}{}{}", quote, value, quote));
                }
            }
            Some((attr, AttrValue::Bare(text))) => {
                if let Some(value) = self.rewrite_class_value(text, &mut swaps) {
                    edits.replace(attr, format!("class=\"{}\"", value));
                }
            }
            Some((attr, AttrValue::Expression(expr))) if !swaps.is_empty() => {
                let mut parts = vec![format!("{{{}}}", expr)];
                parts.extend(swaps.drain(..).map(|(_, binding)| format!("{{{}}}", binding)));
                edits.replace(attr, format!("class=\"{}\"", parts.join(" ")));
            }
            _ => {}
        }

        if edits.is_empty() && swaps.is_empty() {
            return None;
        }

        let mut rest = edits.apply(tag.attrs);
        if !swaps.is_empty() {
            let classes: Vec<String> = swaps
                .values()
                .map(|binding| format!("{{{}}}", binding))
                .collect();
            rest = format!("class=\"{}\" {}", classes.join(" "), rest.trim());
        }

        trace!(element = tag.name, "rewrote class attributes");
        Some(tag.render(&rest))
    }

    /// Rewrite a static class list. Returns None when nothing changes.
    fn rewrite_class_value(
        &self,
        value: &str,
        swaps: &mut IndexMap<String, String>,
    ) -> Option<String> {
        let mut changed = false;
        let mut classes: Vec<String> = class_tokens(value)
            .into_iter()
            .map(|token| {
                if let Some(binding) = swaps.shift_remove(token) {
                    changed = true;
                    format!("{{{}}}", binding)
                } else if self.exported.contains(token) {
                    changed = true;
                    format!("{{{}}}", incoming_or(token, token))
                } else {
                    token.to_string()
                }
            })
            .collect();

        for (_, binding) in swaps.drain(..) {
            changed = true;
            classes.push(format!("{{{}}}", binding));
        }

        changed.then(|| classes.join(" "))
    }

    /// Declare `$: _spc_xxx = (condition) ? (incoming ?? "class") : "";` and return its name.
    fn new_binding(&mut self, class: &str, condition: &str) -> String {
        let counter = self.bindings.len().to_string();
        let name = to_identifier(&hash_fragments([self.file_hash, "binding", class, counter.as_str()]));
        self.bindings.push(format!(
            "$: {} = ({}) ? ({}) : \"\";\n",
            name,
            condition,
            incoming_or(class, class)
        ));
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_balanced_brace() {
        assert_eq!(find_balanced_brace_end("{hello}", 0), Some(7));
        assert_eq!(find_balanced_brace_end("{obj.map(x => x)}", 0), Some(17));
        assert_eq!(find_balanced_brace_end("{'string with { brace'}", 0), Some(23));
        assert_eq!(find_balanced_brace_end("{`a ${b} c`}", 0), Some(12));
        assert_eq!(find_balanced_brace_end("{open", 0), None);
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#" id="a" class:x={a > b} hidden {...rest} data-x=y title='it'"#);
        let names: Vec<&str> = attrs.iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["id", "class:x", "hidden", "{...rest}", "data-x", "title"]);
        assert_eq!(attrs[0].value, AttrValue::Quoted { quote: '"', text: "a" });
        assert_eq!(attrs[1].value, AttrValue::Expression("a > b"));
        assert_eq!(attrs[2].value, AttrValue::Empty);
        assert_eq!(attrs[4].value, AttrValue::Bare("y"));
        assert_eq!(attrs[5].value, AttrValue::Quoted { quote: '\'', text: "it" });
        assert_eq!(attrs[1].class_directive(), Some("x"));
        assert_eq!(attrs[0].class_directive(), None);
    }

    #[test]
    fn test_quoted_value_with_braces() {
        let attrs = parse_attributes(r#"class="a {on ? "b" : ""}" id=z"#);
        assert_eq!(
            attrs[0].value,
            AttrValue::Quoted {
                quote: '"',
                text: r#"a {on ? "b" : ""}"#
            }
        );
        assert_eq!(attrs[1].name, "id");
    }

    #[test]
    fn test_class_tokens() {
        assert_eq!(class_tokens("  a  b\tc "), vec!["a", "b", "c"]);
        assert_eq!(class_tokens("a {x ? 'b c' : ''} d"), vec!["a", "{x ? 'b c' : ''}", "d"]);
    }

    #[test]
    fn test_rewrite_open_tags_skips_comments_and_closers() {
        let src = "<div a>x</div><!-- <p b> --><Foo.Bar c/>";
        let mut seen = Vec::new();
        let out: Result<String, ()> = rewrite_open_tags(src, |tag| {
            seen.push((tag.name.to_string(), tag.attrs.trim().to_string(), tag.self_closing));
            Ok(None)
        });
        assert_eq!(out.unwrap(), src);
        assert_eq!(
            seen,
            vec![
                ("div".to_string(), "a".to_string(), false),
                ("Foo.Bar".to_string(), "c".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_rewrite_open_tags_ignores_less_than_in_text() {
        let src = "<p>{a < b} and a <b</p>";
        let mut count = 0;
        let out: Result<String, ()> = rewrite_open_tags(src, |_| {
            count += 1;
            Ok(None)
        });
        assert_eq!(out.unwrap(), src);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_expand_self_closing() {
        assert_eq!(expand_self_closing("<Button />"), "<Button></Button>");
        assert_eq!(
            expand_self_closing(r#"<Card prop="value" on:click={() => a > b}/>"#),
            r#"<Card prop="value" on:click={() => a > b}></Card>"#
        );
        assert_eq!(expand_self_closing("<br/><img src=\"x\" />"), "<br/><img src=\"x\" />");
        assert_eq!(expand_self_closing("<div></div>"), "<div></div>");
    }

    #[test]
    fn test_swap_table_field() {
        assert_eq!(
            swap_table_field(false),
            "export let __spc_class_swap_table__ = {};\n"
        );
        assert_eq!(
            swap_table_field(true),
            "export let __spc_class_swap_table__: Record<string, string> = {};\n"
        );
    }
}
