//! Class Usage Inventory
//!
//! Walks an HTML5 parse tree of the markup depth-first and records which
//! classes the file uses itself and which it hands to child components.
//! This is reporting only; the rewrite in `markup` never consults the tree.
//!
//! html5ever lowercases tag and attribute names, so before parsing:
//! 1. `{...}` expressions become placeholders (they may contain `<` or `>`),
//! 2. `class:NAME` attribute names become indexed placeholder attributes,
//! 3. tags starting with an uppercase letter or `_` carry their original name.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::Attribute;
use indexmap::IndexSet;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

#[cfg(feature = "napi")]
use napi_derive::napi;

use crate::imports::ComponentTable;
use crate::markup::find_balanced_brace_end;
use crate::registry::{ExportedSet, CLASS_NAME};

const EXPR_PLACEHOLDER: &str = "__SPC_EXPR_";
const DIRECTIVE_ATTR: &str = "data-spc-directive-";
const ORIGINAL_NAME_ATTR: &str = "data-spc-name";

lazy_static! {
    static ref DIRECTIVE_RE: Regex =
        Regex::new(&format!(r"(\s)class:({})", CLASS_NAME)).unwrap();
    static ref COMPONENT_TAG_RE: Regex = Regex::new(r"<([A-Z_][A-Za-z0-9_.]*)(\s|>|/)").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct ClassUsage {
    /// Static classes and `class:` directive names on plain elements.
    pub used_classes: Vec<String>,
    /// Class names handed to child components through `class:` directives.
    pub passed_classes: Vec<String>,
    pub elements: u32,
    pub component_instances: u32,
}

impl ClassUsage {
    pub fn collect(body: &str, components: &ComponentTable) -> Self {
        let normalized = normalize_expressions(body);
        let (marked, directives) = mark_directives(&normalized);
        let marked = mark_component_tags(&marked);

        let dom = parse_document(RcDom::default(), Default::default()).one(marked.as_str());

        let lower = body.to_lowercase();
        let mut walker = UsageWalker {
            components,
            directives: &directives,
            keep_wrappers: lower.contains("<html")
                || lower.contains("<head")
                || lower.contains("<body"),
            used: IndexSet::new(),
            passed: IndexSet::new(),
            elements: 0,
            component_instances: 0,
        };
        walker.walk(&dom.document);

        ClassUsage {
            used_classes: walker.used.into_iter().collect(),
            passed_classes: walker.passed.into_iter().collect(),
            elements: walker.elements,
            component_instances: walker.component_instances,
        }
    }

    /// Exported classes that no plain element in the markup uses.
    pub fn unused_exports<'e>(&self, exported: &'e ExportedSet) -> Vec<&'e str> {
        exported
            .iter()
            .filter(|class| !self.used_classes.contains(class))
            .map(String::as_str)
            .collect()
    }
}

/// Replace every `{...}` with a placeholder so html5ever sees plain attribute values.
fn normalize_expressions(html: &str) -> String {
    let mut normalized = String::with_capacity(html.len());
    let mut counter = 0;
    let mut last = 0;
    let mut i = 0;

    while let Some(offset) = html[i..].find('{') {
        let start = i + offset;
        match find_balanced_brace_end(html, start) {
            Some(end) => {
                normalized.push_str(&html[last..start]);
                normalized.push_str(&format!("{}{}__", EXPR_PLACEHOLDER, counter));
                counter += 1;
                last = end;
                i = end;
            }
            None => i = start + 1,
        }
    }

    normalized.push_str(&html[last..]);
    normalized
}

/// `class:Name` -> `data-spc-directive-N`, returning the names by index.
fn mark_directives(html: &str) -> (String, Vec<String>) {
    let mut names = Vec::new();
    let marked = DIRECTIVE_RE.replace_all(html, |caps: &Captures| {
        names.push(caps[2].to_string());
        format!("{}{}{}", &caps[1], DIRECTIVE_ATTR, names.len() - 1)
    });
    (marked.into_owned(), names)
}

/// Keep the original casing of component-like tags in an attribute.
fn mark_component_tags(html: &str) -> String {
    COMPONENT_TAG_RE
        .replace_all(html, |caps: &Captures| {
            format!("<{} {}=\"{}\"{}", &caps[1], ORIGINAL_NAME_ATTR, &caps[1], &caps[2])
        })
        .into_owned()
}

struct UsageWalker<'a> {
    components: &'a ComponentTable,
    directives: &'a [String],
    keep_wrappers: bool,
    used: IndexSet<String>,
    passed: IndexSet<String>,
    elements: u32,
    component_instances: u32,
}

impl UsageWalker<'_> {
    fn walk(&mut self, handle: &Handle) {
        if let NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } = &handle.data
        {
            let tag = name.local.to_string();
            let is_wrapper = matches!(tag.as_str(), "html" | "head" | "body");
            if !is_wrapper || self.keep_wrappers {
                self.visit_element(&tag, &attrs.borrow());
            }
            if let Some(contents) = template_contents.borrow().as_ref() {
                self.walk(contents);
            }
        }

        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn visit_element(&mut self, tag: &str, attrs: &[Attribute]) {
        let name = attrs
            .iter()
            .find(|attr| &*attr.name.local == ORIGINAL_NAME_ATTR)
            .map(|attr| attr.value.to_string())
            .unwrap_or_else(|| tag.to_string());
        let is_component = self.components.is_component(&name);

        self.elements += 1;
        if is_component {
            self.component_instances += 1;
        }

        for attr in attrs {
            let local: &str = &attr.name.local;
            let value: &str = &attr.value;

            if local == "class" && !is_component {
                for token in value.split_whitespace() {
                    if !token.contains(EXPR_PLACEHOLDER) {
                        self.used.insert(token.to_string());
                    }
                }
                continue;
            }

            let Some(directive) = local
                .strip_prefix(DIRECTIVE_ATTR)
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| self.directives.get(index))
            else {
                continue;
            };

            if is_component {
                let alias = if value.is_empty() || value.contains(EXPR_PLACEHOLDER) {
                    directive.clone()
                } else {
                    value.to_string()
                };
                self.passed.insert(alias);
            } else {
                self.used.insert(directive.clone());
            }
        }
    }
}
