//! Export/Declare Registry
//!
//! Two passes over the style block:
//!
//! 1. `:export(.name)` marks `name` as overridable by a parent and is rewritten
//!    to the plain selector `.name`.
//! 2. `:let(Child).name` binds the local rule to one of `Child`'s exported
//!    classes. The selector becomes `:global(.HASH)` and `HASH` is handed to
//!    every `<Child>` instance through its swap table.

use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::PreprocessError;
use crate::hash::hash_fragments;
use crate::imports::ComponentTable;
use crate::options::SelectorMatchMode;
use crate::replace::try_replace_all;

/// Class name as it may appear in a style block, escapes included.
pub const CLASS_NAME: &str = r"(?:[a-zA-Z0-9_-]|\\[^ a-zA-Z0-9_-])+";

lazy_static! {
    static ref EXPORT_RE: Regex =
        Regex::new(&format!(r":export\(\s*\.({})\s*\)", CLASS_NAME)).unwrap();
    static ref DECLARE_RE: Regex =
        Regex::new(&format!(r":let\(([^)]*)\)\.({})", CLASS_NAME)).unwrap();
}

/// Classes this file exposes for override by its parent.
pub type ExportedSet = IndexSet<String>;

/// Declared bindings: component name -> (child class -> generated class).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredTable {
    entries: IndexMap<String, IndexMap<String, String>>,
}

impl DeclaredTable {
    pub fn get(&self, component: &str) -> Option<&IndexMap<String, String>> {
        self.entries.get(component)
    }

    pub fn insert(&mut self, component: &str, class: &str, hash: String) {
        self.entries
            .entry(component.to_string())
            .or_default()
            .insert(class.to_string(), hash);
    }

    /// Total number of (component, class) bindings.
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrite `:export(.name)` to `.name`, collecting the exported names.
pub fn collect_exports(style: &str) -> Result<(String, ExportedSet), PreprocessError> {
    let mut exported = ExportedSet::new();
    let rewritten = try_replace_all(&EXPORT_RE, style, |caps| {
        let name = &caps[1];
        if !exported.insert(name.to_string()) {
            return Err(PreprocessError::DuplicateExport(name.to_string()));
        }
        Ok(format!(".{}", name))
    })?;
    Ok((rewritten, exported))
}

/// Rewrite `:let(Component).name` to `:global(.HASH)`, recording each binding.
pub fn collect_declarations(
    style: &str,
    file_hash: &str,
    components: &ComponentTable,
    mode: SelectorMatchMode,
) -> Result<(String, DeclaredTable), PreprocessError> {
    let mut declared = DeclaredTable::default();
    let rewritten = try_replace_all(&DECLARE_RE, style, |caps| {
        let selector = caps[1].trim();
        let class = &caps[2];

        mode.require_literal(selector)?;
        if !components.is_component(selector) {
            return Err(PreprocessError::UnknownComponentSelector(selector.to_string()));
        }

        let hash = hash_fragments([file_hash, selector, class]);
        trace!(selector, class, %hash, "declared class");
        declared.insert(selector, class, hash.clone());
        Ok(format!(":global(.{})", hash))
    })?;
    Ok((rewritten, declared))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_HASH: &str = "spc-0123456789";

    fn components() -> ComponentTable {
        ComponentTable::scan(
            r#"import Child from "./Child.svelte"; import Card from "./Card.svelte";"#,
            "svelte",
        )
        .unwrap()
    }

    #[test]
    fn test_export_rewritten_once() {
        let style = "<style>\n  :export(.btn) { color: red; }\n  :export( .label ) {}\n</style>";
        let (out, exported) = collect_exports(style).unwrap();
        assert_eq!(out, "<style>\n  .btn { color: red; }\n  .label {}\n</style>");
        assert_eq!(exported.iter().collect::<Vec<_>>(), vec!["btn", "label"]);
        assert!(!out.contains(":export"));
    }

    #[test]
    fn test_export_escaped_name() {
        let (out, exported) = collect_exports(r":export(.sm\:p-2) {}").unwrap();
        assert_eq!(out, r".sm\:p-2 {}");
        assert!(exported.contains(r"sm\:p-2"));
    }

    #[test]
    fn test_duplicate_export() {
        let err = collect_exports(":export(.btn) {} :export(.btn) {}").unwrap_err();
        assert_eq!(err, PreprocessError::DuplicateExport("btn".to_string()));
    }

    #[test]
    fn test_declaration_becomes_global_hash() {
        let style = "<style>\n  :let(Child).label { font-weight: bold; }\n</style>";
        let (out, declared) =
            collect_declarations(style, SELF_HASH, &components(), SelectorMatchMode::Literal)
                .unwrap();

        let hash = hash_fragments([SELF_HASH, "Child", "label"]);
        assert_eq!(
            out,
            format!("<style>\n  :global(.{}) {{ font-weight: bold; }}\n</style>", hash)
        );
        assert_eq!(declared.get("Child").unwrap().get("label"), Some(&hash));
        assert_eq!(declared.len(), 1);
    }

    #[test]
    fn test_declaration_hash_depends_on_component() {
        let style = ":let(Child).label {} :let(Card).label {}";
        let (_, declared) =
            collect_declarations(style, SELF_HASH, &components(), SelectorMatchMode::Literal)
                .unwrap();
        assert_ne!(
            declared.get("Child").unwrap()["label"],
            declared.get("Card").unwrap()["label"]
        );
    }

    #[test]
    fn test_repeated_declaration_overwrites() {
        let style = ":let(Child).label {} :let(Child).label:hover {}";
        let (out, declared) =
            collect_declarations(style, SELF_HASH, &components(), SelectorMatchMode::Literal)
                .unwrap();
        assert_eq!(declared.len(), 1);
        assert_eq!(out.matches(":global(").count(), 2);
    }

    #[test]
    fn test_unknown_selector() {
        let err = collect_declarations(
            ":let(div).label {}",
            SELF_HASH,
            &components(),
            SelectorMatchMode::Literal,
        )
        .unwrap_err();
        assert_eq!(err, PreprocessError::UnknownComponentSelector("div".to_string()));

        let err = collect_declarations(
            ":let(child).label {}",
            SELF_HASH,
            &components(),
            SelectorMatchMode::Literal,
        )
        .unwrap_err();
        assert_eq!(err, PreprocessError::UnknownComponentSelector("child".to_string()));
    }

    #[test]
    fn test_equivalence_mode_not_supported() {
        let err = collect_declarations(
            ":let(Child).label {}",
            SELF_HASH,
            &components(),
            SelectorMatchMode::Equivalence,
        )
        .unwrap_err();
        assert!(matches!(err, PreprocessError::SelectorEquivalenceUnsupported(_)));
    }
}
