//! Import Scanner
//!
//! Collects the default-imported sibling components of a script block. Only
//! statements of the form `import Name from "....svelte"` count; named and
//! namespace imports are not components. Every default import from a
//! component file takes part in the duplicate check, but only names starting
//! with an uppercase letter or `_` can be used as component tags.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;

use crate::error::PreprocessError;

/// Imported components keyed by their uppercased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTable {
    by_upper: IndexMap<String, String>,
    seen: HashSet<String>,
}

impl ComponentTable {
    pub fn scan(script: &str, extension: &str) -> Result<Self, PreprocessError> {
        let import_re = Regex::new(&format!(
            r#"import\s+([A-Za-z_$][A-Za-z0-9_$]*)\s+from\s+[^\n;]*?\.{}\b"#,
            regex::escape(extension)
        ))?;

        let mut table = ComponentTable::default();
        for caps in import_re.captures_iter(script) {
            table.insert(&caps[1])?;
        }
        Ok(table)
    }

    fn insert(&mut self, name: &str) -> Result<(), PreprocessError> {
        let key = name.to_uppercase();
        if !self.seen.insert(key.clone()) {
            return Err(PreprocessError::DuplicateImport(name.to_string()));
        }
        if name.starts_with(|c: char| c.is_ascii_uppercase() || c == '_') {
            self.by_upper.insert(key, name.to_string());
        }
        Ok(())
    }

    /// True when `tag` is exactly (case-sensitively) an imported component name.
    pub fn is_component(&self, tag: &str) -> bool {
        self.by_upper
            .get(&tag.to_uppercase())
            .map(|canonical| canonical == tag)
            .unwrap_or(false)
    }

    /// Canonical spelling for a name, looked up case-insensitively.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.by_upper.get(&name.to_uppercase()).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_upper.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_upper.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_default_imports() {
        let script = r#"<script>
  import Button from "./Button.svelte";
  import _Private from '../lib/_Private.svelte'
  import { writable } from "svelte/store";
  import helper from "./helper.js";
  import lower from "./lower.svelte";
</script>"#;
        let table = ComponentTable::scan(script, "svelte").unwrap();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, vec!["Button", "_Private"]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_case_sensitive_tag_match() {
        let table = ComponentTable::scan("import Card from './Card.svelte';", "svelte").unwrap();
        assert!(table.is_component("Card"));
        assert!(!table.is_component("card"));
        assert!(!table.is_component("CARD"));
        assert_eq!(table.canonical("card"), Some("Card"));
    }

    #[test]
    fn test_duplicate_import_ignores_case() {
        let script = r#"
  import Foo from "./Foo.svelte";
  import FOO from "./other/Foo.svelte";
"#;
        let err = ComponentTable::scan(script, "svelte").unwrap_err();
        assert_eq!(err, PreprocessError::DuplicateImport("FOO".to_string()));
    }

    #[test]
    fn test_duplicate_import_lowercase_twin() {
        let script = r#"
  import Foo from "./Foo.svelte";
  import foo from "./foo.svelte";
"#;
        let err = ComponentTable::scan(script, "svelte").unwrap_err();
        assert_eq!(err, PreprocessError::DuplicateImport("foo".to_string()));
    }

    #[test]
    fn test_custom_extension() {
        let script = r#"import Note from "./Note.svx"; import Card from "./Card.svelte";"#;
        let table = ComponentTable::scan(script, "svx").unwrap();
        assert!(table.is_component("Note"));
        assert!(!table.is_component("Card"));
    }

    #[test]
    fn test_extension_must_end_the_name() {
        let table =
            ComponentTable::scan(r#"import Data from "./Data.svelte.json";"#, "svelte").unwrap();
        assert!(table.is_component("Data"));
        let table =
            ComponentTable::scan(r#"import Data from "./Data.sveltekit";"#, "svelte").unwrap();
        assert!(table.is_empty());
    }
}
