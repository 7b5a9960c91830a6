use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// How a `:let(SELECTOR)` declaration is matched against the imported components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorMatchMode {
    /// The selector must be the as-written name of an imported component.
    #[default]
    Literal,
    /// Match structurally equivalent selectors. Not implemented: every use
    /// fails with [`PreprocessError::SelectorEquivalenceUnsupported`].
    Equivalence,
}

impl SelectorMatchMode {
    /// Gate for code paths that only exist for literal matching.
    pub fn require_literal(self, selector: &str) -> Result<(), PreprocessError> {
        match self {
            SelectorMatchMode::Literal => Ok(()),
            SelectorMatchMode::Equivalence => Err(
                PreprocessError::SelectorEquivalenceUnsupported(selector.to_string()),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessOptions {
    /// Extension (without the dot) of files whose default imports are components.
    pub component_extension: String,
    pub selector_match: SelectorMatchMode,
    /// Expand `<Tag ... />` into an explicit open/close pair before rewriting.
    pub expand_self_closing: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            component_extension: "svelte".to_string(),
            selector_match: SelectorMatchMode::Literal,
            expand_self_closing: true,
        }
    }
}

impl PreprocessOptions {
    pub fn from_json(value: serde_json::Value) -> Result<Self, PreprocessError> {
        serde_json::from_value(value).map_err(|e| PreprocessError::InvalidOptions(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = PreprocessOptions::default();
        assert_eq!(options.component_extension, "svelte");
        assert_eq!(options.selector_match, SelectorMatchMode::Literal);
        assert!(options.expand_self_closing);
    }

    #[test]
    fn test_from_json_partial() {
        let options = PreprocessOptions::from_json(json!({ "componentExtension": "svx" })).unwrap();
        assert_eq!(options.component_extension, "svx");
        assert!(options.expand_self_closing);

        let options =
            PreprocessOptions::from_json(json!({ "selectorMatch": "equivalence" })).unwrap();
        assert_eq!(options.selector_match, SelectorMatchMode::Equivalence);
    }

    #[test]
    fn test_from_json_rejects_bad_mode() {
        let err = PreprocessOptions::from_json(json!({ "selectorMatch": "fuzzy" })).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidOptions(_)));
    }

    #[test]
    fn test_require_literal() {
        assert!(SelectorMatchMode::Literal.require_literal("Child").is_ok());
        assert_eq!(
            SelectorMatchMode::Equivalence.require_literal("Child"),
            Err(PreprocessError::SelectorEquivalenceUnsupported("Child".to_string()))
        );
    }
}
