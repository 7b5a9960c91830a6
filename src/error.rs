#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_DUPLICATE_IMPORT: &str = "SPC-ERR-DUPLICATE-IMPORT";
pub const ERR_DUPLICATE_EXPORT: &str = "SPC-ERR-DUPLICATE-EXPORT";
pub const ERR_UNKNOWN_SELECTOR: &str = "SPC-ERR-UNKNOWN-SELECTOR";
pub const ERR_SELECTOR_EQUIVALENCE: &str = "SPC-ERR-SELECTOR-EQUIVALENCE";
pub const ERR_INVALID_OPTIONS: &str = "SPC-ERR-INVALID-OPTIONS";
pub const ERR_PATTERN: &str = "SPC-ERR-PATTERN";

/// Every failure is fatal for the file being processed; there is no partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("the component `{0}` may be imported more than once (case-insensitive)")]
    DuplicateImport(String),

    #[error("the class `{0}` is exported more than once")]
    DuplicateExport(String),

    #[error("the selector `{0}` is not a component")]
    UnknownComponentSelector(String),

    #[error("selector equivalence matching is not supported (needed for `{0}`)")]
    SelectorEquivalenceUnsupported(String),

    #[error("invalid preprocessor options: {0}")]
    InvalidOptions(String),

    #[error("failed to build pattern: {0}")]
    Pattern(String),
}

impl From<regex::Error> for PreprocessError {
    fn from(err: regex::Error) -> Self {
        PreprocessError::Pattern(err.to_string())
    }
}

impl PreprocessError {
    pub fn code(&self) -> &'static str {
        match self {
            PreprocessError::DuplicateImport(_) => ERR_DUPLICATE_IMPORT,
            PreprocessError::DuplicateExport(_) => ERR_DUPLICATE_EXPORT,
            PreprocessError::UnknownComponentSelector(_) => ERR_UNKNOWN_SELECTOR,
            PreprocessError::SelectorEquivalenceUnsupported(_) => ERR_SELECTOR_EQUIVALENCE,
            PreprocessError::InvalidOptions(_) => ERR_INVALID_OPTIONS,
            PreprocessError::Pattern(_) => ERR_PATTERN,
        }
    }

    /// The rule the failing input broke, phrased as what the preprocessor promises.
    pub fn guarantee(&self) -> &'static str {
        match self {
            PreprocessError::DuplicateImport(_) => {
                "Each component name resolves to exactly one import, ignoring case."
            }
            PreprocessError::DuplicateExport(_) => "A class is exported at most once per file.",
            PreprocessError::UnknownComponentSelector(_) => {
                "Declared classes bind only to components imported by the same file."
            }
            PreprocessError::SelectorEquivalenceUnsupported(_) => {
                "Declared classes are matched to components by literal name."
            }
            PreprocessError::InvalidOptions(_) => "Options are validated before any file is read.",
            PreprocessError::Pattern(_) => "Configured names form valid search patterns.",
        }
    }

    fn hints(&self) -> Vec<String> {
        match self {
            PreprocessError::DuplicateImport(name) => vec![format!(
                "rename one of the imports so `{}` is unique regardless of case",
                name
            )],
            PreprocessError::DuplicateExport(name) => {
                vec![format!("remove the extra `:export(.{})`", name)]
            }
            PreprocessError::UnknownComponentSelector(name) => vec![format!(
                "import `{}` from a component file or fix the `:let({})` selector",
                name, name
            )],
            PreprocessError::SelectorEquivalenceUnsupported(_) => {
                vec!["set `selectorMatch` to `literal`".to_string()]
            }
            PreprocessError::InvalidOptions(_) | PreprocessError::Pattern(_) => vec![],
        }
    }

    /// Structured form handed to the host compiler.
    pub fn to_compiler_error(&self, file: &str) -> CompilerError {
        CompilerError {
            code: self.code().to_string(),
            error_type: "PREPROCESS_ERROR".to_string(),
            message: self.to_string(),
            guarantee: self.guarantee().to_string(),
            file: file.to_string(),
            hints: self.hints(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub hints: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = PreprocessError::DuplicateImport("foo".to_string());
        assert!(err.to_string().contains("`foo`"));
        let err = PreprocessError::UnknownComponentSelector("div > p".to_string());
        assert_eq!(err.to_string(), "the selector `div > p` is not a component");
    }

    #[test]
    fn test_compiler_error_shape() {
        let err = PreprocessError::DuplicateExport("btn".to_string());
        let diag = err.to_compiler_error("Button.svelte");
        assert_eq!(diag.code, ERR_DUPLICATE_EXPORT);
        assert_eq!(diag.file, "Button.svelte");
        assert_eq!(diag.hints, vec!["remove the extra `:export(.btn)`".to_string()]);

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["errorType"], "PREPROCESS_ERROR");
        assert_eq!(json["message"], "the class `btn` is exported more than once");
    }
}
