//! # Class Passing Preprocessor
//!
//! Rewrites single-file components so a component can export scoped classes
//! to its parent and receive class overrides, without leaking global selectors.
//!
//! ## Directives
//!
//! 1. **Export**: `:export(.btn)` in the style block marks `btn` as overridable
//!    and is emitted as `.btn`.
//! 2. **Declare**: `:let(Child).label { ... }` styles `Child`'s exported `label`
//!    class from the parent. The selector becomes `:global(.spc-xxxxxxxxxx)`.
//! 3. **Pass**: `<Child class:label="title" />` hands the parent's `title`
//!    rule to `Child`'s `label` class for this instance only. Explicit
//!    directives beat declarations.
//!
//! ## Invariants
//!
//! - Every generated name is `spc-` + 10 hex chars of a SHA-256 over the file
//!   content and filename plus the names involved. Same input, same output.
//! - Every component instance receives `__spc_class_swap_table__={{...}}`;
//!   every script block declares `export let __spc_class_swap_table__`.
//! - Any error aborts the whole file. There is no partial output.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod block;
mod error;
mod hash;
mod imports;
mod inventory;
mod markup;
mod options;
mod preprocess;
mod registry;
mod replace;
mod style;


pub use block::{extract_block, Block, SourceBlocks};
pub use error::{CompilerError, PreprocessError};
pub use hash::{file_hash, hash_fragments};
pub use imports::ComponentTable;
pub use inventory::ClassUsage;
pub use markup::{
    expand_self_closing, MarkupRewrite, MarkupRewriter, PassedMap, SWAP_TABLE_PROP,
};
pub use options::{PreprocessOptions, SelectorMatchMode};
pub use preprocess::{
    preprocess, preprocess_batch, preprocess_markup, PreprocessOutput, SourceFile,
    PREPROCESSOR_NAME,
};
pub use registry::{collect_declarations, collect_exports, DeclaredTable, ExportedSet};
pub use style::promote_passed_classes;

#[cfg(feature = "napi")]
#[napi]
pub fn preprocess_markup_native(
    content: String,
    filename: Option<String>,
    options: Option<serde_json::Value>,
) -> napi::Result<PreprocessOutput> {
    let file = filename.clone().unwrap_or_default();
    let to_napi = |err: PreprocessError| {
        let diagnostic = err.to_compiler_error(&file);
        napi::Error::from_reason(
            serde_json::to_string(&diagnostic).unwrap_or_else(|_| diagnostic.message),
        )
    };

    let options = match options {
        Some(value) => PreprocessOptions::from_json(value).map_err(to_napi)?,
        None => PreprocessOptions::default(),
    };
    preprocess(&SourceFile { content, filename }, &options).map_err(to_napi)
}
