//! Preprocess Pipeline
//!
//! `(content, filename)` in, one rewritten source string out:
//!
//! ```text
//! split blocks -> scan imports -> exports -> declarations
//!              -> rewrite markup -> promote passed classes -> assemble
//! ```
//!
//! Every table lives inside a single call, so files can be processed in
//! parallel and identical inputs always produce identical output.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use crate::block::SourceBlocks;
use crate::error::PreprocessError;
use crate::hash::file_hash;
use crate::imports::ComponentTable;
use crate::inventory::ClassUsage;
use crate::markup::{expand_self_closing, swap_table_field, MarkupRewriter};
use crate::options::PreprocessOptions;
use crate::registry::{collect_declarations, collect_exports};
use crate::style::promote_passed_classes;

/// Name the preprocessor registers under with its host.
pub const PREPROCESSOR_NAME: &str = "svelte-preprocess-class";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub content: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl SourceFile {
    pub fn new(content: impl Into<String>, filename: Option<&str>) -> Self {
        SourceFile {
            content: content.into(),
            filename: filename.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct PreprocessOutput {
    pub code: String,
    pub usage: ClassUsage,
}

/// Rewrite one component file.
pub fn preprocess(
    source: &SourceFile,
    options: &PreprocessOptions,
) -> Result<PreprocessOutput, PreprocessError> {
    let filename = source.filename.as_deref();
    let self_hash = file_hash(&source.content, filename);
    let _span = debug_span!("preprocess", file = filename.unwrap_or("<anonymous>"), hash = %self_hash)
        .entered();

    let SourceBlocks {
        mut script,
        style,
        body,
    } = SourceBlocks::split(&source.content);

    let components = ComponentTable::scan(&script.raw, &options.component_extension)?;

    let body = if options.expand_self_closing {
        expand_self_closing(&body)
    } else {
        body
    };

    script.append("script", &swap_table_field(script.is_typescript()));

    let (style_raw, exported) = collect_exports(&style.raw)?;
    let (style_raw, declared) = collect_declarations(
        &style_raw,
        &self_hash,
        &components,
        options.selector_match,
    )?;

    debug!(
        components = components.len(),
        exported = exported.len(),
        declared = declared.len(),
        "registries built"
    );

    let usage = ClassUsage::collect(&body, &components);
    for class in usage.unused_exports(&exported) {
        warn!(class, "exported class is not used by any element");
    }

    let rewrite = MarkupRewriter::new(
        &self_hash,
        &components,
        &exported,
        &declared,
        options.selector_match,
    )
    .rewrite(&body)?;

    for binding in &rewrite.bindings {
        script.append("script", binding);
    }
    let style_raw = promote_passed_classes(&style_raw, &rewrite.passed)?;

    debug!(
        passed = rewrite.passed.len(),
        bindings = rewrite.bindings.len(),
        "markup rewritten"
    );

    Ok(PreprocessOutput {
        code: assemble(&script.raw, &rewrite.body, &style_raw),
        usage,
    })
}

/// Rewrite one file with default options.
pub fn preprocess_markup(
    content: &str,
    filename: Option<&str>,
) -> Result<PreprocessOutput, PreprocessError> {
    preprocess(&SourceFile::new(content, filename), &PreprocessOptions::default())
}

/// Rewrite several independent files in parallel. Results keep the input order.
pub fn preprocess_batch(
    sources: &[SourceFile],
    options: &PreprocessOptions,
) -> Vec<Result<PreprocessOutput, PreprocessError>> {
    sources
        .par_iter()
        .map(|source| preprocess(source, options))
        .collect()
}

/// Script, markup and style, trimmed and separated by a blank line.
fn assemble(script: &str, body: &str, style: &str) -> String {
    [script, body, style]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
