//! Style promotion for classes handed to child components.
//!
//! A rule `.title { ... }` whose class was passed down as `spc-abc` becomes
//! `:global(.spc-abc), .title { ... }`: the child element carries `spc-abc`,
//! so the parent's rule still reaches it, and the original scoped selector
//! keeps working for the parent's own elements.

use regex::{Captures, Regex};

use crate::error::PreprocessError;
use crate::markup::PassedMap;

pub fn promote_passed_classes(style: &str, passed: &PassedMap) -> Result<String, PreprocessError> {
    let mut style = style.to_string();
    for (class, hash) in passed {
        let rule_re = Regex::new(&format!(
            r"(?m)^([ \t]*)\.{}([^A-Za-z0-9_-]|$)",
            regex::escape(class)
        ))?;
        style = rule_re
            .replace_all(&style, |caps: &Captures| {
                format!("{}:global(.{}), .{}{}", &caps[1], hash, class, &caps[2])
            })
            .into_owned();
    }
    Ok(style)
}
