use regex::{Captures, Regex};

/// `Regex::replace_all` with a replacer that may fail. Stops at the first error.
pub fn try_replace_all<E, F>(re: &Regex, text: &str, mut replacer: F) -> Result<String, E>
where
    F: FnMut(&Captures) -> Result<String, E>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&text[last..m.start()]);
        out.push_str(&replacer(&caps)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}
