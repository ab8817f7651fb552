//! HTML output helpers shared by the renderer and the filter UI.

use std::collections::HashSet;

/// HTML-escape a string for text or attribute output.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Sanitize stored body HTML, keeping safe formatting tags.
pub fn sanitize(input: &str) -> String {
    ammonia::clean(input)
}

/// Remove every tag, keeping escaped text. Script and style contents are dropped.
pub fn strip_tags(input: &str) -> String {
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string()
}
