//! Filename and log-field sanitization.
//!
//! `sanitize_component` turns one extracted field into something safe to
//! embed in a filename. `redact_path` keeps full paths out of span fields.

use std::path::Path;

/// Replacement for every character that cannot appear in a filename.
pub const PLACEHOLDER: char = '_';

/// Upper bound on a single filename component, in characters.
pub const MAX_COMPONENT_CHARS: usize = 80;

fn is_illegal(c: char) -> bool {
    matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

/// Sanitizes a single filename component.
///
/// Path separators, wildcards, redirection characters, quotes and all
/// control characters (including `\r` and `\n`) become [`PLACEHOLDER`]; the
/// result is capped at [`MAX_COMPONENT_CHARS`]. Applying it twice yields the
/// same string as applying it once.
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if is_illegal(c) { PLACEHOLDER } else { c })
        .take(MAX_COMPONENT_CHARS)
        .collect()
}

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields: shows the file name, never the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
