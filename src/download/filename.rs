//! Destination path construction for downloaded documents.

use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Stem used when a key folds to nothing printable.
const FALLBACK_STEM: &str = "entry";

/// Returns `<output_dir>/<key>.pdf` with the key folded to a safe ASCII file name.
///
/// The key is NFKD-decomposed, non-ASCII code points are dropped, and path
/// separators and other unsafe characters become underscores.
#[must_use]
pub fn destination_path(output_dir: &Path, key: &str) -> PathBuf {
    output_dir.join(format!("{}.pdf", file_stem_for_key(key)))
}

/// ASCII-folded, sanitized file stem for a bibliography key.
#[must_use]
pub fn file_stem_for_key(key: &str) -> String {
    let ascii: String = key.nfkd().filter(char::is_ascii).collect();
    let stem = sanitize_filename_component(&ascii);
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

pub(crate) fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in value.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }
    out.trim_matches('_').to_string()
}
