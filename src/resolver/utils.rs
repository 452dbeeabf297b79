//! Shared URL helpers for candidate handling: host extraction and search-host unwrapping.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Search-host redirect with the target URL appended verbatim.
static PROXIED_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"^https?://scholar\.google\.[a-z.]+/(https?://.+)$")
});

/// Normalizes a host string: trim, strip trailing '.', and lowercase.
#[must_use]
pub fn canonical_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Returns the lowercase host of `url`.
///
/// URLs that do not parse fall back to the text between `://` and the next
/// `/`, so a garbled link is still classified by host rather than by path.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    if let Some(host) = Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(canonical_host))
        .filter(|host| !host.is_empty())
    {
        return Some(host);
    }

    let rest = url.trim().split_once("://").map(|(_, rest)| rest)?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host)
        .split(':')
        .next()
        .unwrap_or("");
    let host = canonical_host(host);
    (!host.is_empty()).then_some(host)
}

/// Strips search-host proxying from a document URL.
///
/// Handles both `https://scholar.google.com/https://host/doc.pdf` and
/// `https://scholar.google.com/scholar_url?url=<encoded>&...`. Other URLs are
/// returned unchanged.
#[must_use]
pub fn unwrap_proxied_url(url: &str) -> String {
    let trimmed = url.trim();

    if let Some(target) = PROXIED_PATH_RE
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
    {
        return target.as_str().to_string();
    }

    if let Ok(parsed) = Url::parse(trimmed)
        && parsed
            .host_str()
            .is_some_and(|host| host.to_ascii_lowercase().starts_with("scholar.google."))
        && parsed.path() == "/scholar_url"
        && let Some((_, target)) = parsed.query_pairs().find(|(name, _)| name == "url")
        && !target.is_empty()
    {
        return target.into_owned();
    }

    trimmed.to_string()
}
