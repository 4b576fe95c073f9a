//! String, URL and time helpers

use chrono::{DateTime, SecondsFormat, Utc};
use url::Url;

/// Origin used for relative permalinks when the page URL cannot be parsed
pub const FALLBACK_ORIGIN: &str = "https://x.com";

/// Remove a single trailing slash from a base URL
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// Format a UTC instant the way a browser's `Date.toISOString()` does
/// Output format: "2024-01-15T14:30:00.000Z"
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolve an attribute URL (possibly relative) against the page URL
/// - Absolute URLs are returned unchanged
/// - Relative URLs are joined onto the page URL
/// - If the page URL is unusable, relative URLs are joined onto the fallback origin
pub fn resolve_url(page_url: &str, href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }

    let base = Url::parse(page_url).or_else(|_| Url::parse(FALLBACK_ORIGIN));
    match base.and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", FALLBACK_ORIGIN, href),
    }
}

/// Collapse runs of spaces and tabs into a single space, keeping newlines
pub fn collapse_spaces(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_run = false;

    for c in text.chars() {
        if c == ' ' || c == '\t' || c == '\r' {
            if !in_run {
                result.push(' ');
            }
            in_run = true;
        } else {
            result.push(c);
            in_run = false;
        }
    }

    result
}
