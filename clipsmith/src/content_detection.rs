//! Content type detection for clipboard text
//!
//! Classifies text as JSON, URL, email, Base64 or plain text. Categories
//! overlap (a short JSON array can also look like Base64), so the checks run
//! in a fixed priority order and the first match wins.

use crate::interface::Category;
use once_cell::sync::Lazy;
use regex::Regex;

/// Scheme, host, then optional path/query/fragment drawn from the RFC 3986 set.
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?i:https?|ftp)://
        (?:[A-Za-z0-9\-._~%!$&'()*+,;=]+@)?          # optional userinfo
        [A-Za-z0-9](?:[A-Za-z0-9\-.]*[A-Za-z0-9])?   # host
        (?::[0-9]{1,5})?                             # optional port
        (?:[/?\#][A-Za-z0-9\-._~:/?\#\[\]@!$&'()*+,;=%]*)?
        $",
    )
    .unwrap()
});

/// Unquoted local part, then dot-separated domain labels without edge hyphens.
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^[A-Za-z0-9!\#$%&'*+/=?^_`{|}~\-]+(?:\.[A-Za-z0-9!\#$%&'*+/=?^_`{|}~\-]+)*
        @
        [A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?
        (?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*$",
    )
    .unwrap()
});

static BASE64_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap()
});

/// Minimum length (exclusive) for text to count as Base64
const BASE64_MIN_LEN: usize = 8;

/// Bracketed text that parses as JSON
fn is_json(trimmed: &str) -> bool {
    let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    bracketed && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// http/https/ftp URL with a host
fn is_url(trimmed: &str) -> bool {
    URL_REGEX.is_match(trimmed) && url::Url::parse(trimmed).is_ok()
}

fn is_email(trimmed: &str) -> bool {
    EMAIL_REGEX.is_match(trimmed)
}

fn is_base64(trimmed: &str) -> bool {
    trimmed.len() > BASE64_MIN_LEN && trimmed.len() % 4 == 0 && BASE64_REGEX.is_match(trimmed)
}

/// Detect the category of a piece of text
pub fn detect_category(text: &str) -> Category {
    let trimmed = text.trim();

    if is_json(trimmed) {
        Category::Json
    } else if is_url(trimmed) {
        Category::Url
    } else if is_email(trimmed) {
        Category::Email
    } else if is_base64(trimmed) {
        Category::Base64
    } else {
        Category::Text
    }
}
