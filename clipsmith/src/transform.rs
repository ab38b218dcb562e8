//! Text transformations offered on a selected entry
//!
//! All functions are pure and total: malformed input comes back as a
//! `ClipsmithError`, never a panic.

use crate::interface::{ClipsmithError, TransformAction};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

const JSON_INDENT: &[u8] = b"    ";

/// Re-serialize JSON with four-space indentation.
/// Object keys come out sorted, so equal values always render identically.
pub fn prettify_json(text: &str) -> Result<String, ClipsmithError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ClipsmithError::Parse(e.to_string()))?;

    let mut out = Vec::with_capacity(text.len() * 2);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ClipsmithError::Parse(e.to_string()))?;

    // serde_json only ever writes valid UTF-8
    String::from_utf8(out).map_err(|e| ClipsmithError::Parse(e.to_string()))
}

/// Standard Base64 (with padding) of the UTF-8 bytes of `text`
pub fn to_base64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode standard Base64 back to text. Surrounding whitespace is ignored.
/// Fails if the input is not Base64 or the bytes are not UTF-8.
pub fn from_base64(text: &str) -> Result<String, ClipsmithError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| ClipsmithError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ClipsmithError::Decode(e.to_string()))
}

/// Trim, then collapse every whitespace run into one space
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Run a transformation by action
pub fn apply(action: TransformAction, text: &str) -> Result<String, ClipsmithError> {
    match action {
        TransformAction::Prettify => prettify_json(text),
        TransformAction::EncodeBase64 => Ok(to_base64(text)),
        TransformAction::DecodeBase64 => from_base64(text),
        TransformAction::Clean => Ok(clean_text(text)),
    }
}
