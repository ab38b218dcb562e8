//! Entry helpers shared by the store and the CLI

use chrono::{DateTime, TimeZone, Utc};

use crate::interface::{Category, ClipboardEntry};

/// Characters shown per row in list views
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Timestamp layout written to the `timestamp` column (UTC, millisecond precision).
/// Sorts lexically against SQLite's own `CURRENT_TIMESTAMP` layout.
pub(crate) const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

impl ClipboardEntry {
    /// Classify the entry's content (recomputed on every call)
    pub fn category(&self) -> Category {
        crate::content_detection::detect_category(&self.content)
    }

    /// One-line rendering for list rows
    pub fn preview(&self, max_chars: usize) -> String {
        normalize_preview(&self.content, max_chars)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TIMESTAMPS
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn format_db_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse timestamp string from database to DateTime<Utc>.
/// Accepts both our own layout and bare `CURRENT_TIMESTAMP` values.
pub(crate) fn parse_db_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// TEXT NORMALIZATION
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize text for preview display
/// - Skips leading whitespace
/// - Collapses any whitespace run (newlines, tabs included) to a single space
/// - Truncates at max_chars with ellipsis
pub fn normalize_preview(text: &str, max_chars: usize) -> String {
    let mut result = String::with_capacity(max_chars.min(text.len()) + 1);
    let mut count = 0;
    let mut pending_space = false;

    for ch in text.trim_start().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        let needed = if pending_space { 2 } else { 1 };
        if count + needed > max_chars {
            result.push('…');
            return result;
        }

        if pending_space {
            result.push(' ');
            count += 1;
            pending_space = false;
        }
        result.push(ch);
        count += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> ClipboardEntry {
        ClipboardEntry {
            id: 1,
            content: content.to_string(),
            captured_at: Utc::now(),
            pinned: false,
            kind: "text".to_string(),
        }
    }

    #[test]
    fn test_display_text_whitespace_normalization() {
        assert_eq!(normalize_preview("  hello\n\n\tworld  ", 100), "hello world");
    }

    #[test]
    fn test_display_text_truncation() {
        let long = "a".repeat(250);
        let preview = normalize_preview(&long, 100);
        assert_eq!(preview.chars().count(), 101);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn test_preview_exact_fit_has_no_ellipsis() {
        assert_eq!(normalize_preview("abc def", 7), "abc def");
        assert_eq!(normalize_preview("abc def", 6), "abc de…");
    }

    #[test]
    fn test_entry_category_is_recomputed() {
        assert_eq!(entry("{\"a\": 1}").category(), Category::Json);
        assert_eq!(entry("hello world").category(), Category::Text);
    }

    #[test]
    fn test_timestamp_roundtrip_and_legacy_layout() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        let formatted = format_db_timestamp(now);
        assert_eq!(formatted, "2024-05-01 12:30:15.000");
        assert_eq!(parse_db_timestamp(&formatted), Some(now));
        assert_eq!(parse_db_timestamp("2024-05-01 12:30:15"), Some(now));
        assert_eq!(parse_db_timestamp("garbage"), None);
    }

    #[test]
    fn test_legacy_timestamp_sorts_before_same_second_millis() {
        // Rows written by CURRENT_TIMESTAMP must order consistently with ours
        assert!("2024-05-01 12:30:15" < "2024-05-01 12:30:15.001");
        assert!("2024-05-01 12:30:15.999" < "2024-05-01 12:30:16");
    }
}
