//! Clipsmith public interface
//!
//! Shared types handed to whatever presentation layer sits on top of the core
//! (the bundled CLI, or a GUI). This file is the source of truth for them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime classification of a piece of clipboard text.
///
/// Computed from content every time it is needed and never persisted, so
/// changing the detection rules needs no migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Json,
    Url,
    Email,
    Base64,
}

impl Category {
    /// Stable lowercase label
    pub fn name(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Json => "json",
            Category::Url => "url",
            Category::Email => "email",
            Category::Base64 => "base64",
        }
    }

    /// Transformations worth offering for text of this category
    pub fn available_actions(&self) -> Vec<TransformAction> {
        let mut actions = Vec::with_capacity(3);
        match self {
            Category::Json => actions.push(TransformAction::Prettify),
            Category::Base64 => actions.push(TransformAction::DecodeBase64),
            Category::Text | Category::Url | Category::Email => {}
        }
        actions.push(TransformAction::EncodeBase64);
        actions.push(TransformAction::Clean);
        actions
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A text transformation the UI can run on a selected entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformAction {
    Prettify,
    EncodeBase64,
    DecodeBase64,
    Clean,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One captured clipboard item as persisted by the history store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardEntry {
    pub id: i64,
    pub content: String,
    pub captured_at: DateTime<Utc>,
    pub pinned: bool,
    /// Origin/format tag. Not kept in sync with [`Category`].
    pub kind: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Error type for Clipsmith operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClipsmithError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid JSON: {0}")]
    Parse(String),
    #[error("Invalid Base64: {0}")]
    Decode(String),
    #[error("Store not initialized")]
    NotInitialized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Operations the UI layer calls on the clipboard history.
/// Implemented by [`crate::HistoryStore`].
pub trait HistoryStoreApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Open the backing connection and create the schema if absent.
    /// Must succeed once before any other operation.
    fn init(&self) -> Result<(), ClipsmithError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whole history, pinned first, newest first within each group
    fn list_all(&self) -> Result<Vec<ClipboardEntry>, ClipsmithError>;

    /// Entries whose content contains `query` (ASCII case-insensitive), same order as `list_all`
    fn search(&self, query: &str) -> Result<Vec<ClipboardEntry>, ClipsmithError>;

    /// Single entry by id
    fn get(&self, id: i64) -> Result<Option<ClipboardEntry>, ClipsmithError>;

    /// Number of stored entries
    fn count(&self) -> Result<u64, ClipsmithError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persist new content. Returns the assigned id.
    fn save(&self, content: &str, kind: &str) -> Result<i64, ClipsmithError>;

    /// Set the pin state. Returns false if the id does not exist.
    fn toggle_pin(&self, id: i64, pinned: bool) -> Result<bool, ClipsmithError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Delete Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Remove an entry. Returns false if the id does not exist.
    fn delete(&self, id: i64) -> Result<bool, ClipsmithError>;
}

impl From<crate::database::DatabaseError> for ClipsmithError {
    fn from(e: crate::database::DatabaseError) -> Self {
        ClipsmithError::Storage(e.to_string())
    }
}

impl From<crate::watcher::ClipboardError> for ClipsmithError {
    fn from(e: crate::watcher::ClipboardError) -> Self {
        ClipsmithError::Clipboard(e.to_string())
    }
}
