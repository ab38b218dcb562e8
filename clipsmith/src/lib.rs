//! Clipsmith Core - clipboard history with content-aware transforms
//!
//! Watches the system clipboard, stores every text copy in a local SQLite
//! history, classifies entries (JSON, URL, email, Base64, text) and offers
//! transformations on them. The bundled `clipsmith` binary is one host for
//! this library; a GUI would sit on the same API.

pub mod capture;
pub mod config;
pub mod content_detection;
pub mod database;
pub mod interface;
pub mod logging;
pub mod models;
mod store;
pub mod transform;
pub mod watcher;

pub use capture::{CaptureController, CaptureEvent, CaptureOutcome};
pub use content_detection::detect_category;
pub use interface::*;
pub use store::HistoryStore;
pub use transform::{clean_text, from_base64, prettify_json, to_base64};
pub use watcher::{
    ClipboardChange, ClipboardError, ClipboardSource, ClipboardWatch, MemoryClipboard,
    SystemClipboard,
};
