//! CaptureController - turns clipboard changes into history entries

use crate::content_detection::detect_category;
use crate::interface::{Category, ClipsmithError, HistoryStoreApi};
use crate::watcher::ClipboardChange;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Kind recorded for every captured entry
pub const CAPTURE_KIND: &str = "text";

/// Result of a single capture attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Empty text, nothing stored
    Discarded,
    /// Same text as the previous capture while duplicate suppression is on
    Duplicate,
    Captured { id: i64, category: Category },
}

/// Published for every change the run loop processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Captured { id: i64, category: Category },
    Failed { error: ClipsmithError },
}

pub struct CaptureController {
    store: Arc<dyn HistoryStoreApi>,
    suppress_duplicates: bool,
    last_captured: Mutex<Option<String>>,
    subscribers: Mutex<Vec<UnboundedSender<CaptureEvent>>>,
}

impl CaptureController {
    pub fn new(store: Arc<dyn HistoryStoreApi>) -> Self {
        Self {
            store,
            suppress_duplicates: false,
            last_captured: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Skip text identical to the previous successful capture
    pub fn with_duplicate_suppression(mut self, enabled: bool) -> Self {
        self.suppress_duplicates = enabled;
        self
    }

    pub fn subscribe(&self) -> UnboundedReceiver<CaptureEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Store one piece of text. Errors from the store are returned as-is, no retry.
    pub fn capture(&self, text: &str) -> Result<CaptureOutcome, ClipsmithError> {
        if text.is_empty() {
            return Ok(CaptureOutcome::Discarded);
        }

        let mut last = self.last_captured.lock();
        if self.suppress_duplicates && last.as_deref() == Some(text) {
            return Ok(CaptureOutcome::Duplicate);
        }

        let id = self.store.save(text, CAPTURE_KIND)?;
        if self.suppress_duplicates {
            *last = Some(text.to_string());
        }

        Ok(CaptureOutcome::Captured {
            id,
            category: detect_category(text),
        })
    }

    /// Capture every change from `changes` until cancelled or the sender closes
    pub async fn run(
        &self,
        mut changes: UnboundedReceiver<ClipboardChange>,
        cancel: CancellationToken,
    ) {
        info!(
            suppress_duplicates = self.suppress_duplicates,
            "Capture loop started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Some(change) => self.handle(&change),
                    None => break,
                },
            }
        }

        info!("Capture loop stopped");
    }

    fn handle(&self, change: &ClipboardChange) {
        match self.capture(&change.text) {
            Ok(CaptureOutcome::Captured { id, category }) => {
                debug!(id, %category, "Captured clipboard text");
                self.publish(CaptureEvent::Captured { id, category });
            }
            Ok(outcome) => debug!(?outcome, "Clipboard change not stored"),
            Err(error) => {
                warn!(error = %error, "Failed to capture clipboard text");
                self.publish(CaptureEvent::Failed { error });
            }
        }
    }

    fn publish(&self, event: CaptureEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
