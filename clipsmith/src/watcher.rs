//! Clipboard change detection
//!
//! `ClipboardWatch` polls a [`ClipboardSource`] and publishes one
//! [`ClipboardChange`] per detected text change to every subscriber.
//!
//! Sources that expose an OS change counter let the watcher see every copy,
//! including the same text copied twice. On macOS the system clipboard has
//! one (NSPasteboard changeCount). Elsewhere the watcher falls back to
//! comparing content, where back-to-back identical copies look like no change.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default polling interval for clipboard changes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard read failed: {0}")]
    Read(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

/// Access to a shared clipboard
pub trait ClipboardSource {
    /// Monotonic counter bumped by the OS on every clipboard change, if available
    fn change_count(&mut self) -> Option<u64> {
        None
    }

    /// Current text content. `None` when the clipboard holds no text.
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError>;

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SOURCES
// ─────────────────────────────────────────────────────────────────────────────

/// Current NSPasteboard change count. A cheap integer read, no payload access.
#[cfg(target_os = "macos")]
pub fn pasteboard_change_count() -> Option<u64> {
    use cocoa::appkit::NSPasteboard;
    use cocoa::base::nil;
    use objc::runtime::Object;
    use objc::{msg_send, sel, sel_impl};

    unsafe {
        let pasteboard: *mut Object = NSPasteboard::generalPasteboard(nil);
        if pasteboard.is_null() {
            return None;
        }
        // NSInteger, never negative in practice
        let count: i64 = msg_send![pasteboard, changeCount];
        u64::try_from(count).ok()
    }
}

/// No OS counter on this platform, callers compare content instead
#[cfg(not(target_os = "macos"))]
pub fn pasteboard_change_count() -> Option<u64> {
    None
}

/// The operating system clipboard, via arboard.
/// Exposes the pasteboard change counter where the platform has one.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Write text and keep serving it until another application takes over.
    ///
    /// On X11 and Wayland the selection is owned by this process and vanishes
    /// when it exits, so a short-lived process blocks here. Other platforms
    /// hand the data to the OS and return immediately.
    pub fn write_text_and_wait(&mut self, text: &str) -> Result<(), ClipboardError> {
        #[cfg(all(
            unix,
            not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
        ))]
        {
            use arboard::SetExtLinux;
            self.inner
                .set()
                .wait()
                .text(text.to_string())
                .map_err(|e| ClipboardError::Write(e.to_string()))
        }

        #[cfg(not(all(
            unix,
            not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
        )))]
        {
            self.write_text(text)
        }
    }
}

impl ClipboardSource for SystemClipboard {
    fn change_count(&mut self) -> Option<u64> {
        pasteboard_change_count()
    }

    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.inner.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipboardError::Read(e.to_string())),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    text: Option<String>,
    change_count: u64,
    fail_reads: bool,
}

/// In-process clipboard with a change counter.
/// Clones share the same contents, so one handle can feed a watcher while
/// another is driven by a test or a host.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with text, counting as one change
    pub fn set_text(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.text = Some(text.into());
        state.change_count += 1;
    }

    /// Replace the contents with something that is not text
    pub fn set_non_text(&self) {
        let mut state = self.state.lock();
        state.text = None;
        state.change_count += 1;
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().text.clone()
    }

    /// Make subsequent reads fail, as a contended OS clipboard can
    pub fn set_read_failure(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }
}

impl ClipboardSource for MemoryClipboard {
    fn change_count(&mut self) -> Option<u64> {
        Some(self.state.lock().change_count)
    }

    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(ClipboardError::Read("clipboard busy".to_string()));
        }
        Ok(state.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.set_text(text);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WATCHER
// ─────────────────────────────────────────────────────────────────────────────

/// A detected change to non-empty clipboard text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardChange {
    pub text: String,
    pub observed_at: DateTime<Utc>,
}

/// Polls a clipboard source and fans changes out to subscribers
pub struct ClipboardWatch<S: ClipboardSource> {
    source: S,
    primed: bool,
    last_count: Option<u64>,
    /// Last observed text, used for content comparison when there is no counter
    last_text: Option<String>,
    subscribers: Vec<UnboundedSender<ClipboardChange>>,
}

impl<S: ClipboardSource> ClipboardWatch<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            primed: false,
            last_count: None,
            last_text: None,
            subscribers: Vec::new(),
        }
    }

    /// Receive every change detected from now on
    pub fn subscribe(&mut self) -> UnboundedReceiver<ClipboardChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// The underlying source, e.g. to write a transformed value back
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Check the clipboard once. Publishes and returns the change, if any.
    ///
    /// The first call only records the current state: content that was on
    /// the clipboard before watching started is not a change.
    pub fn poll(&mut self) -> Option<ClipboardChange> {
        let text = self.detect()?;
        let change = ClipboardChange {
            text,
            observed_at: Utc::now(),
        };
        debug!(len = change.text.len(), "Clipboard change detected");
        self.publish(&change);
        Some(change)
    }

    fn detect(&mut self) -> Option<String> {
        let count = self.source.change_count();
        if let Some(current) = count {
            let unchanged = self.last_count == Some(current);
            self.last_count = Some(current);
            if unchanged && self.primed {
                return None;
            }
        }

        // Only a successful read primes the watcher
        let text = match self.source.read_text() {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.primed = true;
                self.last_text = None;
                return None;
            }
            Err(e) => {
                // Best effort: other applications race us for the clipboard
                debug!(error = %e, "Clipboard read failed, skipping");
                return None;
            }
        };
        let first_poll = !self.primed;
        self.primed = true;

        let same_as_last = self.last_text.as_deref() == Some(text.as_str());
        self.last_text = Some(text.clone());

        if first_poll || text.is_empty() {
            return None;
        }
        if count.is_none() && same_as_last {
            return None;
        }
        Some(text)
    }

    fn publish(&mut self, change: &ClipboardChange) {
        // Drop subscribers whose receiver is gone
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Poll on a fixed interval until `cancel` fires
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            poll_interval_ms = interval.as_millis() as u64,
            has_change_counter = self.source.change_count().is_some(),
            "Clipboard watch started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll();
                }
            }
        }

        info!("Clipboard watch stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wraps a memory clipboard but hides its counter, like arboard
    struct ContentOnly(MemoryClipboard);

    impl ClipboardSource for ContentOnly {
        fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
            self.0.read_text()
        }

        fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.write_text(text)
        }
    }

    fn primed_watch() -> (MemoryClipboard, ClipboardWatch<MemoryClipboard>) {
        let clipboard = MemoryClipboard::new();
        let mut watch = ClipboardWatch::new(clipboard.clone());
        assert!(watch.poll().is_none());
        (clipboard, watch)
    }

    #[test]
    fn test_preexisting_content_is_not_a_change() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_text("already there");
        let mut watch = ClipboardWatch::new(clipboard.clone());
        assert!(watch.poll().is_none());
        assert!(watch.poll().is_none());
    }

    #[test]
    fn test_one_event_per_change() {
        let (clipboard, mut watch) = primed_watch();
        let mut rx = watch.subscribe();

        clipboard.set_text("first");
        assert_eq!(watch.poll().unwrap().text, "first");
        assert!(watch.poll().is_none());

        clipboard.set_text("second");
        assert_eq!(watch.poll().unwrap().text, "second");

        assert_eq!(rx.try_recv().unwrap().text, "first");
        assert_eq!(rx.try_recv().unwrap().text, "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_identical_copies_both_reported_with_counter() {
        let (clipboard, mut watch) = primed_watch();

        clipboard.set_text("same");
        assert!(watch.poll().is_some());
        clipboard.set_text("same");
        assert_eq!(watch.poll().unwrap().text, "same");
    }

    #[test]
    fn test_empty_and_non_text_ignored() {
        let (clipboard, mut watch) = primed_watch();

        clipboard.set_text("");
        assert!(watch.poll().is_none());
        clipboard.set_non_text();
        assert!(watch.poll().is_none());
        clipboard.set_text("text again");
        assert!(watch.poll().is_some());
    }

    #[test]
    fn test_read_failure_is_swallowed() {
        let (clipboard, mut watch) = primed_watch();

        clipboard.set_read_failure(true);
        clipboard.set_text("lost");
        assert!(watch.poll().is_none());

        clipboard.set_read_failure(false);
        clipboard.set_text("seen");
        assert_eq!(watch.poll().unwrap().text, "seen");
    }

    #[test]
    fn test_content_comparison_without_counter() {
        let clipboard = MemoryClipboard::new();
        let mut watch = ClipboardWatch::new(ContentOnly(clipboard.clone()));
        assert!(watch.poll().is_none());

        clipboard.set_text("a");
        assert_eq!(watch.poll().unwrap().text, "a");
        assert!(watch.poll().is_none());

        clipboard.set_text("b");
        assert_eq!(watch.poll().unwrap().text, "b");

        // Leaving text and coming back counts as a change
        clipboard.set_non_text();
        assert!(watch.poll().is_none());
        clipboard.set_text("b");
        assert_eq!(watch.poll().unwrap().text, "b");
    }

    #[test]
    fn test_failed_first_read_does_not_report_existing_content() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_text("pre-existing");
        clipboard.set_read_failure(true);

        let mut watch = ClipboardWatch::new(ContentOnly(clipboard.clone()));
        assert!(watch.poll().is_none());

        clipboard.set_read_failure(false);
        assert!(watch.poll().is_none());

        clipboard.set_text("fresh");
        assert_eq!(watch.poll().unwrap().text, "fresh");
    }

    #[test]
    fn test_failed_first_read_with_counter() {
        let clipboard = MemoryClipboard::new();
        clipboard.set_text("pre-existing");
        clipboard.set_read_failure(true);

        let mut watch = ClipboardWatch::new(clipboard.clone());
        assert!(watch.poll().is_none());

        clipboard.set_read_failure(false);
        assert!(watch.poll().is_none());

        clipboard.set_text("pre-existing");
        assert_eq!(watch.poll().unwrap().text, "pre-existing");
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_no_pasteboard_counter_off_macos() {
        assert_eq!(pasteboard_change_count(), None);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_pasteboard_counter_on_macos() {
        let first = pasteboard_change_count().unwrap();
        assert!(pasteboard_change_count().unwrap() >= first);
    }

    #[test]
    fn test_dropped_subscriber_does_not_block_others() {
        let (clipboard, mut watch) = primed_watch();
        let dropped = watch.subscribe();
        let mut kept = watch.subscribe();
        drop(dropped);

        clipboard.set_text("hello");
        watch.poll();
        assert_eq!(kept.try_recv().unwrap().text, "hello");
        assert_eq!(watch.subscribers.len(), 1);
    }

    #[test]
    fn test_watcher_never_writes() {
        let (clipboard, mut watch) = primed_watch();
        clipboard.set_text("untouched");
        watch.poll();
        assert_eq!(clipboard.text().as_deref(), Some("untouched"));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let clipboard = MemoryClipboard::new();
        let mut watch = ClipboardWatch::new(clipboard.clone());
        let mut rx = watch.subscribe();
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let feeder = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            clipboard.set_text("from run loop");
            tokio::time::sleep(Duration::from_millis(60)).await;
            cancel_clone.cancel();
        });

        watch.run(Duration::from_millis(5), cancel).await;
        feeder.await.unwrap();

        assert_eq!(rx.recv().await.unwrap().text, "from run loop");
    }
}
