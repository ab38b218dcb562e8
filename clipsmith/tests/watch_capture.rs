//! Clipboard changes flowing from the watcher through capture into history

use clipsmith::{
    CaptureController, CaptureEvent, Category, ClipboardWatch, HistoryStore, HistoryStoreApi,
    MemoryClipboard,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_copies_are_recorded_in_order() {
    let store = Arc::new(HistoryStore::in_memory());
    store.init().unwrap();

    let clipboard = MemoryClipboard::new();
    clipboard.set_text("before watching");

    let mut watch = ClipboardWatch::new(clipboard.clone());
    let changes = watch.subscribe();
    // Prime with the existing content
    assert!(watch.poll().is_none());

    let controller = Arc::new(CaptureController::new(store.clone()));
    let mut events = controller.subscribe();
    let cancel = CancellationToken::new();

    let capture_task = {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { controller.run(changes, cancel).await })
    };

    for text in ["hello world", "{\"a\":1}", "hello world", ""] {
        clipboard.set_text(text);
        watch.poll();
    }

    let mut categories = Vec::new();
    for _ in 0..3 {
        match tokio::time::timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Some(CaptureEvent::Captured { category, .. })) => categories.push(category),
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(categories, vec![Category::Text, Category::Json, Category::Text]);

    cancel.cancel();
    capture_task.await.unwrap();

    let mut stored: Vec<String> = store
        .list_all()
        .unwrap()
        .into_iter()
        .map(|e| e.content)
        .collect();
    stored.sort();
    assert_eq!(stored, vec!["hello world", "hello world", "{\"a\":1}"]);
}

#[tokio::test]
async fn test_run_loops_until_cancelled() {
    let store = Arc::new(HistoryStore::in_memory());
    store.init().unwrap();

    let clipboard = MemoryClipboard::new();
    let mut watch = ClipboardWatch::new(clipboard.clone());
    let changes = watch.subscribe();
    let controller = Arc::new(CaptureController::new(store.clone()));
    let mut events = controller.subscribe();
    let cancel = CancellationToken::new();

    let capture_task = {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { controller.run(changes, cancel).await })
    };

    let feeder = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            clipboard.set_text("user@example.com");
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
            cancel.cancel();
            event
        })
    };

    watch.run(Duration::from_millis(5), cancel.clone()).await;
    let event = feeder.await.unwrap();
    capture_task.await.unwrap();

    assert!(matches!(
        event,
        Ok(Some(CaptureEvent::Captured {
            category: Category::Email,
            ..
        }))
    ));
    assert_eq!(store.count().unwrap(), 1);
}
