//! Whole-engine test: queue → worker → orchestrator → progress session,
//! with the transport and yt-dlp both faked.

#![cfg(unix)]

mod common;

use std::sync::Arc;

use tgdl_core::config::BotConfig;
use tgdl_core::downloader::Downloader;
use tgdl_core::queue::{JobQueue, QueueError};
use tgdl_core::request::Request;
use tgdl_core::transport::Transport;
use tgdl_core::worker::WorkerPool;

#[tokio::test]
async fn request_flows_to_final_report() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        binary_path: Some(common::fake_binary(dir.path())),
        output_dir: dir.path().to_string_lossy().into_owned(),
        worker_count: 2,
        ..BotConfig::default()
    };
    let transport = Arc::new(common::RecordingTransport::default());
    let downloader = Arc::new(Downloader::new(&cfg).unwrap());
    let queue = JobQueue::new(cfg.queue_capacity);

    queue
        .enqueue(Request::new(
            5,
            "https://example.com/a https://example.com/b not-a-url",
        ))
        .unwrap();
    queue.close().await;

    WorkerPool::spawn(
        cfg.worker_count,
        queue.clone(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        downloader,
    )
    .join()
    .await;

    // The progress message went to the requesting chat.
    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 5);

    // The final edit reports both downloads and the skipped token.
    let edits = transport.edits.lock().unwrap();
    let last = edits.last().unwrap();
    assert!(last.starts_with("🏁"));
    assert!(last.contains("✔️ a.mp4"));
    assert!(last.contains("✔️ b.mp4"));
    assert!(last.contains("⚠️ skipped (not a url): not-a-url"));

    // Two success markers exactly: one per valid URL.
    assert_eq!(last.matches("✔️").count(), 2);
}

#[tokio::test]
async fn overflowing_requests_are_dropped_not_blocked() {
    let queue = JobQueue::new(1);
    assert!(queue.enqueue(Request::new(1, "https://example.com/a")).is_ok());
    // Second request hits a full buffer immediately.
    let err = queue.enqueue(Request::new(1, "https://example.com/b")).unwrap_err();
    assert!(matches!(err, QueueError::Full { capacity: 1 }));
    // The buffered request is untouched.
    assert_eq!(queue.len(), 1);
}
