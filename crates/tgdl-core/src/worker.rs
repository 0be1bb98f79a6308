//! Fixed pool of workers consuming the request queue.
//!
//! Each worker owns at most one request at a time and runs it to
//! completion: authorization check, then command reply or download batch
//! with a progress session. Workers exit once the queue is closed and
//! drained; `join` completes shutdown.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::downloader::Downloader;
use crate::progress::ProgressSession;
use crate::queue::JobQueue;
use crate::request::Request;
use crate::transport::{ParseMode, Transport};

const PRIVATE_NOTICE: &str = "🛑 This bot is private";

const START_TEXT: &str = "Hi! I download videos for you. 🦾\n\n\
⚠️ Requests are processed through a queue, please wait for the result.";

const HELP_TEXT: &str = "Send me one or more video links 📺 separated by spaces \
and I will try to download them.\n\n\
❌ Limitations:\n- A started download cannot be cancelled. \
Everything queued is downloaded or dies at the ⏲️ timeout.";

/// Handle to the spawned workers; `join` waits for all of them to finish.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers over the shared queue. Call once at
    /// startup.
    pub fn spawn(
        worker_count: usize,
        queue: JobQueue,
        transport: Arc<dyn Transport>,
        downloader: Arc<Downloader>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let handles = (0..worker_count)
            .map(|id| {
                let queue = queue.clone();
                let transport = Arc::clone(&transport);
                let downloader = Arc::clone(&downloader);
                tokio::spawn(worker_loop(id, worker_count, queue, transport, downloader))
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to exit (the queue must be closed first or
    /// this waits forever).
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    id: usize,
    worker_count: usize,
    queue: JobQueue,
    transport: Arc<dyn Transport>,
    downloader: Arc<Downloader>,
) {
    tracing::debug!("worker {} started", id);

    while let Some(request) = queue.dequeue().await {
        tracing::debug!(worker = id, chat_id = request.chat_id, "processing request");

        if !transport.authorize(request.chat_id) {
            tracing::warn!(chat_id = request.chat_id, "rejected unauthorized request");
            notify(&transport, request.chat_id, PRIVATE_NOTICE).await;
            continue;
        }

        if request.is_command() {
            handle_command(&transport, &queue, worker_count, &request).await;
        } else {
            handle_expression(&transport, &downloader, &request).await;
        }
    }

    tracing::info!("worker {} stopped", id);
}

async fn handle_command(
    transport: &Arc<dyn Transport>,
    queue: &JobQueue,
    worker_count: usize,
    request: &Request,
) {
    let reply = match request.command() {
        Some("start") => START_TEXT.to_string(),
        Some("help") => HELP_TEXT.to_string(),
        Some("status") => format!(
            "System status:\n- Requests queued: {}\n- Active workers: {}",
            queue.len(),
            worker_count
        ),
        _ => "Unknown command".to_string(),
    };
    notify(transport, request.chat_id, &reply).await;
}

async fn handle_expression(
    transport: &Arc<dyn Transport>,
    downloader: &Arc<Downloader>,
    request: &Request,
) {
    let text = request.text.trim();
    if text.is_empty() {
        return;
    }

    let (results, skipped) = downloader.run(text);
    ProgressSession::new(Arc::clone(transport), request.chat_id, &skipped)
        .run(results)
        .await;
}

/// One-shot notice; failures are logged, never propagated.
async fn notify(transport: &Arc<dyn Transport>, chat_id: i64, text: &str) {
    if let Err(e) = transport
        .send_message(chat_id, text, ParseMode::MarkdownV2)
        .await
    {
        tracing::warn!(chat_id, "notice send failed: {}", e);
    }
}
