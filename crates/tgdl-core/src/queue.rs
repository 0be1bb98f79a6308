//! Bounded FIFO request queue: one producer (the polling loop), many
//! consumer workers sharing the receiver.
//!
//! Enqueue never blocks: a full queue rejects immediately so the caller can
//! notify the sender and drop the request. After `close()` no new items are
//! accepted, but whatever is buffered still drains to the workers before
//! `dequeue` starts reporting exhaustion.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::request::Request;

/// Enqueue failure modes.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Capacity reached; the request was dropped, not delayed.
    #[error("queue is full ({capacity} pending)")]
    Full { capacity: usize },
    /// The queue was closed for intake (shutdown in progress).
    #[error("queue is closed")]
    Closed,
}

/// Handle to the shared request queue. Clone freely; all clones see the
/// same buffer.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Request>,
    rx: Arc<Mutex<mpsc::Receiver<Request>>>,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            capacity,
        }
    }

    /// Non-blocking insert. Full or closed queues fail immediately; the
    /// request is the caller's to drop (with a notice to the sender).
    pub fn enqueue(&self, request: Request) -> Result<(), QueueError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Await the next request. Returns None once the queue has been closed
    /// and fully drained.
    pub async fn dequeue(&self) -> Option<Request> {
        self.rx.lock().await.recv().await
    }

    /// Number of requests currently buffered.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop intake. Buffered requests remain dequeueable; once they are
    /// gone, `dequeue` yields None and the workers wind down.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }
}
