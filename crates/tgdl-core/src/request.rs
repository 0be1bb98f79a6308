//! Inbound requests and their per-URL download tasks.

use std::time::Instant;

/// One inbound message: zero or more whitespace-separated candidate URLs.
/// Immutable once enqueued; consumed exactly once by a single worker.
#[derive(Debug, Clone)]
pub struct Request {
    /// Chat the request (and all progress for it) belongs to.
    pub chat_id: i64,
    /// Raw message text as received.
    pub text: String,
    /// When the transport handed the request over.
    pub received_at: Instant,
}

impl Request {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            received_at: Instant::now(),
        }
    }

    /// Commands start with a slash (`/status`); everything else is treated
    /// as a download expression.
    pub fn is_command(&self) -> bool {
        self.text.trim_start().starts_with('/')
    }

    /// Command name without the leading slash, or None for expressions.
    pub fn command(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        let rest = trimmed.strip_prefix('/')?;
        Some(rest.split_whitespace().next().unwrap_or(""))
    }
}

/// One URL's download attempt: the full argv for a single yt-dlp invocation.
/// The URL is always the final argument.
#[derive(Debug, Clone)]
pub struct Task {
    pub url: String,
    pub args: Vec<String>,
}

/// Why a task failed. Exactly one of these (or success) per task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The subprocess could not be started at all (missing binary, perms).
    #[error("failed to start {binary}: {source}")]
    Start {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    /// The subprocess outlived its deadline and was killed. Authoritative:
    /// even output that matched just before expiry does not count.
    #[error("timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    /// The subprocess exited non-zero (or was signalled).
    #[error("exited with {status}")]
    Exit { status: std::process::ExitStatus },
    /// Waiting on the subprocess itself failed.
    #[error("wait failed: {0}")]
    Wait(#[source] std::io::Error),
}

/// Terminal outcome of one [`Task`]. The orchestrator emits exactly one of
/// these per task, success or not, before closing the result stream.
#[derive(Debug)]
pub struct TaskResult {
    /// Base name of the produced file; empty when no artifact path was seen.
    pub file_name: String,
    /// Matched output line on success, diagnostic text on failure.
    pub output: String,
    pub error: Option<TaskError>,
}

impl TaskResult {
    pub fn success(file_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(output: impl Into<String>, error: TaskError) -> Self {
        Self {
            file_name: String::new(),
            output: output.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
