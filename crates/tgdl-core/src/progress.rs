//! Per-request progress aggregation: one message in the chat, edited in
//! place as task results arrive.
//!
//! A session is a single cooperative loop selecting between the next
//! result and a one-second tick. Results append rendered lines (completion
//! order, never reordered); ticks animate a spinner while the batch is
//! still silent. When the result stream closes the final view is rendered
//! and the session ends. Transport failures are logged and skipped; a
//! lost render must never abort the batch.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::request::TaskResult;
use crate::transport::{MessageHandle, ParseMode, Transport};

/// Spinner frames cycled while no result has arrived, keyed by elapsed
/// seconds mod 3.
fn spinner_frame(elapsed_secs: u64) -> &'static str {
    match elapsed_secs % 3 {
        0 => "+--+--+--+--+--",
        1 => "-+--+--+--+--+-",
        _ => "--+--+--+--+--+",
    }
}

/// One line of the progress view for a finished task.
fn render_line(result: &TaskResult) -> String {
    if result.is_success() {
        if result.file_name.is_empty() {
            format!("✔️ {}", result.output)
        } else {
            format!("✔️ {}", result.file_name)
        }
    } else {
        format!("❌ {}", result.output)
    }
}

fn render_in_progress(lines: &[String], spinner: Option<&str>) -> String {
    let mut body = lines.join("\n");
    if let Some(frame) = spinner {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(frame);
    }
    format!("⏳ Downloading, please wait\n<code>\n{}\n</code>", body)
}

fn render_final(lines: &[String]) -> String {
    format!("🏁 Result:\n<code>\n{}\n</code>", lines.join("\n"))
}

/// Aggregates one request's result stream into a live-edited chat message.
pub struct ProgressSession {
    transport: Arc<dyn Transport>,
    chat_id: i64,
    handle: Option<MessageHandle>,
    lines: Vec<String>,
    results_seen: usize,
    started: Instant,
}

impl ProgressSession {
    /// Start a session for one request. Skipped tokens become visible lines
    /// right away so the user learns what will not be downloaded.
    pub fn new(transport: Arc<dyn Transport>, chat_id: i64, skipped: &[String]) -> Self {
        let lines = skipped
            .iter()
            .map(|token| format!("⚠️ skipped (not a url): {}", token))
            .collect();
        Self {
            transport,
            chat_id,
            handle: None,
            lines,
            results_seen: 0,
            started: Instant::now(),
        }
    }

    /// Consume the result stream to completion, rendering as it goes.
    pub async fn run(mut self, mut results: mpsc::Receiver<TaskResult>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; fold it into the
        // initial render instead of an extra edit.
        ticker.tick().await;

        let spinner = spinner_frame(0);
        let initial = render_in_progress(&self.lines, Some(spinner));
        self.render(&initial).await;

        loop {
            tokio::select! {
                result = results.recv() => match result {
                    Some(result) => {
                        self.lines.push(render_line(&result));
                        self.results_seen += 1;
                        let view = render_in_progress(&self.lines, None);
                        self.render(&view).await;
                    }
                    None => {
                        let view = render_final(&self.lines);
                        self.render(&view).await;
                        return;
                    }
                },
                _ = ticker.tick() => {
                    // Animate only while the batch is silent; once results
                    // exist the lines themselves prove liveness.
                    if self.results_seen == 0 {
                        let frame = spinner_frame(self.started.elapsed().as_secs());
                        let view = render_in_progress(&self.lines, Some(frame));
                        self.render(&view).await;
                    }
                }
            }
        }
    }

    /// Send or edit the progress message. Failures are logged; a session
    /// whose initial send failed retries the send on the next event.
    async fn render(&mut self, text: &str) {
        match self.handle {
            Some(handle) => {
                if let Err(e) = self
                    .transport
                    .edit_message(handle, text, ParseMode::Html)
                    .await
                {
                    tracing::warn!(chat_id = self.chat_id, "progress edit failed: {}", e);
                }
            }
            None => match self
                .transport
                .send_message(self.chat_id, text, ParseMode::Html)
                .await
            {
                Ok(handle) => self.handle = Some(handle),
                Err(e) => {
                    tracing::warn!(chat_id = self.chat_id, "progress send failed: {}", e);
                }
            },
        }
    }
}
