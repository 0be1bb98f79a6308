//! Download orchestration: expand a request into per-URL tasks and run them
//! concurrently, each as one supervised yt-dlp invocation.
//!
//! Fan-out/fan-in is channel-based: every task owns a clone of the result
//! sender and sends exactly one `TaskResult`; the receiver sees the stream
//! close once the last clone is dropped, which is the "all tasks done"
//! signal. Simultaneous subprocesses per request are capped by a semaphore
//! so one message with many URLs cannot exhaust the host.

pub mod classify;
mod supervise;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use url::Url;

use crate::config::BotConfig;
use crate::request::{Task, TaskResult};

use self::classify::OutputClassifier;

/// What a request's text expands to: runnable tasks plus the tokens that
/// did not parse as URLs (reported to the user, never silently dropped).
#[derive(Debug)]
pub struct RequestPlan {
    pub tasks: Vec<Task>,
    pub skipped: Vec<String>,
}

/// Orchestrator for yt-dlp invocations. Built once at startup from config
/// and shared by all workers; holds no per-request state.
pub struct Downloader {
    binary: PathBuf,
    base_args: Vec<String>,
    instance_args: Vec<String>,
    classifier: OutputClassifier,
    timeout: Duration,
    fanout_cap: usize,
}

impl Downloader {
    pub fn new(cfg: &BotConfig) -> Result<Self> {
        let binary = cfg.resolve_binary()?;
        let classifier = OutputClassifier::new(&cfg.output_dir)?;

        let base_args = vec![
            "-o".to_string(),
            "%(title)s.%(ext)s".to_string(),
            "--print".to_string(),
            "post_process:filename".to_string(),
            "--no-simulate".to_string(),
        ];
        let mut instance_args = vec![
            "-P".to_string(),
            cfg.output_dir.clone(),
            "-t".to_string(),
            cfg.output_format.clone(),
        ];
        if let Some(ref proxy) = cfg.proxy {
            instance_args.push("--proxy".to_string());
            instance_args.push(proxy.clone());
        }

        Ok(Self {
            binary,
            base_args,
            instance_args,
            classifier,
            timeout: Duration::from_secs(cfg.task_timeout_secs),
            fanout_cap: cfg.max_tasks_per_request.max(1),
        })
    }

    /// Split request text on whitespace and build one task per token that
    /// parses as an absolute URL. Malformed tokens are collected, not run.
    pub fn plan(&self, text: &str) -> RequestPlan {
        let mut tasks = Vec::new();
        let mut skipped = Vec::new();
        for token in text.split_whitespace() {
            match Url::parse(token) {
                Ok(_) => {
                    let mut args = self.base_args.clone();
                    args.extend(self.instance_args.iter().cloned());
                    args.push(token.to_string());
                    tasks.push(Task {
                        url: token.to_string(),
                        args,
                    });
                }
                Err(e) => {
                    tracing::warn!("{} is not a valid url, skipping: {}", token, e);
                    skipped.push(token.to_string());
                }
            }
        }
        RequestPlan { tasks, skipped }
    }

    /// Run every task of a request. Returns the result stream (exactly one
    /// `TaskResult` per task; closes when all tasks are done) and the
    /// skipped tokens for the caller to surface.
    ///
    /// The consumer must read the stream to completion; results are only
    /// dropped if the receiver is.
    pub fn run(self: &Arc<Self>, text: &str) -> (mpsc::Receiver<TaskResult>, Vec<String>) {
        let plan = self.plan(text);
        let (tx, rx) = mpsc::channel(plan.tasks.len().max(1));
        let gate = Arc::new(Semaphore::new(self.fanout_cap));

        for task in plan.tasks {
            let tx = tx.clone();
            let gate = Arc::clone(&gate);
            let this = Arc::clone(self);
            tokio::spawn(async move {
                // The semaphore is never closed; worst case we run ungated
                // rather than lose the result.
                let _permit = gate.acquire_owned().await.ok();
                let result =
                    supervise::supervise(&this.binary, &task, &this.classifier, this.timeout)
                        .await;
                let _ = tx.send(result).await;
            });
        }
        // Dropping the original sender leaves the per-task clones as the only
        // holders; the stream closes when the last task finishes.
        (rx, plan.skipped)
    }
}
