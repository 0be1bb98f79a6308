//! Orchestrator integration tests against a scripted stand-in for yt-dlp.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Instant;

use tgdl_core::config::BotConfig;
use tgdl_core::downloader::Downloader;
use tgdl_core::request::{TaskError, TaskResult};

fn test_config(dir: &tempfile::TempDir) -> BotConfig {
    BotConfig {
        binary_path: Some(common::fake_binary(dir.path())),
        output_dir: dir.path().to_string_lossy().into_owned(),
        queue_capacity: 8,
        ..BotConfig::default()
    }
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<TaskResult>) -> Vec<TaskResult> {
    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }
    results
}

#[tokio::test]
async fn one_result_per_valid_url() {
    let dir = tempfile::tempdir().unwrap();
    let dl = Arc::new(Downloader::new(&test_config(&dir)).unwrap());

    let (rx, skipped) = dl.run("https://example.com/a https://example.com/b not-a-url");
    assert_eq!(skipped, vec!["not-a-url"]);

    let results = collect(rx).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_success()));

    let mut names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a.mp4", "b.mp4"]);
}

#[tokio::test]
async fn failed_task_does_not_affect_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let dl = Arc::new(Downloader::new(&test_config(&dir)).unwrap());

    let (rx, _) = dl.run("https://example.com/ok https://example.com/fail");
    let results = collect(rx).await;
    assert_eq!(results.len(), 2);

    let failed = results.iter().find(|r| !r.is_success()).unwrap();
    assert!(matches!(failed.error, Some(TaskError::Exit { .. })));
    // The diagnostic names the binary and its arguments.
    assert!(failed.output.contains("fake-yt-dlp"));
    assert!(failed.output.contains("https://example.com/fail"));

    let succeeded = results.iter().find(|r| r.is_success()).unwrap();
    assert_eq!(succeeded.file_name, "ok.mp4");
}

#[tokio::test]
async fn timeout_kills_the_subprocess() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        task_timeout_secs: 1,
        ..test_config(&dir)
    };
    let dl = Arc::new(Downloader::new(&cfg).unwrap());

    let start = Instant::now();
    let (rx, _) = dl.run("https://example.com/slow");
    let results = collect(rx).await;
    // Killed at the deadline, well before the script's 5 s sleep ends.
    assert!(start.elapsed().as_secs() < 4);

    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0].error,
        Some(TaskError::Timeout { timeout_secs: 1 })
    ));
}

#[tokio::test]
async fn matched_output_does_not_rescue_a_timed_out_task() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        task_timeout_secs: 1,
        ..test_config(&dir)
    };
    let dl = Arc::new(Downloader::new(&cfg).unwrap());

    // The script prints a classifier-matching path immediately, then keeps
    // running past the deadline. The deadline wins: no success, no file name.
    let (rx, _) = dl.run("https://example.com/tease");
    let results = collect(rx).await;
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0].error,
        Some(TaskError::Timeout { timeout_secs: 1 })
    ));
    assert!(results[0].file_name.is_empty());
}

#[tokio::test]
async fn clean_exit_without_artifact_still_yields_one_result() {
    let dir = tempfile::tempdir().unwrap();
    let dl = Arc::new(Downloader::new(&test_config(&dir)).unwrap());

    let (rx, _) = dl.run("https://example.com/quiet");
    let results = collect(rx).await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert!(results[0].file_name.is_empty());
}

#[tokio::test]
async fn fanout_cap_still_delivers_every_result() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        max_tasks_per_request: 2,
        ..test_config(&dir)
    };
    let dl = Arc::new(Downloader::new(&cfg).unwrap());

    let text = (0..6)
        .map(|i| format!("https://example.com/v{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    let (rx, skipped) = dl.run(&text);
    assert!(skipped.is_empty());

    let results = collect(rx).await;
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.is_success()));
}

#[tokio::test]
async fn missing_binary_is_a_start_failure_result() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = BotConfig {
        binary_path: Some(dir.path().join("does-not-exist")),
        output_dir: dir.path().to_string_lossy().into_owned(),
        ..BotConfig::default()
    };
    let dl = Arc::new(Downloader::new(&cfg).unwrap());

    let (rx, _) = dl.run("https://example.com/a");
    let results = collect(rx).await;
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].error, Some(TaskError::Start { .. })));
}
