//! One task, one subprocess: spawn yt-dlp, scan its output while waiting,
//! and turn whatever happens into exactly one TaskResult.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::request::{Task, TaskError, TaskResult};

use super::classify::{Artifact, OutputClassifier};

/// Run one task to completion under its own deadline.
///
/// Both output streams are scanned concurrently with the wait so the child
/// never stalls on a full pipe. The deadline is authoritative: a matched
/// artifact line does not rescue a task that failed to exit in time.
pub(super) async fn supervise(
    binary: &Path,
    task: &Task,
    classifier: &OutputClassifier,
    timeout: Duration,
) -> TaskResult {
    let diagnostic = format!("{} {}", binary.display(), task.args.join(" "));

    let mut child = match Command::new(binary)
        .args(&task.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(url = %task.url, "failed to start {}: {}", binary.display(), e);
            return TaskResult::failure(
                format!("could not start {}", diagnostic),
                TaskError::Start {
                    binary: binary.display().to_string(),
                    source: e,
                },
            );
        }
    };

    tracing::info!(url = %task.url, "running {}", diagnostic);

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let scan = async {
        let (out, err) = tokio::join!(
            scan_stream("stdout", stdout, classifier, &task.url),
            scan_stream("stderr", stderr, classifier, &task.url),
        );
        out.or(err)
    };

    let supervised = async { tokio::join!(child.wait(), scan) };
    // Bound to a local so the borrow of `child` ends before the kill path.
    let outcome = tokio::time::timeout(timeout, supervised).await;

    match outcome {
        Err(_) => {
            // Deadline expired: kill the child and reap it before reporting.
            let _ = child.start_kill();
            let _ = child.wait().await;
            tracing::warn!(url = %task.url, "killed after {}s: {}", timeout.as_secs(), diagnostic);
            TaskResult::failure(
                format!("timed out: {}", diagnostic),
                TaskError::Timeout {
                    timeout_secs: timeout.as_secs(),
                },
            )
        }
        Ok((Err(e), _)) => TaskResult::failure(
            format!("wait failed: {}", diagnostic),
            TaskError::Wait(e),
        ),
        Ok((Ok(status), _)) if !status.success() => {
            tracing::warn!(url = %task.url, "exited with {}: {}", status, diagnostic);
            TaskResult::failure(
                format!("processing failed: {}", diagnostic),
                TaskError::Exit { status },
            )
        }
        Ok((Ok(_), Some(artifact))) => TaskResult::success(artifact.file_name, artifact.line),
        // Clean exit but no artifact line: still exactly one result, with an
        // empty file name so the caller can tell the difference.
        Ok((Ok(_), None)) => TaskResult::success("", "completed without reporting a file"),
    }
}

/// Read one output stream line by line until EOF, keeping the last line the
/// classifier accepts. The stream is always drained fully, match or not.
async fn scan_stream<R>(
    stream: &str,
    reader: Option<R>,
    classifier: &OutputClassifier,
    url: &str,
) -> Option<Artifact>
where
    R: AsyncRead + Unpin,
{
    let reader = reader?;
    let mut lines = BufReader::new(reader).lines();
    let mut found = None;
    while let Ok(Some(line)) = lines.next_line().await {
        match classifier.classify(&line) {
            Some(artifact) => {
                tracing::info!(url, stream, "artifact: {}", artifact.line);
                found = Some(artifact);
            }
            None => tracing::debug!(url, stream, "{}", line),
        }
    }
    found
}
