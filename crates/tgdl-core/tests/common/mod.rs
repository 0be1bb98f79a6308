//! Shared fixtures: a fake yt-dlp and a transport that records every send.

// Not every test crate uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tgdl_core::transport::{MessageHandle, ParseMode, Transport, TransportError};

/// Install a shell script standing in for yt-dlp. It reads the output dir
/// from its `-P` flag and keys its behavior off the URL (always the last
/// argument):
/// - `*fail*`  → writes to stderr and exits 1
/// - `*slow*`  → sleeps 5 s before finishing
/// - `*tease*` → prints `<dir>/early.mp4` right away, then sleeps 5 s
/// - `*quiet*` → exits 0 without printing an artifact path
/// - anything else → prints `<dir>/<basename>.mp4` like a real run
pub fn fake_binary(dir: &Path) -> PathBuf {
    let path = dir.join("fake-yt-dlp");
    let script = r#"#!/bin/sh
dir=""
prev=""
last=""
for a in "$@"; do
  if [ "$prev" = "-P" ]; then dir="$a"; fi
  prev="$a"
  last="$a"
done
case "$last" in
  *fail*) echo "simulated failure" >&2; exit 1 ;;
  *slow*) sleep 5 ;;
  *tease*) echo "$dir/early.mp4"; sleep 5 ;;
  *quiet*) echo "nothing resembling a path"; exit 0 ;;
esac
echo "[info] fetching $last" >&2
echo "$dir/$(basename "$last").mp4"
"#;
    std::fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

/// Transport that records all outbound text and authorizes everyone.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub edits: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn authorize(&self, _chat_id: i64) -> bool {
        true
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        _mode: ParseMode,
    ) -> Result<MessageHandle, TransportError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(MessageHandle {
            chat_id,
            message_id: self.sent.lock().unwrap().len() as i64,
        })
    }

    async fn edit_message(
        &self,
        _handle: MessageHandle,
        text: &str,
        _mode: ParseMode,
    ) -> Result<(), TransportError> {
        self.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
