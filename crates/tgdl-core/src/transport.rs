//! Boundary to the chat transport. The engine only ever talks to this
//! trait; the Telegram client in the bot crate implements it.
//!
//! Send/edit failures are reported but must stay non-fatal for callers:
//! a dropped render never aborts a download batch.

use async_trait::async_trait;

/// Formatting mode for outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    MarkdownV2,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Opaque reference to a sent message, enough to edit it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Transport-side failure. Carried as a string because the engine never
/// inspects it beyond logging.
#[derive(Debug, thiserror::Error)]
#[error("transport: {0}")]
pub struct TransportError(pub String);

/// Capabilities the engine consumes from the chat layer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Whether this sender may use the bot at all.
    fn authorize(&self, chat_id: i64) -> bool;

    /// Post a new message, returning a handle for later edits.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: ParseMode,
    ) -> Result<MessageHandle, TransportError>;

    /// Replace the text of a previously sent message.
    async fn edit_message(
        &self,
        handle: MessageHandle,
        text: &str,
        mode: ParseMode,
    ) -> Result<(), TransportError>;
}

/// Escape text for MarkdownV2 per the Bot API rules. HTML payloads are
/// built from trusted fragments and pass through untouched.
pub fn escape_text(mode: ParseMode, text: &str) -> String {
    match mode {
        ParseMode::Html => text.to_string(),
        ParseMode::MarkdownV2 => {
            let mut escaped = String::with_capacity(text.len());
            for c in text.chars() {
                if matches!(
                    c,
                    '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                        | '|' | '{' | '}' | '.' | '!'
                ) {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped
        }
    }
}
