//! Minimal Telegram Bot API client: long polling in, message send/edit out.
//!
//! The Bot API surface tgdl needs is four JSON POSTs (getMe, getUpdates,
//! sendMessage, editMessageText), so this is a typed reqwest client rather
//! than an SDK. It implements the engine's `Transport` trait; everything
//! engine-side stays ignorant of Telegram.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use tgdl_core::queue::{JobQueue, QueueError};
use tgdl_core::request::Request;
use tgdl_core::transport::{escape_text, MessageHandle, ParseMode, Transport, TransportError};

const API_BASE: &str = "https://api.telegram.org";

/// Long-poll wait passed to getUpdates.
const POLL_TIMEOUT_SECS: u64 = 60;

/// Backoff after a failed getUpdates round before retrying.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// getMe result, used at startup and by the health probe.
#[derive(Debug, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

pub struct TelegramBot {
    http: reqwest::Client,
    base: String,
    allowed_chat_ids: Vec<i64>,
    disable_web_page_preview: bool,
}

impl TelegramBot {
    pub fn new(
        token: &str,
        allowed_chat_ids: Vec<i64>,
        disable_web_page_preview: bool,
    ) -> Result<Self> {
        if allowed_chat_ids.is_empty() {
            tracing::warn!("‼️ allowed_chat_ids is empty; every chat will be accepted");
        }
        // The client timeout must outlast the long-poll wait.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 30))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base: format!("{}/bot{}", API_BASE, token),
            allowed_chat_ids,
            disable_web_page_preview,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError(format!("{}: {}", method, e)))?;
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError(format!("{}: {}", method, e)))?;
        if !body.ok {
            return Err(TransportError(format!(
                "{}: {}",
                method,
                body.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        body.result
            .ok_or_else(|| TransportError(format!("{}: empty result", method)))
    }

    /// Verify the token works. Failure here is fatal at startup; the health
    /// endpoint reuses it as a liveness probe.
    pub async fn get_me(&self) -> Result<BotIdentity, TransportError> {
        self.call("getMe", &json!({})).await
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": POLL_TIMEOUT_SECS }),
        )
        .await
    }

    /// Ingestion loop: long-poll for updates and enqueue each text message.
    /// A full queue drops the request and tells the chat; a closed queue
    /// ends the loop (shutdown).
    pub async fn run_polling(self: &Arc<Self>, queue: &JobQueue) {
        let mut offset = 0i64;
        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("getUpdates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                let chat_id = message.chat.id;

                match queue.enqueue(Request::new(chat_id, text)) {
                    Ok(()) => {
                        tracing::debug!(
                            chat_id,
                            message_id = message.message_id,
                            queued = queue.len(),
                            "request enqueued"
                        );
                    }
                    Err(QueueError::Full { capacity }) => {
                        tracing::error!(
                            chat_id,
                            capacity,
                            "queue is full, message {} dropped",
                            message.message_id
                        );
                        if let Err(e) = self
                            .send_message(chat_id, "Queue is full, request dropped", ParseMode::Html)
                            .await
                        {
                            tracing::warn!(chat_id, "drop notice failed: {}", e);
                        }
                    }
                    Err(QueueError::Closed) => {
                        tracing::info!("queue closed, stopping ingestion");
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TelegramBot {
    fn authorize(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.is_empty() || self.allowed_chat_ids.contains(&chat_id)
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: ParseMode,
    ) -> Result<MessageHandle, TransportError> {
        let payload = json!({
            "chat_id": chat_id,
            "text": escape_text(mode, text),
            "parse_mode": mode.as_str(),
            "disable_notification": true,
            "disable_web_page_preview": self.disable_web_page_preview,
        });
        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        Ok(MessageHandle {
            chat_id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        text: &str,
        mode: ParseMode,
    ) -> Result<(), TransportError> {
        let payload = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
            "text": escape_text(mode, text),
            "parse_mode": mode.as_str(),
            "disable_web_page_preview": self.disable_web_page_preview,
        });
        let _: serde_json::Value = self.call("editMessageText", &payload).await?;
        Ok(())
    }
}
