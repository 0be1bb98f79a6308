//! Health-check HTTP endpoint.
//!
//! One path, one probe: a request to the configured endpoint answers 200/OK
//! while getMe succeeds, 500/FAIL otherwise. Deliberately a raw TCP
//! responder on tokio; tgdl does not need an HTTP framework for this.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::telegram::TelegramBot;

pub async fn serve(port: u16, endpoint: String, bot: Arc<TelegramBot>) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("bind health endpoint on port {}", port))?;
    tracing::info!("health endpoint listening on :{}{}", port, endpoint);

    loop {
        let (stream, _) = listener.accept().await.context("accept health connection")?;
        let bot = Arc::clone(&bot);
        let endpoint = endpoint.clone();
        tokio::spawn(async move {
            handle_connection(stream, &endpoint, &bot).await;
        });
    }
}

async fn handle_connection(mut stream: TcpStream, endpoint: &str, bot: &TelegramBot) {
    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap_or(0);
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("");

    let (status, body) = if path == endpoint {
        if bot.get_me().await.is_ok() {
            ("200 OK", "OK")
        } else {
            ("500 Internal Server Error", "FAIL")
        }
    } else {
        ("404 Not Found", "NOT FOUND")
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("health response write failed: {}", e);
    }
}
