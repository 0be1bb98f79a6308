use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tgdl_core::config;
use tgdl_core::downloader::Downloader;
use tgdl_core::logging;
use tgdl_core::queue::JobQueue;
use tgdl_core::transport::Transport;
use tgdl_core::worker::WorkerPool;

mod health;
mod telegram;

use telegram::TelegramBot;

/// Telegram bot that queues inbound links and downloads them with yt-dlp.
#[derive(Debug, Parser)]
#[command(name = "tgdl")]
#[command(about = "Telegram-driven yt-dlp download bot", long_about = None)]
struct Cli {
    /// Bot API token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// Config file path (defaults to ~/.config/tgdl/config.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    logging::init_logging();

    if let Err(err) = run().await {
        eprintln!("tgdl error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match cli.config {
        Some(path) => config::load_or_init_at(path)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);

    let bot = Arc::new(TelegramBot::new(
        &cli.token,
        cfg.allowed_chat_ids.clone(),
        cfg.disable_web_page_preview,
    )?);

    // No transport session, no bot: this one is fatal.
    let me = bot
        .get_me()
        .await
        .context("could not establish transport session (getMe)")?;
    tracing::info!(
        "authorized on account {}",
        me.username.as_deref().unwrap_or("<unnamed>")
    );

    let downloader = Arc::new(Downloader::new(&cfg).context("construct downloader")?);
    let queue = JobQueue::new(cfg.queue_capacity);
    let pool = WorkerPool::spawn(
        cfg.worker_count,
        queue.clone(),
        Arc::clone(&bot) as Arc<dyn Transport>,
        downloader,
    );

    if let Some(port) = cfg.http_port {
        let bot = Arc::clone(&bot);
        let endpoint = cfg.health_endpoint.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, endpoint, bot).await {
                tracing::error!("health endpoint failed: {}", e);
            }
        });
    }

    tokio::select! {
        _ = bot.run_polling(&queue) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    // Stop intake, let the workers finish what is buffered, then leave.
    queue.close().await;
    pool.join().await;
    tracing::info!("all workers stopped");
    Ok(())
}
