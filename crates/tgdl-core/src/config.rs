use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/tgdl/config.toml`.
///
/// Everything the engine needs at construction time lives here; the bot
/// token deliberately does not (it is a secret and comes from the
/// environment or the CLI).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Path to the yt-dlp binary. When unset, `$PATH` is searched at startup.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,
    /// Directory downloaded files are written to. Also anchors artifact
    /// detection in subprocess output, so it must match what yt-dlp prints.
    pub output_dir: String,
    /// Output container passed to yt-dlp via `-t` (e.g. "mp4").
    pub output_format: String,
    /// Optional proxy URL passed to yt-dlp via `--proxy`.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Per-download timeout in seconds, measured from that download's start.
    pub task_timeout_secs: u64,
    /// Number of concurrent workers pulling requests off the queue.
    pub worker_count: usize,
    /// Capacity of the inbound request queue; requests beyond it are dropped
    /// with a notice to the sender.
    pub queue_capacity: usize,
    /// Maximum simultaneous subprocesses for one request. A message with more
    /// URLs than this still downloads them all, just not all at once.
    pub max_tasks_per_request: usize,
    /// Chat ids allowed to use the bot. Empty means everyone (warned at startup).
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
    /// Port for the health-check HTTP endpoint. Unset disables it.
    #[serde(default)]
    pub http_port: Option<u16>,
    /// Path the health endpoint answers on.
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,
    /// Keep link previews out of progress messages.
    #[serde(default = "default_true")]
    pub disable_web_page_preview: bool,
}

fn default_health_endpoint() -> String {
    "/health".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            output_dir: "./".to_string(),
            output_format: "mp4".to_string(),
            proxy: None,
            task_timeout_secs: 300,
            worker_count: 5,
            queue_capacity: 100,
            max_tasks_per_request: 4,
            allowed_chat_ids: Vec::new(),
            http_port: Some(8080),
            health_endpoint: default_health_endpoint(),
            disable_web_page_preview: true,
        }
    }
}

impl BotConfig {
    /// Resolve the yt-dlp binary: the configured path if present, otherwise
    /// whatever `$PATH` offers.
    pub fn resolve_binary(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.binary_path {
            return Ok(path.clone());
        }
        which::which("yt-dlp")
            .map_err(|e| anyhow::anyhow!("yt-dlp not found on PATH (set binary_path): {}", e))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tgdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BotConfig> {
    load_or_init_at(config_path()?)
}

/// Like [`load_or_init`] but with an explicit path (`--config` override, tests).
pub fn load_or_init_at(path: PathBuf) -> Result<BotConfig> {
    if !path.exists() {
        let default_cfg = BotConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BotConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = BotConfig::default();
        assert_eq!(cfg.output_dir, "./");
        assert_eq!(cfg.output_format, "mp4");
        assert_eq!(cfg.task_timeout_secs, 300);
        assert_eq!(cfg.worker_count, 5);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.max_tasks_per_request, 4);
        assert!(cfg.allowed_chat_ids.is_empty());
        assert_eq!(cfg.health_endpoint, "/health");
        assert!(cfg.disable_web_page_preview);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = BotConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: BotConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.output_dir, cfg.output_dir);
        assert_eq!(parsed.task_timeout_secs, cfg.task_timeout_secs);
        assert_eq!(parsed.worker_count, cfg.worker_count);
        assert_eq!(parsed.queue_capacity, cfg.queue_capacity);
        assert_eq!(parsed.http_port, cfg.http_port);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            binary_path = "/opt/yt-dlp/yt-dlp"
            output_dir = "/srv/media"
            output_format = "mkv"
            proxy = "socks5://127.0.0.1:9050"
            task_timeout_secs = 600
            worker_count = 2
            queue_capacity = 10
            max_tasks_per_request = 8
            allowed_chat_ids = [42, -100123]
        "#;
        let cfg: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.binary_path.as_deref(), Some(std::path::Path::new("/opt/yt-dlp/yt-dlp")));
        assert_eq!(cfg.output_dir, "/srv/media");
        assert_eq!(cfg.output_format, "mkv");
        assert_eq!(cfg.proxy.as_deref(), Some("socks5://127.0.0.1:9050"));
        assert_eq!(cfg.task_timeout_secs, 600);
        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.queue_capacity, 10);
        assert_eq!(cfg.max_tasks_per_request, 8);
        assert_eq!(cfg.allowed_chat_ids, vec![42, -100123]);
        // Unset optional sections fall back to defaults.
        assert!(cfg.http_port.is_none());
        assert_eq!(cfg.health_endpoint, "/health");
    }

    #[test]
    fn explicit_binary_path_wins_over_discovery() {
        let cfg = BotConfig {
            binary_path: Some(PathBuf::from("/nonexistent/yt-dlp")),
            ..BotConfig::default()
        };
        // resolve_binary returns the configured path verbatim, no PATH lookup.
        assert_eq!(cfg.resolve_binary().unwrap(), PathBuf::from("/nonexistent/yt-dlp"));
    }
}
