pub mod error;
pub mod routes;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use callbot::{CallHandler, ConversationStore};
use tokio::task::JoinHandle;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// How often the idle sweeper looks for stale sessions
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-level settings for the webhook server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory transcripts are written into
    pub transcript_dir: PathBuf,
    /// Open an ngrok tunnel to the server at start-up
    pub publish_tunnel: bool,
    /// Evict sessions idle for longer than this; `None` keeps them forever
    pub session_idle_timeout: Option<chrono::Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            transcript_dir: PathBuf::from("."),
            publish_tunnel: true,
            session_idle_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get_env = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let defaults = Self::default();
        Self {
            host: get_env("HOST").unwrap_or(defaults.host),
            port: get_env("PORT")
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            transcript_dir: get_env("TRANSCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.transcript_dir),
            publish_tunnel: utils::parse_flag(
                get_env("PUBLISH_TUNNEL").as_deref(),
                defaults.publish_tunnel,
            ),
            session_idle_timeout: get_env("SESSION_IDLE_TIMEOUT_MINS")
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|mins| *mins > 0)
                .map(chrono::Duration::minutes),
        }
    }
}

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    handler: Arc<CallHandler>,
    transcript_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(handler: Arc<CallHandler>, transcript_dir: impl Into<PathBuf>) -> Self {
        Self {
            handler,
            transcript_dir: Arc::new(transcript_dir.into()),
        }
    }

    pub fn handler(&self) -> &CallHandler {
        &self.handler
    }

    pub fn transcript_dir(&self) -> &Path {
        &self.transcript_dir
    }
}

/// Periodically drop sessions nobody has talked to in `max_idle`
pub fn spawn_idle_sweeper(store: Arc<ConversationStore>, max_idle: chrono::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if store.is_empty() {
                continue;
            }

            let evicted = store.evict_idle(max_idle);
            if !evicted.is_empty() {
                tracing::info!(
                    "Evicted {} idle call sessions ({} remaining, {} active calls)",
                    evicted.len(),
                    store.len(),
                    store.active_calls()
                );
            }
        }
    })
}
