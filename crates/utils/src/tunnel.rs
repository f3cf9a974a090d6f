//! Public HTTPS tunnel via the ngrok agent
//!
//! Starts a detached `ngrok http <port>` agent, waits for its local
//! inspection API to report the public URL and hands that URL to other
//! processes through a small text file.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use serde::Deserialize;
use tokio::{process::Command, time::sleep};
use tracing::{info, warn};

const DEFAULT_NGROK_BIN: &str = "ngrok";
const DEFAULT_API_URL: &str = "http://127.0.0.1:4040";
pub const DEFAULT_URL_FILE: &str = "ngrok_url.txt";

/// Environment variable the ngrok agent reads its authtoken from
const AGENT_TOKEN_ENV: &str = "NGROK_AUTHTOKEN";

/// Configuration for the tunnel publisher
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    pub auth_token: Option<String>,
    pub ngrok_bin: String,
    /// Local agent inspection API
    pub api_url: String,
    /// File the public URL is written to
    pub url_file: PathBuf,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            ngrok_bin: DEFAULT_NGROK_BIN.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            url_file: PathBuf::from(DEFAULT_URL_FILE),
            poll_attempts: 20,
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl TunnelConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get_env = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let defaults = Self::default();
        Self {
            auth_token: get_env("NGROK_AUTH_TOKEN"),
            ngrok_bin: get_env("NGROK_BIN").unwrap_or(defaults.ngrok_bin),
            api_url: get_env("NGROK_API_URL").unwrap_or(defaults.api_url),
            url_file: get_env("TUNNEL_URL_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.url_file),
            ..defaults
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("NGROK_AUTH_TOKEN is not set")]
    MissingAuthToken,

    #[error("ngrok binary '{0}' not found in PATH")]
    BinaryNotFound(String),

    #[error("Failed to start ngrok: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ngrok agent API error: {0}")]
    AgentApi(String),

    #[error("No https tunnel for port {port} after {attempts} attempts")]
    Timeout { port: u16, attempts: u32 },

    #[error("Failed to write tunnel URL to {path}: {source}")]
    WriteUrl {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct TunnelList {
    #[serde(default)]
    tunnels: Vec<TunnelInfo>,
}

#[derive(Debug, Deserialize)]
struct TunnelInfo {
    public_url: String,
    proto: String,
    config: Option<TunnelInfoConfig>,
}

#[derive(Debug, Deserialize)]
struct TunnelInfoConfig {
    addr: String,
}

/// A running tunnel
#[derive(Debug, Clone)]
pub struct PublishedTunnel {
    pub public_url: String,
    pub agent_pid: Option<u32>,
}

/// Open a fresh HTTPS tunnel to `port` and persist its public URL.
///
/// Any previous ngrok agent is stopped first. The agent is left running
/// after this returns.
pub async fn publish(config: &TunnelConfig, port: u16) -> Result<PublishedTunnel, TunnelError> {
    let auth_token = config
        .auth_token
        .as_deref()
        .ok_or(TunnelError::MissingAuthToken)?;

    if !binary_available(&config.ngrok_bin).await {
        return Err(TunnelError::BinaryNotFound(config.ngrok_bin.clone()));
    }

    kill_existing_agents(&config.ngrok_bin).await;

    // The agent reads its token from the environment, keeping it out of argv
    let mut child = Command::new(&config.ngrok_bin)
        .arg("http")
        .arg(port.to_string())
        .arg("--log")
        .arg("stdout")
        .env(AGENT_TOKEN_ENV, auth_token)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(TunnelError::Spawn)?;
    let agent_pid = child.id();
    info!("[TUNNEL] ngrok agent started (PID: {:?})", agent_pid);

    let published = async {
        let public_url = wait_for_public_url(
            &config.api_url,
            port,
            config.poll_attempts,
            config.poll_interval,
        )
        .await?;

        info!("[TUNNEL] \"{}\" -> \"http://localhost:{}\"", public_url, port);
        write_url_file(&config.url_file, &public_url).await?;
        Ok::<_, TunnelError>(public_url)
    }
    .await;

    let public_url = match published {
        Ok(url) => url,
        Err(e) => {
            // A half-started agent must not outlive a failed publish
            if let Err(kill_err) = child.kill().await {
                warn!("[TUNNEL] Failed to stop ngrok agent: {}", kill_err);
            }
            return Err(e);
        }
    };

    Ok(PublishedTunnel {
        public_url,
        agent_pid,
    })
}

/// Poll the agent API until a tunnel for `port` shows up
pub async fn wait_for_public_url(
    api_url: &str,
    port: u16,
    attempts: u32,
    interval: Duration,
) -> Result<String, TunnelError> {
    let client = reqwest::Client::new();

    for attempt in 1..=attempts {
        match fetch_public_url(&client, api_url, port).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => {}
            Err(e) => tracing::debug!("[TUNNEL] attempt {}: {}", attempt, e),
        }
        sleep(interval).await;
    }

    Err(TunnelError::Timeout { port, attempts })
}

/// Ask the agent for its tunnels and pick the https one pointing at `port`
async fn fetch_public_url(
    client: &reqwest::Client,
    api_url: &str,
    port: u16,
) -> Result<Option<String>, TunnelError> {
    let url = format!("{}/api/tunnels", api_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| TunnelError::AgentApi(e.to_string()))?;

    if !response.status().is_success() {
        return Err(TunnelError::AgentApi(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let list: TunnelList = response
        .json()
        .await
        .map_err(|e| TunnelError::AgentApi(e.to_string()))?;

    let port_suffix = format!(":{port}");
    Ok(list
        .tunnels
        .into_iter()
        .find(|t| {
            t.proto == "https"
                && t.config
                    .as_ref()
                    .is_some_and(|c| c.addr.ends_with(&port_suffix))
        })
        .map(|t| t.public_url))
}

/// Overwrite the handoff file with the URL, verbatim
pub async fn write_url_file(path: &Path, url: &str) -> Result<(), TunnelError> {
    tokio::fs::write(path, url)
        .await
        .map_err(|source| TunnelError::WriteUrl {
            path: path.to_path_buf(),
            source,
        })
}

async fn binary_available(bin: &str) -> bool {
    Command::new("which")
        .arg(bin)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Stop agents left over from earlier runs
async fn kill_existing_agents(bin: &str) {
    let name = Path::new(bin)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| bin.to_string());

    match Command::new("pkill")
        .arg("-x")
        .arg(&name)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) if status.success() => {
            info!("[TUNNEL] Stopped previous {} agent", name);
            // Give the old agent time to release the inspection port
            sleep(Duration::from_millis(500)).await;
        }
        Ok(_) => {}
        Err(e) => warn!("[TUNNEL] Could not stop previous agents: {}", e),
    }
}
