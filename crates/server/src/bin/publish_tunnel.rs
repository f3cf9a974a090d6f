//! Expose the local webhook server through ngrok and record the public URL.
//!
//! The ngrok agent keeps running after this exits.

use callbot::VOICE_ROUTE;
use server::ServerConfig;
use utils::tunnel::{self, TunnelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::load_dotenv();
    utils::logging::init_tracing();

    let port = ServerConfig::from_env().port;
    let config = TunnelConfig::from_env();
    let published = tunnel::publish(&config, port).await?;

    println!("Public URL: {}", published.public_url);
    println!("Voice webhook: {}{}", published.public_url, VOICE_ROUTE);
    println!("Saved to {}", config.url_file.display());
    if let Some(pid) = published.agent_pid {
        println!("ngrok agent PID: {} (stop it with `kill {}`)", pid, pid);
    }
    Ok(())
}
