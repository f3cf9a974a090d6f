use std::sync::Arc;

use callbot::{
    CallHandler, ChatProvider, ConversationStore, GeminiConfig, GeminiProvider, VOICE_ROUTE,
    brain::ProviderError,
};
use server::{AppState, ServerConfig, routes, spawn_idle_sweeper};
use thiserror::Error;
use utils::tunnel::{self, TunnelConfig, TunnelError};

#[derive(Debug, Error)]
pub enum CallbotServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Tunnel(#[from] TunnelError),
}

#[tokio::main]
async fn main() -> Result<(), CallbotServerError> {
    utils::load_dotenv();
    utils::logging::init_tracing();

    let config = ServerConfig::from_env();

    let provider = Arc::new(GeminiProvider::new(GeminiConfig::from_env())?);
    if !provider.is_configured() {
        tracing::warn!("GEMINI_API_KEY not set - every turn will get the clarification reply");
    }

    let store = Arc::new(ConversationStore::new(provider));
    match config.session_idle_timeout {
        Some(max_idle) => {
            tracing::info!(
                "Evicting call sessions idle for more than {} minutes",
                max_idle.num_minutes()
            );
            spawn_idle_sweeper(store.clone(), max_idle);
        }
        None => tracing::debug!("Session eviction disabled"),
    }

    let state = AppState::new(
        Arc::new(CallHandler::new(store)),
        config.transcript_dir.clone(),
    );

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let actual_port = listener.local_addr()?.port();

    if config.publish_tunnel {
        let published = tunnel::publish(&TunnelConfig::from_env(), actual_port).await?;
        tracing::info!("Voice webhook: {}{}", published.public_url, VOICE_ROUTE);
    } else {
        tracing::info!("Tunnel publishing disabled (set PUBLISH_TUNNEL=true to enable)");
    }

    tracing::info!("Server running on http://{}:{}", config.host, actual_port);

    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
