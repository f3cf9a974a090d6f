use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod health;
pub mod transcript;
pub mod voice;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(voice::router())
        .merge(transcript::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
