use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Calls that have not reached a final status
    pub active_calls: usize,
    /// Sessions held in memory, finished calls included
    pub sessions: usize,
    pub chat_configured: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.handler().store();
    Json(HealthResponse {
        status: "ok",
        active_calls: store.active_calls(),
        sessions: store.len(),
        chat_configured: store.provider().is_configured(),
    })
}
