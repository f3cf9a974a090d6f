use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new().route("/save-transcript/{call_sid}", get(save_transcript))
}

/// Write the call's transcript to disk and report where it went.
///
/// An unknown call is not an error: the body just says so.
pub async fn save_transcript(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Result<String, ApiError> {
    let outcome = state
        .handler()
        .export_transcript(&call_sid, state.transcript_dir())
        .await?;

    Ok(outcome.message())
}
