use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callbot::TranscriptError;
use thiserror::Error;

/// Failures a route cannot answer with a normal body.
///
/// The voice webhook never produces one of these; it always answers with
/// TwiML.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type, error_message) = match &self {
            ApiError::Transcript(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TranscriptError",
                format!("Failed to save transcript: {}", e),
            ),
        };

        tracing::error!("{}: {}", error_type, self);
        (status_code, error_message).into_response()
    }
}
