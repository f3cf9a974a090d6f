//! Twilio voice webhook routes
//!
//! Twilio fetches `/english-voice` when the call connects and again after
//! every speech capture. Whatever happens, the answer is TwiML with a 200
//! status so the call never drops on a webhook error.

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use callbot::{
    STATUS_ROUTE, VOICE_ROUTE,
    twilio::{TwilioStatusCallback, VoiceWebhookParams},
};
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(VOICE_ROUTE, get(english_voice).post(english_voice))
        .route(STATUS_ROUTE, post(call_status))
}

/// Voice webhook
///
/// GET|POST /english-voice
///
/// `CallSid` and `SpeechResult` arrive in the query string (GET) or the form
/// body (POST). Without recognised speech the caller is greeted; with it the
/// persona answers.
pub async fn english_voice(
    State(state): State<AppState>,
    params: Result<Form<VoiceWebhookParams>, FormRejection>,
) -> impl IntoResponse {
    let params = match params {
        Ok(Form(params)) => params,
        Err(e) => {
            warn!("Unreadable voice webhook parameters: {}", e);
            VoiceWebhookParams::default()
        }
    };

    let call_sid = params.call_sid.as_deref().unwrap_or_default();
    let twiml = state
        .handler()
        .handle_voice_webhook(call_sid, params.speech())
        .await;

    (StatusCode::OK, [(header::CONTENT_TYPE, "application/xml")], twiml)
}

/// Call status callback
///
/// POST /call-status
pub async fn call_status(
    State(state): State<AppState>,
    callback: Result<Form<TwilioStatusCallback>, FormRejection>,
) -> StatusCode {
    match callback {
        Ok(Form(callback)) => {
            state
                .handler()
                .handle_status_update(
                    &callback.call_sid,
                    &callback.call_status,
                    callback.call_duration.as_deref(),
                )
                .await;
        }
        Err(e) => warn!("Unreadable status callback: {}", e),
    }

    StatusCode::OK
}
