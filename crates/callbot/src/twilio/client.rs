//! Outbound call placement through the Twilio REST API

use std::path::Path;

use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use super::{TwilioConfig, TwilioError, TwilioResult};
use crate::{STATUS_ROUTE, VOICE_ROUTE};

/// A call to originate
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub to: String,
    pub from: String,
    /// Webhook Twilio fetches TwiML from once the call is answered
    pub url: String,
    pub status_callback: Option<String>,
}

impl CallRequest {
    /// Build a request whose webhooks live under `base_url`
    pub fn for_base_url(base_url: &str, from: &str, to: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        Self {
            to: to.to_string(),
            from: from.to_string(),
            url: format!("{base}{VOICE_ROUTE}"),
            status_callback: Some(format!("{base}{STATUS_ROUTE}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Minimal Twilio REST client
pub struct TwilioClient {
    client: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> TwilioResult<Self> {
        if !config.is_configured() {
            return Err(TwilioError::ConfigError(
                "Twilio account SID and auth token are required".to_string(),
            ));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    fn calls_endpoint(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// Ask Twilio to place a call. Returns the new call SID.
    pub async fn create_call(&self, request: &CallRequest) -> TwilioResult<String> {
        let mut form = vec![
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Url", request.url.as_str()),
            ("Method", "POST"),
        ];
        if let Some(ref callback) = request.status_callback {
            form.push(("StatusCallback", callback.as_str()));
            form.push(("StatusCallbackMethod", "POST"));
        }

        let response = self
            .client
            .post(self.calls_endpoint())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(body);
            error!("Twilio rejected call to {}: {}", request.to, message);
            return Err(TwilioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallResource = response.json().await?;
        info!(
            "Call {} created to {} (status: {:?})",
            call.sid, request.to, call.status
        );
        Ok(call.sid)
    }
}

/// Read the public base URL left behind by the tunnel publisher
pub async fn read_published_url(path: &Path) -> TwilioResult<String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        TwilioError::ConfigError(format!(
            "cannot read published URL from {}: {}",
            path.display(),
            e
        ))
    })?;

    let url = contents.trim();
    if url.is_empty() {
        return Err(TwilioError::ConfigError(format!(
            "published URL file {} is empty",
            path.display()
        )));
    }

    Ok(url.to_string())
}
