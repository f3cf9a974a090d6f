//! Twilio phone integration
//!
//! Outbound call placement over the REST API, the per-call webhook logic,
//! and TwiML generation.

pub mod call_handler;
pub mod client;
pub mod twiml;

pub use call_handler::{CallHandler, CLARIFICATION_REPLY};
pub use client::{read_published_url, CallRequest, TwilioClient};
use serde::Deserialize;
pub use twiml::TwimlBuilder;

const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

/// Configuration for Twilio integration
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,
    /// Twilio Auth Token
    pub auth_token: String,
    /// Twilio number the call is placed from
    pub from_number: Option<String>,
    /// Number that gets called
    pub to_number: Option<String>,
    /// REST API root, overridable for tests
    pub api_base_url: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: None,
            to_number: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl TwilioConfig {
    /// Check if credentials are present
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty()
    }

    /// Create config from environment variables
    pub fn from_env() -> TwilioResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key/value source. Account SID and auth token
    /// are required.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TwilioResult<Self> {
        // Helper to get a non-empty value
        let get_env = |key: &str| -> Option<String> {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let require = |key: &str| {
            get_env(key).ok_or_else(|| TwilioError::ConfigError(format!("{key} is not set")))
        };

        Ok(Self {
            account_sid: require("TWILIO_ACCOUNT_SID")?,
            auth_token: require("TWILIO_AUTH_TOKEN")?,
            from_number: get_env("TWILIO_FROM_NUMBER"),
            to_number: get_env("TWILIO_TO_NUMBER"),
            api_base_url: get_env("TWILIO_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }

    /// Source and destination numbers, both required to originate a call
    pub fn call_numbers(&self) -> TwilioResult<(&str, &str)> {
        let from = self
            .from_number
            .as_deref()
            .ok_or_else(|| TwilioError::ConfigError("TWILIO_FROM_NUMBER is not set".to_string()))?;
        let to = self
            .to_number
            .as_deref()
            .ok_or_else(|| TwilioError::ConfigError("TWILIO_TO_NUMBER is not set".to_string()))?;
        Ok((from, to))
    }
}

/// Parameters Twilio sends to the voice webhook
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoiceWebhookParams {
    /// Unique identifier for the call
    pub call_sid: Option<String>,
    /// The transcribed speech, present after a Gather
    pub speech_result: Option<String>,
}

impl VoiceWebhookParams {
    /// Recognised speech, if any. Blank results count as no speech.
    pub fn speech(&self) -> Option<&str> {
        self.speech_result
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Twilio call status callback
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwilioStatusCallback {
    /// The call SID
    pub call_sid: String,
    /// Call status
    pub call_status: String,
    /// Call duration in seconds
    pub call_duration: Option<String>,
}

/// Twilio error types
#[derive(Debug, thiserror::Error)]
pub enum TwilioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type TwilioResult<T> = Result<T, TwilioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_speech_counts_as_none() {
        let params = VoiceWebhookParams {
            call_sid: Some("CA1".to_string()),
            speech_result: Some("   ".to_string()),
        };
        assert_eq!(params.speech(), None);

        let params = VoiceWebhookParams {
            speech_result: Some(" my sink ".to_string()),
            ..params
        };
        assert_eq!(params.speech(), Some("my sink"));
    }

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup_reads_credentials_and_numbers() {
        let config = TwilioConfig::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", " secret "),
            ("TWILIO_FROM_NUMBER", "+15550001111"),
            ("TWILIO_TO_NUMBER", ""),
        ]))
        .unwrap();

        assert_eq!(config.account_sid, "AC123");
        assert_eq!(config.auth_token, "secret");
        assert_eq!(config.from_number.as_deref(), Some("+15550001111"));
        assert_eq!(config.to_number, None);
        assert_eq!(config.api_base_url, "https://api.twilio.com");
    }

    #[test]
    fn test_from_lookup_requires_credentials() {
        let err = TwilioConfig::from_lookup(lookup_from(&[("TWILIO_AUTH_TOKEN", "secret")]))
            .unwrap_err();
        assert!(matches!(err, TwilioError::ConfigError(msg) if msg.contains("TWILIO_ACCOUNT_SID")));

        let err = TwilioConfig::from_lookup(lookup_from(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, TwilioError::ConfigError(msg) if msg.contains("TWILIO_AUTH_TOKEN")));
    }

    #[test]
    fn test_call_numbers_are_required() {
        let config = TwilioConfig {
            account_sid: "AC1".to_string(),
            auth_token: "token".to_string(),
            from_number: Some("+15550001111".to_string()),
            ..TwilioConfig::default()
        };

        assert!(config.is_configured());
        assert!(matches!(config.call_numbers(), Err(TwilioError::ConfigError(_))));

        let config = TwilioConfig {
            to_number: Some("+15550002222".to_string()),
            ..config
        };
        assert_eq!(config.call_numbers().unwrap(), ("+15550001111", "+15550002222"));
    }
}
