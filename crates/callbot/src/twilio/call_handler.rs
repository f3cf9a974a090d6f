//! Twilio call handler driving the simulated customer
//!
//! Every webhook invocation for a call lands here. The first one (no
//! recognised speech yet) greets and listens; every later one records the
//! caller's words, asks the chat session for a reply and speaks it back.
//! Chat failures never reach Twilio: the caller hears a request to repeat.

use std::{path::Path, sync::Arc};

use chrono::Utc;
use tracing::{error, info, warn};

use super::twiml::TwimlBuilder;
use crate::{
    conversation::{CallStatus, ConversationStore},
    transcript::{self, ExportOutcome, TranscriptError, TranscriptLine},
    VOICE_ROUTE,
};

/// Spoken (and logged) in place of a reply whenever the chat call fails
pub const CLARIFICATION_REPLY: &str = "Sorry, I think I misunderstood. Could you repeat that?";

/// Handles the webhook side of every call
pub struct CallHandler {
    store: Arc<ConversationStore>,
}

impl CallHandler {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Dispatch one voice webhook. Always returns TwiML.
    pub async fn handle_voice_webhook(&self, call_sid: &str, speech: Option<&str>) -> String {
        match speech {
            Some(text) => self.handle_speech_input(call_sid, text).await,
            None => self.handle_call_start(call_sid).await,
        }
    }

    /// Greet the caller while listening; hang up if nothing is heard
    pub async fn handle_call_start(&self, call_sid: &str) -> String {
        let (session, created) = self.store.lock_or_create(call_sid).await;
        let profile = session.voice_profile();
        drop(session);

        info!(
            "Call {} started (new session: {}, voice: {})",
            call_sid, created, profile.voice
        );

        TwimlBuilder::call_start(&profile, VOICE_ROUTE)
    }

    /// Record the caller's words, get the persona's reply and speak it
    pub async fn handle_speech_input(&self, call_sid: &str, speech: &str) -> String {
        // Held for the whole turn so turns of one call never interleave
        let (mut session, created) = self.store.lock_or_create(call_sid).await;
        if created {
            warn!("Speech for unseen call {}, created a session", call_sid);
        }

        info!("Caller said on {}: {}", call_sid, speech);
        session.record(TranscriptLine::client(speech));

        let reply = match session.chat.send_message(speech).await {
            Ok(reply) => {
                info!("Persona replied on {}: {}", call_sid, reply);
                reply
            }
            Err(e) => {
                error!(
                    "Error with {} on call {}: {}",
                    session.chat.provider_name(),
                    call_sid,
                    e
                );
                CLARIFICATION_REPLY.to_string()
            }
        };
        session.record(TranscriptLine::support(reply.as_str()));

        let profile = session.voice_profile();
        TwimlBuilder::reply_and_gather(&reply, &profile, VOICE_ROUTE)
    }

    /// Handle call status update
    pub async fn handle_status_update(&self, call_sid: &str, status: &str, duration: Option<&str>) {
        info!(
            "Call {} status update: {} (duration: {:?}s)",
            call_sid, status, duration
        );

        let Some(session) = self.store.get(call_sid) else {
            warn!("Status update for unknown call: {}", call_sid);
            return;
        };

        let Some(parsed) = CallStatus::parse(status) else {
            warn!("Unrecognised status '{}' for call {}", status, call_sid);
            return;
        };

        let mut session = session.lock().await;
        session.status = parsed;
        session.touch();

        if parsed.is_finished() {
            let elapsed = Utc::now() - session.started_at;
            info!(
                "Call {} ended with {} turns after {}s",
                call_sid,
                session.turns(),
                elapsed.num_seconds()
            );
        }
    }

    /// Write the call's transcript into `dir`
    pub async fn export_transcript(
        &self,
        call_sid: &str,
        dir: &Path,
    ) -> Result<ExportOutcome, TranscriptError> {
        let Some(session) = self.store.get(call_sid) else {
            info!("Transcript requested for unknown call {}", call_sid);
            return Ok(ExportOutcome::NotFound);
        };

        let lines = session.lock().await.transcript.clone();
        transcript::write_transcript(dir, call_sid, &lines).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        brain::{ChatMessage, ChatProvider, ProviderError},
        persona::Persona,
    };

    /// Replies from a queue; an empty queue means the model is down
    struct QueueProvider {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
    }

    impl QueueProvider {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for QueueProvider {
        fn name(&self) -> &'static str {
            "queue"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::RequestFailed("model down".to_string())))
        }
    }

    fn handler(replies: Vec<Result<String, ProviderError>>, persona: fn() -> Persona) -> CallHandler {
        let store = ConversationStore::new(QueueProvider::new(replies)).with_persona_picker(persona);
        CallHandler::new(Arc::new(store))
    }

    async fn transcript_of(handler: &CallHandler, call_sid: &str) -> Vec<String> {
        let session = handler.store().get(call_sid).unwrap();
        let session = session.lock().await;
        session.transcript.iter().map(|l| l.to_string()).collect()
    }

    #[tokio::test]
    async fn test_call_start_creates_session_without_transcript() {
        let handler = handler(vec![], || Persona::Hispanic);

        let twiml = handler.handle_voice_webhook("CA1", None).await;

        assert!(twiml.contains("<Gather input=\"speech\" action=\"/english-voice\""));
        assert!(twiml.contains("timeout=\"8\""));
        assert!(twiml.contains("Polly.Penelope"));
        assert!(twiml.contains("I didn&apos;t hear anything."));
        assert!(twiml.contains("<Hangup/>"));
        assert_eq!(handler.store().len(), 1);
        assert!(transcript_of(&handler, "CA1").await.is_empty());
    }

    #[tokio::test]
    async fn test_each_turn_appends_client_then_support() {
        let handler = handler(
            vec![Ok("The kitchen sink is leaking.".to_string()), Ok("Since Monday.".to_string())],
            || Persona::American,
        );

        handler.handle_voice_webhook("CA1", None).await;
        handler.handle_voice_webhook("CA1", Some("What's wrong?")).await;
        let twiml = handler.handle_voice_webhook("CA1", Some("Since when?")).await;

        assert!(twiml.contains(">Since Monday.</Say>"));
        assert_eq!(
            transcript_of(&handler, "CA1").await,
            vec![
                "Client: What's wrong?",
                "Support: The kitchen sink is leaking.",
                "Client: Since when?",
                "Support: Since Monday.",
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_failure_substitutes_clarification() {
        let handler = handler(
            vec![Err(ProviderError::ApiError {
                status: 500,
                message: "boom".to_string(),
            })],
            || Persona::Asian,
        );

        let twiml = handler.handle_voice_webhook("CA1", Some("Hello?")).await;

        assert!(twiml.contains(
            "<Say voice=\"Polly.Ivy\" language=\"en-US\">Sorry, I think I misunderstood. Could you repeat that?</Say>"
        ));
        assert!(twiml.ends_with("</Response>"));
        assert_eq!(
            transcript_of(&handler, "CA1").await,
            vec![
                "Client: Hello?",
                "Support: Sorry, I think I misunderstood. Could you repeat that?",
            ]
        );
    }

    #[tokio::test]
    async fn test_status_update_marks_session() {
        let handler = handler(vec![], || Persona::American);
        handler.handle_call_start("CA1").await;

        handler.handle_status_update("CA1", "completed", Some("42")).await;
        handler.handle_status_update("CA-unknown", "completed", None).await;

        let session = handler.store().get("CA1").unwrap();
        assert_eq!(session.lock().await.status, CallStatus::Completed);
        assert!(!handler.store().contains("CA-unknown"));
    }

    #[tokio::test]
    async fn test_export_unknown_call_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(vec![], || Persona::American);

        let outcome = handler.export_transcript("CA-missing", dir.path()).await.unwrap();

        assert_eq!(outcome, ExportOutcome::NotFound);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_known_call_writes_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(vec![Ok("Water everywhere.".to_string())], || Persona::American);

        handler.handle_voice_webhook("CA7", None).await;
        handler.handle_voice_webhook("CA7", Some("How bad is it?")).await;
        handler.handle_voice_webhook("CA7", Some("Hello?")).await;

        let outcome = handler.export_transcript("CA7", dir.path()).await.unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Saved {
                file_name: "transcript_CA7.txt".to_string(),
                lines: 4
            }
        );

        let content = std::fs::read_to_string(dir.path().join("transcript_CA7.txt")).unwrap();
        assert_eq!(
            content,
            "Client: How bad is it?\n\
             Support: Water everywhere.\n\
             Client: Hello?\n\
             Support: Sorry, I think I misunderstood. Could you repeat that?\n"
        );
    }
}
