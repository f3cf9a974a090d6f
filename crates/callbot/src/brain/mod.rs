//! Chat sessions on top of a pluggable completion provider
//!
//! A [`ChatSession`] is the per-call conversation handle: it is seeded with
//! the persona prompt and keeps the accumulated turn history, forwarding the
//! whole history to the provider on every message.

pub mod providers;

use std::sync::Arc;

pub use providers::{
    ChatMessage, ChatProvider, GeminiConfig, GeminiProvider, MessageRole, ProviderError,
};

/// Stateful conversation with a chat provider
#[derive(Clone)]
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Start a session whose history holds a single seed message
    pub fn start(provider: Arc<dyn ChatProvider>, seed_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            history: vec![ChatMessage::user(seed_prompt)],
        }
    }

    /// Send a user message and return the model's reply.
    ///
    /// History only grows when the provider answers with non-empty text, so a
    /// failed turn leaves the session exactly as it was.
    pub async fn send_message(&mut self, text: &str) -> Result<String, ProviderError> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(text));

        let reply = self.provider.chat(&messages).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        messages.push(ChatMessage::model(reply));
        self.history = messages;
        Ok(reply.to_string())
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("provider", &self.provider.name())
            .field("history_len", &self.history.len())
            .finish()
    }
}
