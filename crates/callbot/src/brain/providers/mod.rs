//! Chat completion backends
//!
//! The rest of the crate only talks to [`ChatProvider`]; Gemini is the one
//! production implementation.

mod gemini;
mod provider_trait;

pub use gemini::{GeminiConfig, GeminiProvider};
pub use provider_trait::{ChatMessage, ChatProvider, MessageRole, ProviderError};
