//! # Callbot - simulated customer on the phone
//!
//! Answers Twilio voice webhooks by role-playing a customer with a plumbing
//! problem. Each call gets a randomly chosen persona; the caller's recognised
//! speech is relayed to a Gemini chat session and the reply is spoken back
//! through TwiML.

pub mod brain;
pub mod conversation;
pub mod persona;
pub mod transcript;
pub mod twilio;

pub use brain::{ChatProvider, ChatSession, GeminiConfig, GeminiProvider};
pub use conversation::{CallSession, ConversationStore};
pub use persona::{Persona, VoiceProfile};
pub use transcript::{ExportOutcome, Speaker, TranscriptError, TranscriptLine};
pub use twilio::{CallHandler, TwilioClient, TwilioConfig, TwilioError, TwimlBuilder};

/// Route Twilio calls back into after every capture.
pub const VOICE_ROUTE: &str = "/english-voice";

/// Route receiving Twilio call status callbacks.
pub const STATUS_ROUTE: &str = "/call-status";
