//! State kept for one phone call

use chrono::{DateTime, Utc};

use crate::{
    brain::ChatSession,
    persona::{Persona, VoiceProfile},
    transcript::TranscriptLine,
};

/// Call status as reported by Twilio status callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Completed,
    Failed,
    Busy,
    NoAnswer,
    Canceled,
}

impl CallStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "queued" => Some(CallStatus::Queued),
            "ringing" => Some(CallStatus::Ringing),
            "in-progress" => Some(CallStatus::InProgress),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            "busy" => Some(CallStatus::Busy),
            "no-answer" => Some(CallStatus::NoAnswer),
            "canceled" => Some(CallStatus::Canceled),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Failed
                | CallStatus::Busy
                | CallStatus::NoAnswer
                | CallStatus::Canceled
        )
    }
}

/// Conversation state for an active call
#[derive(Debug)]
pub struct CallSession {
    pub call_sid: String,
    /// Fixed at creation; voice and greeting derive from it on every turn
    pub persona: Persona,
    pub chat: ChatSession,
    pub transcript: Vec<TranscriptLine>,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    pub fn new(call_sid: impl Into<String>, persona: Persona, chat: ChatSession) -> Self {
        let now = Utc::now();
        Self {
            call_sid: call_sid.into(),
            persona,
            chat,
            transcript: Vec::new(),
            status: CallStatus::InProgress,
            started_at: now,
            last_activity: now,
        }
    }

    pub fn voice_profile(&self) -> VoiceProfile {
        self.persona.voice_profile()
    }

    pub fn record(&mut self, line: TranscriptLine) {
        self.transcript.push(line);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Number of complete client/support exchanges
    pub fn turns(&self) -> usize {
        self.transcript.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(CallStatus::parse("in-progress"), Some(CallStatus::InProgress));
        assert_eq!(CallStatus::parse("no-answer"), Some(CallStatus::NoAnswer));
        assert_eq!(CallStatus::parse("whatever"), None);
        assert!(CallStatus::Completed.is_finished());
        assert!(!CallStatus::Ringing.is_finished());
    }
}
