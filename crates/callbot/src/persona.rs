//! Persona catalogue for the simulated caller
//!
//! A persona is picked once per call and stored as a tag on the session.
//! Voice and greeting are always derived from the tag, never from the
//! prompt text handed to the model.

use rand::seq::SliceRandom;

/// Language used for every Say and Gather.
pub const CALL_LANGUAGE: &str = "en-US";

/// Voice used when no persona is known, and for the fallback goodbye.
pub const DEFAULT_VOICE: &str = "Polly.Joanna";

const AMERICAN_PROMPT: &str = "Simulate an American person calling about a plumbing problem. \
    Use common American English phrases. \
    Provide realistic fake data like name, address, phone, and zip code when asked. \
    Your name can be John Smith, you live at 123 Main St in Anytown, CA 90210, phone 555-123-4567. \
    Vary your tone based on the context: sound more urgent if the problem is serious. Speak with natural pauses. \
    Sometimes hesitate, ask to repeat, or give unclear answers like 'I think it was yesterday', 'mmm I'm not sure'.";

const HISPANIC_PROMPT: &str = "Simulate a Hispanic person with a noticeable accent speaking English about a plumbing problem. \
    Incorporate some Spanish loanwords or phrasing occasionally (e.g., 'un momento', 'sí'). \
    Provide realistic fake data like name, address, phone, and zip code when asked. \
    Your name can be Carlos Rodriguez, you live at 456 Oak Ave in Somecity, FL 33101, phone 305-555-1212. \
    Vary your tone based on the urgency. Speak with natural pauses and a slight accent. \
    Sometimes hesitate or ask for clarification.";

const ASIAN_PROMPT: &str = "Simulate an Asian person with a noticeable accent speaking English about a plumbing issue. \
    Use slightly more formal English and common filler words. \
    Provide realistic fake data like name, address, phone, and postal code when asked. \
    Your name can be Kenji Tanaka, you live at 789 Pine Ln in Techville, CA 94086, phone 408-555-3434. \
    Vary your tone depending on the situation. Speak with some natural pauses and a slight accent. \
    Occasionally ask for clarification or give vague responses.";

const AMERICAN_GREETING: &str = "Hi, I'm calling because I have a plumbing issue at my house.";
const HISPANIC_GREETING: &str =
    "Hello, I am calling because I have a problem with the plumbing here, sí?";
const ASIAN_GREETING: &str = "Hello, I am calling to report a problem with the water pipes.";

/// Accent the model is asked to role-play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    American,
    Hispanic,
    Asian,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::American, Persona::Hispanic, Persona::Asian];

    /// Pick a persona uniformly at random
    pub fn random() -> Self {
        *Self::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Persona::American)
    }

    /// Seed instruction sent as the first message of the chat session
    pub fn prompt(&self) -> &'static str {
        match self {
            Persona::American => AMERICAN_PROMPT,
            Persona::Hispanic => HISPANIC_PROMPT,
            Persona::Asian => ASIAN_PROMPT,
        }
    }

    /// Map a seed prompt back to its persona. Only exact catalogue prompts match.
    pub fn from_prompt(prompt: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.prompt() == prompt)
    }

    pub fn voice_profile(&self) -> VoiceProfile {
        VoiceProfile::for_persona(Some(*self))
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Persona::American => write!(f, "american"),
            Persona::Hispanic => write!(f, "hispanic"),
            Persona::Asian => write!(f, "asian"),
        }
    }
}

/// Synthesised voice and opening line for a persona
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice: &'static str,
    pub language: &'static str,
    pub greeting: &'static str,
}

impl VoiceProfile {
    /// Unknown persona falls back to the default voice and the American greeting.
    pub fn for_persona(persona: Option<Persona>) -> Self {
        let (voice, greeting) = match persona {
            Some(Persona::Hispanic) => ("Polly.Penelope", HISPANIC_GREETING),
            Some(Persona::Asian) => ("Polly.Ivy", ASIAN_GREETING),
            Some(Persona::American) | None => (DEFAULT_VOICE, AMERICAN_GREETING),
        };

        Self {
            voice,
            language: CALL_LANGUAGE,
            greeting,
        }
    }
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self::for_persona(None)
    }
}
