//! TwiML (Twilio Markup Language) builder for generating voice responses
//!
//! Creates XML responses that Twilio uses to control phone calls.

use std::fmt::Write;

use crate::persona::{VoiceProfile, CALL_LANGUAGE, DEFAULT_VOICE};

/// Seconds Twilio waits for the caller to start speaking
pub const CAPTURE_TIMEOUT_SECS: u32 = 8;

/// Spoken when the caller never says anything after the greeting
pub const NO_SPEECH_GOODBYE: &str = "I didn't hear anything. I will call back later, thank you.";

/// Spoken inside the follow-up capture after every reply
pub const FOLLOW_UP_PROMPT: &str = "What else do you need to know?";

/// Builder for generating TwiML responses
#[derive(Debug, Clone, Default)]
pub struct TwimlBuilder {
    elements: Vec<TwimlElement>,
}

/// TwiML elements
#[derive(Debug, Clone)]
enum TwimlElement {
    Say {
        text: String,
        voice: String,
        language: String,
    },
    Gather {
        input: GatherInput,
        action: String,
        method: String,
        timeout: u32,
        language: String,
        children: Vec<TwimlElement>,
    },
    Hangup,
}

/// Input types for Gather
#[derive(Debug, Clone, Copy)]
pub enum GatherInput {
    Speech,
}

impl GatherInput {
    fn as_str(&self) -> &str {
        match self {
            GatherInput::Speech => "speech",
        }
    }
}

impl TwimlBuilder {
    /// Create a new TwiML builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Say element (text-to-speech)
    pub fn say(mut self, text: &str, voice: &str, language: &str) -> Self {
        self.elements.push(TwimlElement::Say {
            text: text.to_string(),
            voice: voice.to_string(),
            language: language.to_string(),
        });
        self
    }

    /// Add a speech Gather that posts the recognised text to `action`,
    /// optionally speaking `prompt` with `voice` while it listens
    pub fn gather_speech(
        mut self,
        action: &str,
        timeout: u32,
        language: &str,
        prompt: Option<(&str, &str)>,
    ) -> Self {
        let children = prompt
            .map(|(text, voice)| {
                vec![TwimlElement::Say {
                    text: text.to_string(),
                    voice: voice.to_string(),
                    language: language.to_string(),
                }]
            })
            .unwrap_or_default();

        self.elements.push(TwimlElement::Gather {
            input: GatherInput::Speech,
            action: action.to_string(),
            method: "POST".to_string(),
            timeout,
            language: language.to_string(),
            children,
        });
        self
    }

    /// Add a Hangup element
    pub fn hangup(mut self) -> Self {
        self.elements.push(TwimlElement::Hangup);
        self
    }

    /// Build the TwiML XML string
    pub fn build(self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");

        for element in self.elements {
            render_element(&mut xml, &element, 1);
        }

        xml.push_str("</Response>");
        xml
    }

    /// First response of a call: greet while listening, then give up politely
    pub fn call_start(profile: &VoiceProfile, action: &str) -> String {
        TwimlBuilder::new()
            .gather_speech(
                action,
                CAPTURE_TIMEOUT_SECS,
                profile.language,
                Some((profile.greeting, profile.voice)),
            )
            .say(NO_SPEECH_GOODBYE, DEFAULT_VOICE, CALL_LANGUAGE)
            .hangup()
            .build()
    }

    /// Speak a reply, then listen for the next utterance
    pub fn reply_and_gather(reply: &str, profile: &VoiceProfile, action: &str) -> String {
        TwimlBuilder::new()
            .say(reply, profile.voice, profile.language)
            .gather_speech(
                action,
                CAPTURE_TIMEOUT_SECS,
                profile.language,
                Some((FOLLOW_UP_PROMPT, profile.voice)),
            )
            .build()
    }
}

/// Render a TwiML element to XML
fn render_element(xml: &mut String, element: &TwimlElement, indent: usize) {
    let indent_str = "  ".repeat(indent);

    match element {
        TwimlElement::Say {
            text,
            voice,
            language,
        } => {
            let _ = writeln!(
                xml,
                "{}<Say voice=\"{}\" language=\"{}\">{}</Say>",
                indent_str,
                xml_escape(voice),
                xml_escape(language),
                xml_escape(text)
            );
        }
        TwimlElement::Gather {
            input,
            action,
            method,
            timeout,
            language,
            children,
        } => {
            let _ = write!(
                xml,
                "{}<Gather input=\"{}\" action=\"{}\" method=\"{}\" timeout=\"{}\" language=\"{}\"",
                indent_str,
                input.as_str(),
                xml_escape(action),
                method,
                timeout,
                xml_escape(language)
            );

            if children.is_empty() {
                let _ = writeln!(xml, "/>");
            } else {
                let _ = writeln!(xml, ">");
                for child in children {
                    render_element(xml, child, indent + 1);
                }
                let _ = writeln!(xml, "{}</Gather>", indent_str);
            }
        }
        TwimlElement::Hangup => {
            let _ = writeln!(xml, "{}<Hangup/>", indent_str);
        }
    }
}

/// Escape special XML characters
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
