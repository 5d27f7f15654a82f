use crate::error::GenerationError;
use crate::session_state::{Speaker, Turn};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::time::Duration;

/// Who authored a message sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl From<Speaker> for MessageRole {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::Interviewer => MessageRole::Assistant,
            Speaker::Candidate => MessageRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Shape of the reply the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free-form text.
    Text,
    /// A schema-constrained `{response_text, action}` object.
    Decision,
}

/// One request to a language-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub format: ResponseFormat,
}

impl Completion {
    pub fn text(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            format: ResponseFormat::Text,
        }
    }

    pub fn decision(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
            format: ResponseFormat::Decision,
        }
    }

    pub fn with_message(mut self, role: MessageRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
        self
    }

    /// Appends every turn of the transcript in order, interviewer turns as assistant messages.
    pub fn with_transcript(mut self, transcript: &[Turn]) -> Self {
        self.messages.extend(transcript.iter().map(|turn| ChatMessage {
            role: turn.speaker.into(),
            content: turn.content.clone(),
        }));
        self
    }
}

/// The language-generation service the interview delegates all wording to.
///
/// Implementations make exactly one attempt per call and report any failure
/// through [`GenerationError`]; callers decide how to recover.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &Completion) -> Result<String, GenerationError>;
}

/// Sampling and transport settings shared by the provider clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_output_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}
