use async_trait::async_trait;
use interview_core::{
    Completion, GenerationError, LanguageModel, SpeechSynthesizer, Transcriber,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Language model that replays canned replies in order and counts calls.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _request: &Completion) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

pub fn decision(text: &str, action: &str) -> String {
    serde_json::json!({ "response_text": text, "action": action }).to_string()
}

pub struct FakeTranscriber {
    heard: String,
}

impl FakeTranscriber {
    pub fn hearing(text: &str) -> Self {
        Self {
            heard: text.to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: &[u8], _file_name: &str) -> Result<String, GenerationError> {
        Ok(self.heard.clone())
    }
}

/// Produces `mp3:<text>` so tests can check what was spoken.
pub struct FakeSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GenerationError> {
        Ok(format!("mp3:{text}").into_bytes())
    }
}
