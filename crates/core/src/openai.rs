use crate::decision::decision_schema;
use crate::error::GenerationError;
use crate::http::{check_status, http_client};
use crate::model::{Completion, LanguageModel, MessageRole, ModelSettings, ResponseFormat};
use crate::speech::{SpeechSynthesizer, Transcriber};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const TRANSCRIPTION_HINT: &str = "Job interview context. Technical terms: Python, SQL, React, AWS, \
     Docker, Kubernetes, System Design, Scalability, REST API, Algorithms, Data Structures. \
     The candidate is speaking clearly.";

#[derive(Debug, Deserialize)]
struct LlmResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Chat-completions client for OpenAI and API-compatible servers.
pub struct OpenAiModel {
    client: Client,
    api_key: SecretString,
    base_url: String,
    settings: ModelSettings,
}

impl OpenAiModel {
    pub fn new(api_key: SecretString, settings: ModelSettings) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            settings,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn body(&self, request: &Completion) -> serde_json::Value {
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system,
        })];
        messages.extend(request.messages.iter().map(|m| {
            let role = match m.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            serde_json::json!({ "role": role, "content": m.content })
        }));

        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
        });
        if request.format == ResponseFormat::Decision {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "interview_decision",
                    "strict": true,
                    "schema": decision_schema(),
                }
            });
        }
        body
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, request: &Completion) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.body(request))
            .send()
            .await?;

        let resp = check_status(resp).await?.json::<LlmResponse>().await?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Voices and models used for the speech endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSettings {
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            transcription_model: "whisper-1".to_string(),
            speech_model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// OpenAI transcription and text-to-speech.
pub struct OpenAiSpeech {
    client: Client,
    api_key: SecretString,
    base_url: String,
    settings: SpeechSettings,
}

impl OpenAiSpeech {
    pub fn new(api_key: SecretString, settings: SpeechSettings) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            settings,
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiSpeech {
    async fn transcribe(&self, audio: &[u8], file_name: &str) -> Result<String, GenerationError> {
        let form = Form::new()
            .text("model", self.settings.transcription_model.clone())
            .text("language", "en")
            .text("temperature", "0")
            .text("prompt", TRANSCRIPTION_HINT)
            .part("file", Part::bytes(audio.to_vec()).file_name(file_name.to_string()));

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let resp = check_status(resp)
            .await?
            .json::<TranscriptionResponse>()
            .await?;
        Ok(resp.text)
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, GenerationError> {
        let body = serde_json::json!({
            "model": self.settings.speech_model,
            "voice": self.settings.voice,
            "input": text,
        });

        let resp = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        Ok(check_status(resp).await?.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_state::Turn;
    use std::env;

    fn model() -> OpenAiModel {
        OpenAiModel::new(SecretString::from("sk-test".to_string()), ModelSettings::new("gpt-4o"))
            .unwrap()
    }

    #[test]
    fn test_decision_body_requests_json_schema() {
        let request = Completion::decision("You are an interviewer.")
            .with_transcript(&[Turn::interviewer("Hi"), Turn::candidate("Hello")]);

        let body = model().body(&request);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["required"],
            serde_json::json!(["response_text", "action"])
        );
    }

    #[test]
    fn test_base_url_override_drops_trailing_slash() {
        assert_eq!(model().base_url, OPENAI_BASE_URL);

        let local = model().with_base_url("http://localhost:11434/v1/");
        assert_eq!(local.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_text_body_has_no_response_format() {
        let body = model().body(&Completion::text("Evaluate."));
        assert!(body.get("response_format").is_none());
        assert_eq!(body["max_tokens"], 2048);
    }

    // Makes a live call to the OpenAI API. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_live_decision_call() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let model =
            OpenAiModel::new(SecretString::from(api_key), ModelSettings::new("gpt-4o")).unwrap();

        let request = Completion::decision(
            "You are an interviewer. Reply with CLARIFY if the candidate is confused.",
        )
        .with_transcript(&[
            Turn::interviewer("What is a B-tree?"),
            Turn::candidate("Sorry, I don't understand the question."),
        ]);

        let raw = model.complete(&request).await.expect("live call failed");
        let decision = crate::decision::Decision::parse(&raw).expect("reply should be a decision");
        println!("Decision: {:?}", decision);
    }
}
