use crate::error::GenerationError;
use crate::http::{check_status, http_client};
use crate::model::{Completion, LanguageModel, MessageRole, ModelSettings, ResponseFormat};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiModel {
    client: Client,
    api_key: SecretString,
    base_url: String,
    settings: ModelSettings,
}

impl GeminiModel {
    pub fn new(api_key: SecretString, settings: ModelSettings) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(settings.timeout)?,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            settings,
        })
    }

    fn body(&self, request: &Completion) -> serde_json::Value {
        // Gemini wants alternating roles, so consecutive messages from one side are merged.
        let mut contents: Vec<(&'static str, String)> = Vec::new();
        for message in &request.messages {
            let role = match message.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };
            match contents.last_mut() {
                Some((last_role, text)) if *last_role == role => {
                    text.push_str("\n\n");
                    text.push_str(&message.content);
                }
                _ => contents.push((role, message.content.clone())),
            }
        }
        let contents: Vec<serde_json::Value> = contents
            .into_iter()
            .map(|(role, text)| serde_json::json!({ "role": role, "parts": [{ "text": text }] }))
            .collect();

        let mut generation_config = serde_json::json!({
            "temperature": self.settings.temperature,
            "maxOutputTokens": self.settings.max_output_tokens,
        });
        if request.format == ResponseFormat::Decision {
            generation_config["responseMimeType"] = "application/json".into();
            generation_config["responseSchema"] = serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "response_text": { "type": "STRING" },
                    "action": { "type": "STRING", "enum": ["CONTINUE", "CLARIFY", "END"] }
                },
                "required": ["response_text", "action"]
            });
        }

        let safety_settings: Vec<serde_json::Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| serde_json::json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect();

        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": contents,
            "generationConfig": generation_config,
            "safetySettings": safety_settings,
        })
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn complete(&self, request: &Completion) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.settings.model
            ))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.body(request))
            .send()
            .await?;

        let resp = check_status(resp).await?.json::<GenerateResponse>().await?;
        let text: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}
