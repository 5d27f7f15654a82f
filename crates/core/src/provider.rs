use crate::error::GenerationError;
use crate::gemini::GeminiModel;
use crate::model::{LanguageModel, ModelSettings};
use crate::openai::OpenAiModel;
use secrecy::SecretString;
use std::sync::Arc;

/// Supported language-generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// Parses a provider name; anything other than "gemini" selects OpenAI.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Provider::Gemini,
            _ => Provider::OpenAI,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Builds the shared model client for `provider`.
pub fn connect(
    provider: Provider,
    api_key: SecretString,
    settings: ModelSettings,
) -> Result<Arc<dyn LanguageModel>, GenerationError> {
    tracing::info!(?provider, model = %settings.model, "language model client ready");
    Ok(match provider {
        Provider::OpenAI => Arc::new(OpenAiModel::new(api_key, settings)?),
        Provider::Gemini => Arc::new(GeminiModel::new(api_key, settings)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_defaults_to_openai() {
        assert_eq!(Provider::from_name("Gemini"), Provider::Gemini);
        assert_eq!(Provider::from_name("openai"), Provider::OpenAI);
        assert_eq!(Provider::from_name("something-else"), Provider::OpenAI);
        assert_eq!(Provider::Gemini.key_var(), "GEMINI_API_KEY");
    }
}
