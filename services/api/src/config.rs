use interview_core::{ModelSettings, Provider};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    /// Key for the selected language-model provider.
    pub api_key: SecretString,
    /// OpenAI key for transcription and speech; voice endpoints are disabled without it.
    pub speech_api_key: Option<SecretString>,
    pub model: ModelSettings,
    pub allowed_origin: String,
    pub prompts_dir: Option<PathBuf>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:8000".
    /// *   `LLM_PROVIDER`: The backend to use. Can be "openai" or "gemini". Defaults to "openai".
    /// *   `OPENAI_API_KEY`: Required if provider is "openai". Also enables the voice endpoints.
    /// *   `GEMINI_API_KEY`: Required if provider is "gemini".
    /// *   `CHAT_MODEL`: (Optional) Defaults to the provider's default model.
    /// *   `TEMPERATURE`, `MAX_OUTPUT_TOKENS`, `REQUEST_TIMEOUT_SECS`: (Optional) sampling and timeout.
    /// *   `ALLOWED_ORIGIN`: (Optional) CORS origin. Defaults to "http://localhost:3000".
    /// *   `PROMPTS_DIR`: (Optional) Directory of `.md` prompt overrides.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider = Provider::from_name(&lookup("LLM_PROVIDER").unwrap_or_default());

        // Validate that the required API key is present for the selected provider.
        let api_key = lookup(provider.key_var())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingVar(format!(
                    "{} must be set for the {:?} provider",
                    provider.key_var(),
                    provider
                ))
            })?;
        let speech_api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let chat_model =
            lookup("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let mut model = ModelSettings::new(chat_model);
        if let Some(temperature) = parse_var::<f32>(&lookup, "TEMPERATURE")? {
            model.temperature = temperature;
        }
        if let Some(max_output_tokens) = parse_var::<u32>(&lookup, "MAX_OUTPUT_TOKENS")? {
            model.max_output_tokens = max_output_tokens;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "REQUEST_TIMEOUT_SECS")? {
            model.timeout = Duration::from_secs(secs);
        }

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let prompts_dir = lookup("PROMPTS_DIR").map(PathBuf::from);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            provider,
            api_key: SecretString::from(api_key),
            speech_api_key,
            model,
            allowed_origin,
            prompts_dir,
            log_level,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
        })
        .transpose()
}
