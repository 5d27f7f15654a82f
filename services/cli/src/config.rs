//! Terminal runner configuration, loaded from the environment.

use interview_core::{ModelSettings, Provider};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub provider: Provider,
    pub api_key: SecretString,
    pub model: ModelSettings,
    pub prompts_dir: Option<PathBuf>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `LLM_PROVIDER`: "openai" or "gemini". Defaults to "openai".
    // *   `OPENAI_API_KEY` / `GEMINI_API_KEY`: key for the selected provider.
    // *   `CHAT_MODEL`: (Optional) Defaults to the provider's default model.
    // *   `TEMPERATURE`, `MAX_OUTPUT_TOKENS`, `REQUEST_TIMEOUT_SECS`: (Optional).
    // *   `PROMPTS_DIR`: (Optional) Directory of `.md` prompt overrides.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = Provider::from_name(&lookup("LLM_PROVIDER").unwrap_or_default());

        // Validate that the required API key is present for the selected provider.
        let api_key = lookup(provider.key_var())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingVar(format!("{} must be set", provider.key_var()))
            })?;

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

        let prompts_dir = lookup("PROMPTS_DIR").map(PathBuf::from);

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            provider,
            api_key: SecretString::from(api_key),
            model,
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
            raw.trim().parse::<T>().map_err(|e| {
                ConfigError::InvalidValue(key.to_string(), format!("'{}': {}", raw.trim(), e))
            })
        })
        .transpose()
}
