mod config;
mod error;
mod routes;
#[cfg(test)]
mod test_support;
mod ws;

use crate::config::Config;
use crate::routes::{AppState, router};
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method, header};
use interview_core::openai::{OpenAiSpeech, SpeechSettings};
use interview_core::prompts::PromptSet;
use interview_core::{Interviewer, VoiceInterviewer, provider};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    info!(provider = ?config.provider, model = %config.model.model, "Configuration loaded");

    // --- 3. Load Prompts ---
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptSet::from_dir(dir).context("Failed to load prompt overrides")?,
        None => PromptSet::default(),
    };

    // --- 4. Initialize API Clients ---
    let speech_timeout = config.model.timeout;
    let model = provider::connect(config.provider, config.api_key, config.model)
        .context("Failed to build language model client")?;
    let interviewer = Arc::new(Interviewer::new(model).with_prompts(prompts));

    let voice = match config.speech_api_key {
        Some(key) => {
            let speech = Arc::new(
                OpenAiSpeech::new(
                    key,
                    SpeechSettings {
                        timeout: speech_timeout,
                        ..SpeechSettings::default()
                    },
                )
                .context("Failed to build speech client")?,
            );
            Some(Arc::new(VoiceInterviewer::new(
                interviewer.clone(),
                speech.clone(),
                speech,
            )))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set; voice endpoints are disabled");
            None
        }
    };

    // --- 5. Build the Router ---
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .context("ALLOWED_ORIGIN is not a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = router(AppState { interviewer, voice })
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!("Starting interview server, listening on {}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
